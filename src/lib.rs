pub mod current_transformer;

pub use current_transformer::adc::AdcDriver;
pub use current_transformer::calibration::Characteristics;
pub use current_transformer::error::{Error, Result};
pub use current_transformer::iio::{IioAdc, DEFAULT_IIO_DEVICE};
pub use current_transformer::simulate::{SimulatedAdc, SimulatedInput};
pub use current_transformer::types::*;
pub use current_transformer::CurrentTransformer;
