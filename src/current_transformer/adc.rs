use super::error::Result;
use super::types::{AdcChannel, AdcWidth, Attenuation};

/// Peripheral operations needed to sample the transformer inputs.
///
/// Drivers without a hardware continuous mode keep the default no-op
/// implementations; continuous reads then fall back to back-to-back oneshot
/// conversions.
pub trait AdcDriver {
    fn config_width(&mut self, width: AdcWidth) -> Result<()>;

    fn config_channel_atten(&mut self, channel: AdcChannel, atten: Attenuation) -> Result<()>;

    /// Single conversion on `channel`, returns the raw code.
    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16>;

    fn continuous_enable(&mut self, _num_samples: usize) -> Result<()> {
        Ok(())
    }

    fn continuous_start(&mut self, _channel: AdcChannel, _atten: Attenuation) -> Result<()> {
        Ok(())
    }

    fn continuous_stop(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: AdcDriver + ?Sized> AdcDriver for Box<T> {
    fn config_width(&mut self, width: AdcWidth) -> Result<()> {
        (**self).config_width(width)
    }

    fn config_channel_atten(&mut self, channel: AdcChannel, atten: Attenuation) -> Result<()> {
        (**self).config_channel_atten(channel, atten)
    }

    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16> {
        (**self).read_raw(channel)
    }

    fn continuous_enable(&mut self, num_samples: usize) -> Result<()> {
        (**self).continuous_enable(num_samples)
    }

    fn continuous_start(&mut self, channel: AdcChannel, atten: Attenuation) -> Result<()> {
        (**self).continuous_start(channel, atten)
    }

    fn continuous_stop(&mut self) -> Result<()> {
        (**self).continuous_stop()
    }
}
