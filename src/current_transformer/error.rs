use std::path::PathBuf;

/// Errors raised while talking to the ADC or converting its readings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ADC channel {0} does not exist (valid channels are 0..=7)")]
    InvalidChannel(u8),

    #[error("cannot average an empty sample buffer")]
    EmptyBuffer,

    #[error("ADC has not been characterized, call init_adc first")]
    NotInitialized,

    #[error("raw reading {raw} exceeds the {bits}-bit range")]
    RawOutOfRange { raw: u32, bits: u8 },

    #[error("sample rate must be positive, got {0} Hz")]
    InvalidSampleRate(f64),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {value:?} read from {}", path.display())]
    Parse { path: PathBuf, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let err = Error::Parse {
            path: PathBuf::from("/sys/in_voltage6_raw"),
            value: "x".to_string(),
        };
        assert_eq!(err.to_string(), "could not parse \"x\" read from /sys/in_voltage6_raw");
    }
}
