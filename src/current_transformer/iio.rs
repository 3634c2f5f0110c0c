use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::adc::AdcDriver;
use super::error::{Error, Result};
use super::types::{AdcChannel, AdcWidth, Attenuation};

pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";

/// ADC exposed by the Linux industrial I/O subsystem.
///
/// Every read is a oneshot conversion through `in_voltage<N>_raw`. Resolution
/// and input range are fixed by the kernel driver, the configured values are
/// only used to validate readings.
pub struct IioAdc {
    device: PathBuf,
    width: AdcWidth,
    attenuation: HashMap<AdcChannel, Attenuation>,
}

impl IioAdc {
    pub fn open(device: impl AsRef<Path>) -> Result<Self> {
        let device = device.as_ref().to_path_buf();

        // Make sure the device is there before any conversion is attempted
        fs::read_dir(&device).map_err(|source| Error::Io {
            path: device.clone(),
            source,
        })?;

        log::info!("Using IIO ADC at {}", device.display());

        Ok(Self {
            device,
            width: AdcWidth::Bit12,
            attenuation: HashMap::new(),
        })
    }

    fn raw_path(&self, channel: AdcChannel) -> PathBuf {
        self.device.join(format!("in_voltage{}_raw", channel.index()))
    }

    pub fn attenuation(&self, channel: AdcChannel) -> Option<Attenuation> {
        self.attenuation.get(&channel).copied()
    }
}

impl AdcDriver for IioAdc {
    fn config_width(&mut self, width: AdcWidth) -> Result<()> {
        self.width = width;
        Ok(())
    }

    fn config_channel_atten(&mut self, channel: AdcChannel, atten: Attenuation) -> Result<()> {
        let path = self.raw_path(channel);
        if !path.exists() {
            log::warn!("{} has no {}", self.device.display(), path.display());
        }
        self.attenuation.insert(channel, atten);
        Ok(())
    }

    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16> {
        let path = self.raw_path(channel);
        let text = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let value = text.trim();
        let raw: u32 = value.parse().map_err(|_| Error::Parse {
            path: path.clone(),
            value: value.to_string(),
        })?;

        if raw > self.width.max_raw() as u32 {
            return Err(Error::RawOutOfRange {
                raw,
                bits: self.width.bits(),
            });
        }

        log::trace!("{}: {}", channel, raw);

        Ok(raw as u16)
    }
}
