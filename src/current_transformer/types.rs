use super::error::{Error, Result};

pub const DEFAULT_VREF_MV: u32 = 1100; // Default ADC reference voltage in mV
pub const NO_OF_SAMPLES: usize = 64; // Number of samples for averaging
pub const BURDEN_RESISTOR_OHMS: f64 = 100.0;
pub const ADC_FULL_SCALE: f64 = 4095.0;
pub const SAMPLE_RATE_HZ: f64 = 7812.5;
pub const MAINS_HZ: f64 = 50.0;
pub const SAMPLES_PER_CYCLE: usize = 156; // 7812.5 Hz x 0.02 s

pub const DEFAULT_CHANNEL: AdcChannel = AdcChannel(6); // GPIO34
pub const CURRENT_CHANNEL: AdcChannel = AdcChannel(7); // GPIO35, AC current input
pub const DEFAULT_ATTENUATION: Attenuation = Attenuation::Db11;
pub const DEFAULT_UNIT: AdcUnit = AdcUnit::Adc1;
pub const DEFAULT_WIDTH: AdcWidth = AdcWidth::Bit12;

/// Purely resistive load: cos(0)
pub const RESISTIVE_POWER_FACTOR: f64 = 1.0;

/// Smoothing applied to successive measurements (1.0 disables smoothing)
pub const DEFAULT_AVG: f64 = 0.2;

const ADC1_GPIO: [u8; 8] = [36, 37, 38, 39, 32, 33, 34, 35];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdcUnit {
    #[default]
    Adc1,
    Adc2,
}

/// One of the eight ADC1 input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdcChannel(u8);

impl AdcChannel {
    pub const MAX: u8 = 7;

    pub fn new(index: u8) -> Result<Self> {
        if index > Self::MAX {
            return Err(Error::InvalidChannel(index));
        }
        Ok(AdcChannel(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    pub fn gpio(&self) -> u8 {
        ADC1_GPIO[self.0 as usize]
    }
}

impl std::fmt::Display for AdcChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ADC1_CH{} (GPIO{})", self.0, self.gpio())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    #[default]
    Db11,
}

impl Attenuation {
    /// Approximate input range in millivolts before the converter saturates.
    pub fn full_scale_mv(&self) -> u32 {
        match self {
            Attenuation::Db0 => 1100,
            Attenuation::Db2_5 => 1500,
            Attenuation::Db6 => 2200,
            Attenuation::Db11 => 3900,
        }
    }

    pub(crate) fn table_index(&self) -> usize {
        match self {
            Attenuation::Db0 => 0,
            Attenuation::Db2_5 => 1,
            Attenuation::Db6 => 2,
            Attenuation::Db11 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdcWidth {
    Bit9,
    Bit10,
    Bit11,
    #[default]
    Bit12,
}

impl AdcWidth {
    pub fn bits(&self) -> u8 {
        match self {
            AdcWidth::Bit9 => 9,
            AdcWidth::Bit10 => 10,
            AdcWidth::Bit11 => 11,
            AdcWidth::Bit12 => 12,
        }
    }

    pub fn max_raw(&self) -> u16 {
        (1u16 << self.bits()) - 1
    }
}

/// Transformer inputs, calibration and load model.
#[derive(Debug, Clone)]
pub struct TransformerConfig {
    pub unit: AdcUnit,
    pub voltage_channel: AdcChannel,
    pub current_channel: AdcChannel,
    pub attenuation: Attenuation,
    pub width: AdcWidth,
    pub vref_mv: u32,
    pub num_samples: usize,
    pub burden_ohms: f64,
    pub voltage_scale: f64, // line volts per volt at the ADC pin
    pub turns_ratio: f64,  // CT secondary to primary ratio, 1.0 reports the burden current itself
    pub power_factor: f64, // cos(phi) assumed for the load
    pub avg: f64,
    pub sample_rate_hz: f64, // pacing of waveform captures
    pub mains_hz: f64,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            unit: DEFAULT_UNIT,
            voltage_channel: DEFAULT_CHANNEL,
            current_channel: CURRENT_CHANNEL,
            attenuation: DEFAULT_ATTENUATION,
            width: DEFAULT_WIDTH,
            vref_mv: DEFAULT_VREF_MV,
            num_samples: NO_OF_SAMPLES,
            burden_ohms: BURDEN_RESISTOR_OHMS,
            voltage_scale: 1.0,
            turns_ratio: 1.0,
            power_factor: RESISTIVE_POWER_FACTOR,
            avg: DEFAULT_AVG,
            sample_rate_hz: SAMPLE_RATE_HZ,
            mains_hz: MAINS_HZ,
        }
    }
}

impl TransformerConfig {
    /// Samples in one mains cycle at the configured sample rate.
    pub fn samples_per_cycle(&self) -> usize {
        (self.sample_rate_hz / self.mains_hz).round() as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerMetrics {
    pub real_power: f64,
    pub reactive_power: f64,
    pub apparent_power: f64,
    pub power_factor: f64,
}

/// Result of one measurement cycle.
#[derive(Debug, Clone, Default)]
pub struct Measurement {
    pub voltage_raw: u32, // averaged raw code of the voltage channel
    pub current_raw: u16,
    pub voltage: f64, // Volts
    pub current: f64, // Amperes
    pub power: PowerMetrics,
}
