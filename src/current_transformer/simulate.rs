use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::PI;

use super::adc::AdcDriver;
use super::error::{Error, Result};
use super::types::{AdcChannel, AdcWidth, Attenuation, CURRENT_CHANNEL, DEFAULT_CHANNEL};
use super::types::{MAINS_HZ as F, SAMPLE_RATE_HZ as FS};

const MID_RAIL: f64 = 2048.0; // Bias point of an AC input, in 12-bit counts

const VOLTAGE_AMPLITUDE: f64 = 1200.0;
const CURRENT_AMPLITUDE: f64 = 600.0;

fn offset(deg: f64) -> f64 {
    deg * 2.0 * PI / 360.0
}

/// Waveform presented to one simulated input, in 12-bit counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedInput {
    pub offset: f64,
    pub amplitude: f64,
    pub phase_deg: f64,
}

impl SimulatedInput {
    pub fn dc(raw: u16) -> Self {
        Self {
            offset: raw as f64,
            amplitude: 0.0,
            phase_deg: 0.0,
        }
    }

    pub fn sine(offset: f64, amplitude: f64, phase_deg: f64) -> Self {
        Self {
            offset,
            amplitude,
            phase_deg,
        }
    }

    /// One mains cycle sampled at FS.
    fn cycle(&self) -> Array1<f64> {
        let samples_per_cycle = (FS / F).round();
        Array1::range(0.0, samples_per_cycle, 1.0)
            .mapv(|s| self.offset + self.amplitude * (offset(self.phase_deg) + 2.0 * PI * F / FS * s).sin())
    }
}

/// ADC stand-in producing biased sine waves, used when no hardware is attached.
pub struct SimulatedAdc {
    tables: HashMap<AdcChannel, Array1<f64>>,
    attenuation: HashMap<AdcChannel, Attenuation>,
    width: AdcWidth,
    noise: f64, // peak random noise in counts
    rng: StdRng,
    ticks: HashMap<AdcChannel, usize>, // each input has its own sample clock
    continuous_samples: usize,
    continuous: bool,
    continuous_runs: usize,
    reads: usize,
    fail_after: Option<usize>,
}

impl Default for SimulatedAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAdc {
    /// An ADC with every channel reading zero.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            attenuation: HashMap::new(),
            width: AdcWidth::Bit12,
            noise: 0.0,
            rng: StdRng::seed_from_u64(0),
            ticks: HashMap::new(),
            continuous_samples: 0,
            continuous: false,
            continuous_runs: 0,
            reads: 0,
            fail_after: None,
        }
    }

    /// Mains voltage on the default channel and an in-phase CT output on the current channel.
    pub fn mains() -> Self {
        Self::new()
            .with_input(DEFAULT_CHANNEL, SimulatedInput::sine(MID_RAIL, VOLTAGE_AMPLITUDE, 0.0))
            .with_input(CURRENT_CHANNEL, SimulatedInput::sine(MID_RAIL, CURRENT_AMPLITUDE, 0.0))
    }

    pub fn with_input(mut self, channel: AdcChannel, input: SimulatedInput) -> Self {
        self.tables.insert(channel, input.cycle());
        self
    }

    pub fn with_noise(mut self, peak_counts: f64, seed: u64) -> Self {
        self.noise = peak_counts.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Every read after the first `reads` conversions fails with `RawOutOfRange`.
    pub fn with_failure_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn width(&self) -> AdcWidth {
        self.width
    }

    pub fn attenuation(&self, channel: AdcChannel) -> Option<Attenuation> {
        self.attenuation.get(&channel).copied()
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn continuous_samples(&self) -> usize {
        self.continuous_samples
    }

    /// Number of completed start/stop pairs.
    pub fn continuous_runs(&self) -> usize {
        self.continuous_runs
    }
}

impl AdcDriver for SimulatedAdc {
    fn config_width(&mut self, width: AdcWidth) -> Result<()> {
        self.width = width;
        Ok(())
    }

    fn config_channel_atten(&mut self, channel: AdcChannel, atten: Attenuation) -> Result<()> {
        self.attenuation.insert(channel, atten);
        Ok(())
    }

    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16> {
        if self.fail_after.is_some_and(|limit| self.reads >= limit) {
            return Err(Error::RawOutOfRange {
                raw: 4096,
                bits: self.width.bits(),
            });
        }
        self.reads += 1;

        let tick = self.ticks.entry(channel).or_insert(0);
        let mut value = match self.tables.get(&channel) {
            Some(table) => table[*tick % table.len()],
            None => 0.0,
        };
        *tick = tick.wrapping_add(1);

        if self.noise > 0.0 {
            value += self.rng.gen_range(-self.noise..=self.noise);
        }

        let counts = value.round().clamp(0.0, 4095.0) as u16;

        Ok(counts >> (12 - self.width.bits()))
    }

    fn continuous_enable(&mut self, num_samples: usize) -> Result<()> {
        self.continuous_samples = num_samples;
        Ok(())
    }

    fn continuous_start(&mut self, _channel: AdcChannel, _atten: Attenuation) -> Result<()> {
        self.continuous = true;
        Ok(())
    }

    fn continuous_stop(&mut self) -> Result<()> {
        if self.continuous {
            self.continuous_runs += 1;
        }
        self.continuous = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_reads_constant() {
        let mut adc = SimulatedAdc::new().with_input(DEFAULT_CHANNEL, SimulatedInput::dc(1234));
        for _ in 0..10 {
            assert_eq!(adc.read_raw(DEFAULT_CHANNEL).unwrap(), 1234);
        }
        assert_eq!(adc.read_raw(CURRENT_CHANNEL).unwrap(), 0);
    }

    #[test]
    fn sine_stays_within_adc_range() {
        let mut adc =
            SimulatedAdc::new().with_input(DEFAULT_CHANNEL, SimulatedInput::sine(2048.0, 5000.0, 0.0));
        let readings: Vec<u16> = (0..156).map(|_| adc.read_raw(DEFAULT_CHANNEL).unwrap()).collect();
        assert_eq!(*readings.iter().max().unwrap(), 4095);
        assert_eq!(*readings.iter().min().unwrap(), 0);
    }

    #[test]
    fn channels_are_sampled_in_step() {
        let input = SimulatedInput::sine(2048.0, 1000.0, 0.0);
        let mut adc = SimulatedAdc::new()
            .with_input(DEFAULT_CHANNEL, input)
            .with_input(CURRENT_CHANNEL, input);
        for _ in 0..20 {
            let v = adc.read_raw(DEFAULT_CHANNEL).unwrap();
            let i = adc.read_raw(CURRENT_CHANNEL).unwrap();
            assert_eq!(v, i);
        }
    }

    #[test]
    fn narrower_width_shifts_readings() {
        let mut adc = SimulatedAdc::new().with_input(DEFAULT_CHANNEL, SimulatedInput::dc(4095));
        adc.config_width(AdcWidth::Bit10).unwrap();
        assert_eq!(adc.read_raw(DEFAULT_CHANNEL).unwrap(), 1023);
    }

    #[test]
    fn noise_is_bounded() {
        let mut adc = SimulatedAdc::new()
            .with_input(DEFAULT_CHANNEL, SimulatedInput::dc(2000))
            .with_noise(5.0, 7);
        for _ in 0..500 {
            let raw = adc.read_raw(DEFAULT_CHANNEL).unwrap();
            assert!((1995..=2005).contains(&raw));
        }
    }

    #[test]
    fn failure_after_n_reads() {
        let mut adc = SimulatedAdc::new()
            .with_input(DEFAULT_CHANNEL, SimulatedInput::dc(10))
            .with_failure_after(2);
        assert_eq!(adc.read_raw(DEFAULT_CHANNEL).unwrap(), 10);
        assert_eq!(adc.read_raw(DEFAULT_CHANNEL).unwrap(), 10);
        assert!(matches!(
            adc.read_raw(DEFAULT_CHANNEL),
            Err(Error::RawOutOfRange { raw: 4096, bits: 12 })
        ));
        assert_eq!(adc.reads(), 2);
    }

    #[test]
    fn continuous_mode_is_tracked() {
        let mut adc = SimulatedAdc::mains();
        adc.continuous_enable(64).unwrap();
        adc.continuous_start(DEFAULT_CHANNEL, Attenuation::Db11).unwrap();
        assert!(adc.is_continuous());
        adc.continuous_stop().unwrap();
        assert!(!adc.is_continuous());
        assert_eq!(adc.continuous_runs(), 1);
        assert_eq!(adc.continuous_samples(), 64);
    }
}
