pub mod adc;
pub mod calibration;
pub mod error;
pub mod filter;
pub mod iio;
pub mod power;
pub mod print;
pub mod simulate;
pub mod types;

use std::time::{Duration, Instant};

use adc::AdcDriver;
use calibration::Characteristics;
use error::{Error, Result};
use types::*;

/// Voltage and current transformer inputs sampled through one ADC unit.
pub struct CurrentTransformer<A: AdcDriver> {
    adc: A,
    pub config: TransformerConfig,
    chars: Option<Characteristics>,
    // Smoothed across calls to measure()
    pub measurement: Measurement,
}

impl<A: AdcDriver> CurrentTransformer<A> {
    pub fn new(adc: A, config: TransformerConfig) -> Self {
        Self {
            adc,
            config,
            chars: None,
            measurement: Measurement::default(),
        }
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }

    pub fn characteristics(&self) -> Option<&Characteristics> {
        self.chars.as_ref()
    }

    /*
     * @brief Initialize the ADC with the specified attenuation and number of samples for averaging.
     * @param attenuation The ADC attenuation to use.
     * @param num_samples The number of samples to use for averaging.
     * @note Both the voltage and the current channel are configured. Width is always 12 bit.
     */
    pub fn init_adc(&mut self, attenuation: Attenuation, num_samples: usize) -> Result<()> {
        self.config.attenuation = attenuation;
        self.config.num_samples = num_samples;
        self.config.width = AdcWidth::Bit12;

        self.adc.config_width(AdcWidth::Bit12)?;
        self.adc.config_channel_atten(self.config.voltage_channel, attenuation)?;
        self.adc.config_channel_atten(self.config.current_channel, attenuation)?;

        self.chars = Some(Characteristics::characterize(
            self.config.unit,
            attenuation,
            self.config.width,
            self.config.vref_mv,
        ));

        self.adc.continuous_enable(num_samples)?;

        log::info!(
            "ADC ready: voltage on {}, current on {}, {:?} (~{} mV full scale), {} samples",
            self.config.voltage_channel,
            self.config.current_channel,
            attenuation,
            attenuation.full_scale_mv(),
            num_samples
        );

        Ok(())
    }

    /// Single conversion on the voltage channel.
    pub fn read_oneshot(&mut self) -> Result<u16> {
        self.adc.read_raw(self.config.voltage_channel)
    }

    /*
     * @brief Read continuously from the voltage channel.
     * @param buffer The buffer to store the ADC readings in.
     * @note Continuous mode is stopped even when a conversion fails.
     */
    pub fn read_continuous(&mut self, buffer: &mut [u16]) -> Result<()> {
        let channel = self.config.voltage_channel;
        self.adc.continuous_start(channel, self.config.attenuation)?;

        let mut result = Ok(());
        for slot in buffer.iter_mut() {
            match self.adc.read_raw(channel) {
                Ok(raw) => *slot = raw,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        let stopped = self.adc.continuous_stop();
        result.and(stopped)
    }

    pub fn filter_noise(&self, buffer: &[u16]) -> Result<u32> {
        filter::filter_noise(buffer)
    }

    /// Raw reading to millivolts through the ADC characteristics. Codes above the width maximum are rejected.
    pub fn convert_to_voltage(&self, raw: u32) -> Result<u32> {
        let chars = self.chars.as_ref().ok_or(Error::NotInitialized)?;
        chars.checked_raw_to_voltage(raw)
    }

    fn sample_average(&mut self, channel: AdcChannel) -> Result<u32> {
        let mut buffer = vec![0u16; self.config.num_samples];
        for slot in buffer.iter_mut() {
            *slot = self.adc.read_raw(channel)?;
        }
        filter::filter_noise(&buffer)
    }

    /*
     * @brief Read the voltage from an ADC input.
     * @param channel The ADC channel to read from.
     * @return The averaged, calibrated voltage in volts.
     */
    pub fn read_voltage(&mut self, channel: AdcChannel) -> Result<f64> {
        let raw = self.sample_average(channel)?;
        let millivolts = self.convert_to_voltage(raw)?;

        Ok(millivolts as f64 / 1000.0 * self.config.voltage_scale)
    }

    fn raw_to_current(&self, raw: u16) -> f64 {
        let millivolts = raw as f64 / (ADC_FULL_SCALE / self.config.vref_mv as f64);
        (millivolts / 1000.0) / self.config.burden_ohms * self.config.turns_ratio
    }

    /*
     * @brief Read the current from an ADC input.
     * @param channel The ADC channel to read from.
     * @return The current through the burden resistor in amperes, scaled by the turns ratio.
     * @note Uses the nominal reference voltage rather than the characteristics.
     * @note The pin voltage is taken in volts before dividing by the burden, so full
     *       scale is 0.011 A. Dividing the millivolts directly would give 11.0, which is mA.
     */
    pub fn read_current(&mut self, channel: AdcChannel) -> Result<f64> {
        let raw = self.adc.read_raw(channel)?;
        Ok(self.raw_to_current(raw))
    }

    pub fn calculate_power(&self, current: f64, voltage: f64) -> PowerMetrics {
        power::calculate_power(current, voltage, self.config.power_factor)
    }

    /*
     * @brief Read voltage and current once and derive the power figures.
     * @return The instantaneous measurement; the smoothed one is kept in `self.measurement`.
     */
    pub fn measure(&mut self) -> Result<Measurement> {
        let voltage_raw = self.sample_average(self.config.voltage_channel)?;
        let voltage = self.convert_to_voltage(voltage_raw)? as f64 / 1000.0 * self.config.voltage_scale;

        let current_raw = self.adc.read_raw(self.config.current_channel)?;
        let current = self.raw_to_current(current_raw);

        let measurement = Measurement {
            voltage_raw,
            current_raw,
            voltage,
            current,
            power: self.calculate_power(current, voltage),
        };

        let avg = self.config.avg;
        let smoothed = &mut self.measurement;
        smoothed.voltage_raw = measurement.voltage_raw;
        smoothed.current_raw = measurement.current_raw;
        filter::update_average(measurement.voltage, &mut smoothed.voltage, avg);
        filter::update_average(measurement.current, &mut smoothed.current, avg);
        filter::update_average(measurement.power.real_power, &mut smoothed.power.real_power, avg);
        filter::update_average(measurement.power.reactive_power, &mut smoothed.power.reactive_power, avg);
        filter::update_average(measurement.power.apparent_power, &mut smoothed.power.apparent_power, avg);
        smoothed.power.power_factor = measurement.power.power_factor;

        log::debug!(
            "raw v={} i={} -> {:.3} V {:.6} A",
            voltage_raw,
            current_raw,
            voltage,
            current
        );

        Ok(measurement)
    }

    /*
     * @brief Sample one cycle of both inputs and compute power from the waveforms.
     * @param samples Samples per channel, one mains cycle (see TransformerConfig::samples_per_cycle).
     * @note Each voltage/current pair is paced at config.sample_rate_hz. Samples are
     *       calibrated, then the DC bias of each input is removed.
     */
    pub fn measure_waveform(&mut self, samples: usize) -> Result<PowerMetrics> {
        if samples == 0 {
            return Err(Error::EmptyBuffer);
        }
        let rate = self.config.sample_rate_hz;
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(Error::InvalidSampleRate(rate));
        }
        let period = Duration::try_from_secs_f64(1.0 / rate).map_err(|_| Error::InvalidSampleRate(rate))?;
        let mut voltage = Vec::with_capacity(samples);
        let mut current = Vec::with_capacity(samples);
        let mut late: usize = 0;

        let started = Instant::now();
        for k in 0..samples {
            let deadline = started + period.mul_f64(k as f64);
            let now = Instant::now();
            if deadline > now {
                spin_sleep::sleep(deadline - now);
            } else if k > 0 {
                late += 1;
            }

            let v_raw = self.adc.read_raw(self.config.voltage_channel)?;
            let i_raw = self.adc.read_raw(self.config.current_channel)?;

            voltage.push(self.convert_to_voltage(v_raw as u32)? as f64 / 1000.0 * self.config.voltage_scale);
            current.push(
                self.convert_to_voltage(i_raw as u32)? as f64 / 1000.0 / self.config.burden_ohms
                    * self.config.turns_ratio,
            );
        }

        if late > 0 {
            log::warn!(
                "{} of {} samples missed the {:.1} Hz pace, waveform power is approximate",
                late,
                samples,
                rate
            );
        }

        filter::remove_offset(&mut voltage);
        filter::remove_offset(&mut current);

        Ok(power::power_from_waveforms(&voltage, &current))
    }

    pub fn print_report(&self) {
        print::print_all(&self.measurement);
    }
}

#[cfg(test)]
mod tests {
    use super::simulate::{SimulatedAdc, SimulatedInput};
    use super::*;

    fn transformer(adc: SimulatedAdc) -> CurrentTransformer<SimulatedAdc> {
        let mut ct = CurrentTransformer::new(adc, TransformerConfig::default());
        ct.init_adc(Attenuation::Db11, NO_OF_SAMPLES).unwrap();
        ct
    }

    #[test]
    fn init_configures_both_channels() {
        let ct = transformer(SimulatedAdc::new());
        assert_eq!(ct.adc().width(), AdcWidth::Bit12);
        assert_eq!(ct.adc().attenuation(DEFAULT_CHANNEL), Some(Attenuation::Db11));
        assert_eq!(ct.adc().attenuation(CURRENT_CHANNEL), Some(Attenuation::Db11));
        assert_eq!(ct.adc().continuous_samples(), NO_OF_SAMPLES);
        assert_eq!(ct.characteristics().unwrap().vref, DEFAULT_VREF_MV);
    }

    #[test]
    fn init_forces_12_bit_width() {
        let config = TransformerConfig {
            width: AdcWidth::Bit10,
            ..Default::default()
        };
        let mut ct = CurrentTransformer::new(SimulatedAdc::new(), config);
        ct.init_adc(Attenuation::Db11, NO_OF_SAMPLES).unwrap();

        assert_eq!(ct.adc().width(), AdcWidth::Bit12);
        assert_eq!(ct.config.width, AdcWidth::Bit12);
        assert_eq!(ct.characteristics().unwrap().width, AdcWidth::Bit12);
    }

    #[test]
    fn conversion_rejects_codes_above_width() {
        let ct = transformer(SimulatedAdc::new());
        assert_eq!(ct.convert_to_voltage(4095).unwrap(), 3299 + 142);
        assert!(matches!(
            ct.convert_to_voltage(4096),
            Err(Error::RawOutOfRange { raw: 4096, bits: 12 })
        ));
    }

    #[test]
    fn conversion_requires_init() {
        let ct = CurrentTransformer::new(SimulatedAdc::new(), TransformerConfig::default());
        assert!(matches!(ct.convert_to_voltage(100), Err(Error::NotInitialized)));
    }

    #[test]
    fn oneshot_reads_voltage_channel() {
        let mut ct = transformer(SimulatedAdc::new().with_input(DEFAULT_CHANNEL, SimulatedInput::dc(321)));
        assert_eq!(ct.read_oneshot().unwrap(), 321);
    }

    #[test]
    fn continuous_fills_buffer_and_stops() {
        let mut ct = transformer(SimulatedAdc::new().with_input(DEFAULT_CHANNEL, SimulatedInput::dc(1000)));
        let mut buffer = [0u16; NO_OF_SAMPLES];
        ct.read_continuous(&mut buffer).unwrap();

        assert!(buffer.iter().all(|&raw| raw == 1000));
        assert!(!ct.adc().is_continuous());
        assert_eq!(ct.adc().continuous_runs(), 1);
        assert_eq!(ct.filter_noise(&buffer).unwrap(), 1000);
    }

    #[test]
    fn continuous_stops_after_failed_read() {
        let adc = SimulatedAdc::new()
            .with_input(DEFAULT_CHANNEL, SimulatedInput::dc(1000))
            .with_failure_after(10);
        let mut ct = transformer(adc);
        let mut buffer = [0u16; NO_OF_SAMPLES];

        let result = ct.read_continuous(&mut buffer);

        assert!(matches!(result, Err(Error::RawOutOfRange { raw: 4096, bits: 12 })));
        assert!(!ct.adc().is_continuous());
        assert_eq!(ct.adc().continuous_runs(), 1);
        assert!(buffer[..10].iter().all(|&raw| raw == 1000));
        assert!(buffer[10..].iter().all(|&raw| raw == 0));
    }

    #[test]
    fn voltage_is_averaged_and_calibrated() {
        let mut ct = transformer(SimulatedAdc::new().with_input(DEFAULT_CHANNEL, SimulatedInput::dc(0)));
        // Zero counts is the 11 dB offset, 142 mV
        let volts = ct.read_voltage(DEFAULT_CHANNEL).unwrap();
        assert!((volts - 0.142).abs() < 1e-12);
    }

    #[test]
    fn current_uses_burden_model() {
        let mut ct = transformer(SimulatedAdc::new().with_input(CURRENT_CHANNEL, SimulatedInput::dc(4095)));
        // Full scale is vref: 1.1 V over 100 ohm
        let amps = ct.read_current(CURRENT_CHANNEL).unwrap();
        assert!((amps - 0.011).abs() < 1e-12);
        // 1100 mV over 100 ohm is 11 mA
        assert!((amps * 1000.0 - 11.0).abs() < 1e-9);

        ct.config.turns_ratio = 2000.0;
        let amps = ct.read_current(CURRENT_CHANNEL).unwrap();
        assert!((amps - 22.0).abs() < 1e-9);
    }

    #[test]
    fn measure_combines_readings() {
        let adc = SimulatedAdc::new()
            .with_input(DEFAULT_CHANNEL, SimulatedInput::dc(0))
            .with_input(CURRENT_CHANNEL, SimulatedInput::dc(4095));
        let mut ct = transformer(adc);

        let m = ct.measure().unwrap();
        assert_eq!(m.voltage_raw, 0);
        assert_eq!(m.current_raw, 4095);
        assert!((m.power.apparent_power - 0.142 * 0.011).abs() < 1e-12);
        assert_eq!(m.power.reactive_power, 0.0);
        assert!((ct.measurement.voltage - m.voltage).abs() < 1e-12);
    }

    #[test]
    fn waveform_power_for_in_phase_inputs() {
        let mut ct = transformer(SimulatedAdc::mains());
        let power = ct.measure_waveform(SAMPLES_PER_CYCLE).unwrap();

        assert!(power.real_power > 0.0);
        assert!(power.power_factor > 0.99);
        assert!(power.reactive_power.abs() < 0.05 * power.real_power);
    }

    #[test]
    fn waveform_needs_samples() {
        let mut ct = transformer(SimulatedAdc::mains());
        assert!(matches!(ct.measure_waveform(0), Err(Error::EmptyBuffer)));
    }

    #[test]
    fn waveform_capture_is_paced_at_sample_rate() {
        let mut ct = transformer(SimulatedAdc::mains());
        ct.config.sample_rate_hz = 2000.0;

        let started = Instant::now();
        ct.measure_waveform(41).unwrap();

        // 41 samples at 2 kHz span 40 periods of 500 us
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(ct.adc().reads(), 82);
    }

    #[test]
    fn waveform_rejects_bad_sample_rate() {
        let mut ct = transformer(SimulatedAdc::mains());
        for rate in [0.0, -50.0, f64::NAN, 1e-300] {
            ct.config.sample_rate_hz = rate;
            assert!(matches!(ct.measure_waveform(10), Err(Error::InvalidSampleRate(_))));
        }
        assert_eq!(ct.adc().reads(), 0);
    }
}
