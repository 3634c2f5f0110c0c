/* ----------------- ADC characterization ------------------ */

use super::error::{Error, Result};
use super::types::{AdcUnit, AdcWidth, Attenuation};

const LIN_COEFF_A_SCALE: u64 = 65536;
const LIN_COEFF_A_ROUND: u64 = LIN_COEFF_A_SCALE / 2;
const ADC_12_BIT_RES: u64 = 4096;

// Per attenuation scale and offset of the vref based line, indexed 0dB..11dB
const ADC1_VREF_ATTEN_SCALE: [u64; 4] = [57431, 76236, 105481, 196602];
const ADC1_VREF_ATTEN_OFFSET: [u32; 4] = [75, 78, 107, 142];
const ADC2_VREF_ATTEN_SCALE: [u64; 4] = [57236, 76186, 105238, 191284];
const ADC2_VREF_ATTEN_OFFSET: [u32; 4] = [49, 50, 69, 116];

/// Linear raw to millivolt curve of one ADC unit at one attenuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Characteristics {
    pub unit: AdcUnit,
    pub atten: Attenuation,
    pub width: AdcWidth,
    pub vref: u32,
    coeff_a: u64,
    coeff_b: u32,
}

impl Characteristics {
    /*
     * @brief Characterize the ADC curve as y = (coeff_a * x) + coeff_b.
     * @param vref Reference voltage in mV
     * @note Coefficients are scaled to avoid floating point.
     */
    pub fn characterize(unit: AdcUnit, atten: Attenuation, width: AdcWidth, vref: u32) -> Self {
        let (scales, offsets) = match unit {
            AdcUnit::Adc1 => (&ADC1_VREF_ATTEN_SCALE, &ADC1_VREF_ATTEN_OFFSET),
            AdcUnit::Adc2 => (&ADC2_VREF_ATTEN_SCALE, &ADC2_VREF_ATTEN_OFFSET),
        };
        let index = atten.table_index();
        let coeff_a = (vref as u64 * scales[index]) / ADC_12_BIT_RES;
        let coeff_b = offsets[index];

        log::debug!(
            "ADC characterized: {:?} {:?} {}-bit vref={}mV a={} b={}",
            unit,
            atten,
            width.bits(),
            vref,
            coeff_a,
            coeff_b
        );

        Self {
            unit,
            atten,
            width,
            vref,
            coeff_a,
            coeff_b,
        }
    }

    /// Convert a raw reading to millivolts. Readings above the width maximum saturate.
    pub fn raw_to_voltage(&self, raw: u32) -> u32 {
        let raw = raw.min(self.width.max_raw() as u32) as u64;
        let reading = raw << (12 - self.width.bits());

        (((self.coeff_a * reading + LIN_COEFF_A_ROUND) / LIN_COEFF_A_SCALE) as u32) + self.coeff_b
    }

    /// Like [`raw_to_voltage`](Self::raw_to_voltage) but rejects out of range codes.
    pub fn checked_raw_to_voltage(&self, raw: u32) -> Result<u32> {
        if raw > self.width.max_raw() as u32 {
            return Err(Error::RawOutOfRange {
                raw,
                bits: self.width.bits(),
            });
        }
        Ok(self.raw_to_voltage(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adc1(atten: Attenuation) -> Characteristics {
        Characteristics::characterize(AdcUnit::Adc1, atten, AdcWidth::Bit12, 1100)
    }

    #[test]
    fn zero_reading_is_the_offset() {
        assert_eq!(adc1(Attenuation::Db11).raw_to_voltage(0), 142);
        assert_eq!(adc1(Attenuation::Db0).raw_to_voltage(0), 75);
    }

    #[test]
    fn full_scale_11db() {
        // 1100 * 196602 / 4096 = 52798; (52798 * 4095 + 32768) / 65536 = 3299
        assert_eq!(adc1(Attenuation::Db11).raw_to_voltage(4095), 3299 + 142);
    }

    #[test]
    fn curve_is_monotonic() {
        let chars = adc1(Attenuation::Db6);
        let mut last = 0;
        for raw in 0..=4095 {
            let mv = chars.raw_to_voltage(raw);
            assert!(mv >= last);
            last = mv;
        }
    }

    #[test]
    fn narrow_width_is_scaled_to_12_bits() {
        let wide = adc1(Attenuation::Db11);
        let narrow = Characteristics::characterize(AdcUnit::Adc1, Attenuation::Db11, AdcWidth::Bit10, 1100);
        assert_eq!(narrow.raw_to_voltage(512), wide.raw_to_voltage(2048));
    }

    #[test]
    fn out_of_range_raw() {
        let chars = adc1(Attenuation::Db11);
        assert_eq!(chars.raw_to_voltage(10_000), chars.raw_to_voltage(4095));
        assert!(matches!(
            chars.checked_raw_to_voltage(4096),
            Err(Error::RawOutOfRange { raw: 4096, bits: 12 })
        ));
    }

    #[test]
    fn adc2_uses_its_own_table() {
        let chars = Characteristics::characterize(AdcUnit::Adc2, Attenuation::Db11, AdcWidth::Bit12, 1100);
        assert_eq!(chars.raw_to_voltage(0), 116);
    }
}
