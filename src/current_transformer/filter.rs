use super::error::{Error, Result};

/*
* @brief Filter out noise from the ADC readings by averaging multiple samples.
* @param buffer Raw ADC readings
* @return Truncated integer average of the readings
* @note An empty buffer has no average and is reported as an error.
*/
pub fn filter_noise(buffer: &[u16]) -> Result<u32> {
    if buffer.is_empty() {
        return Err(Error::EmptyBuffer);
    }

    let sum: u64 = buffer.iter().map(|&raw| raw as u64).sum();

    Ok((sum / buffer.len() as u64) as u32)
}

/*
* @brief Remove the DC offset from a signal.
* @param signal Calibrated samples, modified in place
* @note The offset is the midpoint between the maximum and minimum values,
*       the bias point of a transformer input riding on half the supply.
*/
pub fn remove_offset(signal: &mut [f64]) {
    if signal.is_empty() {
        return;
    }

    let max = signal.iter().copied().fold(f64::MIN, f64::max);
    let min = signal.iter().copied().fold(f64::MAX, f64::min);
    let offset = (max + min) / 2.0;

    for s in signal.iter_mut() {
        *s -= offset;
    }
}

/*
* @brief Exponential average of a value across measurements.
* @param in_value New value
* @param out_value Running value, seeded by the first non-zero input
* @param avg Smoothing coefficient, 1.0 follows the input exactly
*/
pub fn update_average(in_value: f64, out_value: &mut f64, avg: f64) {
    if *out_value == 0.0 {
        *out_value = in_value;
    } else {
        let old_value = *out_value;
        *out_value += avg * (in_value - old_value);
    }
}
