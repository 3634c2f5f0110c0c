use super::types::PowerMetrics;

/*
* @brief Calculate the power, reactive power, and apparent power from current and voltage.
* @param current RMS current in amperes
* @param voltage RMS voltage in volts
* @param power_factor cos(phi) of the load, 1.0 for a purely resistive load
* @note With a resistive load theta is zero and the reactive term vanishes.
*/
pub fn calculate_power(current: f64, voltage: f64, power_factor: f64) -> PowerMetrics {
    let pf = power_factor.clamp(-1.0, 1.0);
    let theta = pf.acos();

    let s = current * voltage;

    PowerMetrics {
        real_power: s * pf,
        reactive_power: s * theta.sin(),
        apparent_power: s,
        power_factor: pf,
    }
}

/*
* @brief Real power as the mean of the instantaneous products.
* @note Only the common length of both buffers is used.
*/
pub fn real_power_from_waveforms(voltage: &[f64], current: &[f64]) -> f64 {
    let length = voltage.len().min(current.len());
    if length == 0 {
        return 0.0;
    }

    let sum: f64 = voltage.iter().zip(current.iter()).map(|(v, i)| v * i).sum();

    sum / length as f64
}

/*
* @brief Reactive power from the voltage delayed by a quarter cycle.
* @note The buffers must hold exactly one cycle. Positive when current lags voltage.
*/
pub fn reactive_power_from_waveforms(voltage: &[f64], current: &[f64]) -> f64 {
    let length = voltage.len().min(current.len());
    if length == 0 {
        return 0.0;
    }

    let dephase = ((length as f64 / 4.0).round()) as usize; // 90 degrees in samples

    let sum: f64 = (0..length)
        .map(|k| voltage[(k + length - dephase) % length] * current[k])
        .sum();

    sum / length as f64
}

pub fn apparent_power(real_power: f64, react_power: f64) -> f64 {
    (real_power.powi(2) + react_power.powi(2)).sqrt()
}

/*
* @brief Power factor from apparent and real power.
* @return Value in [-1, 1], 0.0 when the apparent power is zero.
*/
pub fn power_factor(apparent_power: f64, real_power: f64) -> f64 {
    if apparent_power == 0.0 {
        // cannot calculate power factor
        return 0.0;
    }

    (real_power / apparent_power).clamp(-1.0, 1.0)
}

/*
* @brief Phase angle in degrees from power factor and reactive power.
* @note Positive for inductive loads, negative for capacitive loads.
*/
pub fn phase_angle(power_factor: f64, react_power: f64) -> f64 {
    let phase = power_factor.clamp(-1.0, 1.0).acos().to_degrees();

    if react_power < 0.0 {
        -phase
    } else {
        phase
    }
}

/// All power figures from one cycle of calibrated voltage and current samples.
pub fn power_from_waveforms(voltage: &[f64], current: &[f64]) -> PowerMetrics {
    let real_power = real_power_from_waveforms(voltage, current);
    let reactive_power = reactive_power_from_waveforms(voltage, current);
    let apparent_power = apparent_power(real_power, reactive_power);

    PowerMetrics {
        real_power,
        reactive_power,
        apparent_power,
        power_factor: power_factor(apparent_power, real_power),
    }
}
