use super::types::{Measurement, PowerMetrics};

/*
* @brief Print the voltage and current readings.
* @param data Measurement to print.
*/
pub fn print_readings(data: &Measurement) {
    log::info!("Voltage:");
    log::info!("  Raw: {}", data.voltage_raw);
    log::info!("  Value: {:.3} V", data.voltage);
    log::info!("Current:");
    log::info!("  Raw: {}", data.current_raw);
    log::info!("  Value: {:.6} A\n", data.current);
}

/*
* @brief Print the power data
* @param label Where the figures come from.
* @param power Power figures to print.
*/
pub fn print_power(label: &str, power: &PowerMetrics) {
    log::info!("Power ({}):", label);
    log::info!("  Active: {:.3} W", power.real_power);
    log::info!("  Reactive: {:.3} VAR", power.reactive_power);
    log::info!("  Apparent: {:.3} VA", power.apparent_power);
    log::info!("  Factor: {:.3}\n", power.power_factor);
}

pub fn print_all(data: &Measurement) {
    print_readings(data);
    print_power("averaged", &data.power);
}
