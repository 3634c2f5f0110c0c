use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use signal_hook::consts::signal::{SIGINT, SIGTERM};

use current_transformer::current_transformer::print;
use current_transformer::{
    AdcChannel, AdcDriver, Attenuation, CurrentTransformer, IioAdc, SimulatedAdc, TransformerConfig,
    DEFAULT_IIO_DEVICE, MAINS_HZ, SAMPLE_RATE_HZ,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AttenuationArg {
    #[value(name = "0")]
    Db0,
    #[value(name = "2.5")]
    Db2_5,
    #[value(name = "6")]
    Db6,
    #[value(name = "11")]
    Db11,
}

impl From<AttenuationArg> for Attenuation {
    fn from(arg: AttenuationArg) -> Self {
        match arg {
            AttenuationArg::Db0 => Attenuation::Db0,
            AttenuationArg::Db2_5 => Attenuation::Db2_5,
            AttenuationArg::Db6 => Attenuation::Db6,
            AttenuationArg::Db11 => Attenuation::Db11,
        }
    }
}

/// Current transformer power monitor
#[derive(Parser, Debug)]
#[command(author, version, about = "Voltage, current and power from a current transformer on an ADC", long_about = None)]
struct Args {
    /// Simulate signal samples instead of reading from hardware
    #[arg(short = 's', long)]
    simulate: bool,

    /// IIO device directory of the ADC
    #[arg(short = 'd', long, default_value = DEFAULT_IIO_DEVICE)]
    device: PathBuf,

    /// Voltage input channel
    #[arg(long, default_value_t = 6)]
    channel: u8,

    /// AC current input channel
    #[arg(long, default_value_t = 7)]
    current_channel: u8,

    /// Input attenuation in dB
    #[arg(short = 'a', long, value_enum, default_value = "11")]
    attenuation: AttenuationArg,

    /// Samples averaged per voltage reading
    #[arg(short = 'n', long, default_value_t = 64)]
    samples: usize,

    /// ADC reference voltage in mV
    #[arg(long, default_value_t = 1100)]
    vref: u32,

    /// Burden resistor in ohms
    #[arg(long, default_value_t = 100.0)]
    burden: f64,

    /// Transformer turns ratio applied to the burden current
    #[arg(long, default_value_t = 1.0)]
    ratio: f64,

    /// Line volts per volt at the ADC pin
    #[arg(long, default_value_t = 1.0)]
    voltage_scale: f64,

    /// Power factor of the load, 1 for a purely resistive load
    #[arg(long, default_value_t = 1.0)]
    power_factor: f64,

    /// Also compute power from one sampled cycle of both inputs
    #[arg(short = 'w', long)]
    waveform: bool,

    /// Sample rate of the waveform capture in Hz
    #[arg(long, default_value_t = SAMPLE_RATE_HZ)]
    sample_rate: f64,

    /// Mains frequency in Hz, sets the samples taken per waveform capture
    #[arg(long, default_value_t = MAINS_HZ)]
    mains: f64,

    /// Time between measurements
    #[arg(short = 'i', long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many measurements
    #[arg(short = 'c', long)]
    count: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let config = TransformerConfig {
        voltage_channel: AdcChannel::new(args.channel)?,
        current_channel: AdcChannel::new(args.current_channel)?,
        vref_mv: args.vref,
        burden_ohms: args.burden,
        turns_ratio: args.ratio,
        voltage_scale: args.voltage_scale,
        power_factor: args.power_factor,
        sample_rate_hz: args.sample_rate,
        mains_hz: args.mains,
        ..Default::default()
    };

    let adc: Box<dyn AdcDriver> = if args.simulate {
        log::info!("Simulating signals instead of reading from hardware.");
        Box::new(SimulatedAdc::mains().with_noise(4.0, 0x5eed))
    } else {
        log::info!("Reading signals from hardware.");
        Box::new(IioAdc::open(&args.device)?)
    };

    let mut transformer = CurrentTransformer::new(adc, config);
    transformer.init_adc(args.attenuation.into(), args.samples)?;

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&term))?;

    let interval = Duration::from_millis(args.interval_ms);
    let mut done: u64 = 0;

    while !term.load(Ordering::Relaxed) {
        let started = Instant::now();

        match transformer.measure() {
            Ok(measurement) => {
                log::debug!("{:?}", measurement);
                transformer.print_report();
            }
            Err(e) => log::error!("Measurement failed: {}", e),
        }

        if args.waveform {
            match transformer.measure_waveform(transformer.config.samples_per_cycle()) {
                Ok(power) => print::print_power("waveform", &power),
                Err(e) => log::error!("Waveform measurement failed: {}", e),
            }
        }

        done += 1;
        if args.count.is_some_and(|count| done >= count) {
            break;
        }

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            spin_sleep::sleep(remaining);
        }
    }

    log::info!("Stopped after {} measurements", done);

    Ok(())
}
