//! Command-line front end: drives the analysis chain from the simulator or
//! from live input and prints one reading per cycle.

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use freqtune_core::config as config_file;
use freqtune_core::{
    acquire, AcquisitionError, Reading, ReadingStatus, SampleSource, SignalSimulator,
    SimulatedSource, Smoothing, Tuner, TunerConfig, Waveform,
};

#[derive(Parser)]
#[command(
    name = "freqtune",
    version,
    about = "Measures the fundamental frequency of a sampled tone and names the nearest note"
)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print readings as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Override the noise floor in sample units
    #[arg(long, global = true)]
    noise_floor: Option<u16>,

    /// Override the hysteresis divisor
    #[arg(long, global = true)]
    divisor: Option<u16>,

    /// Moving-average window for smoothing (0 disables it)
    #[arg(long, global = true)]
    smoothing: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze simulated buffers
    Simulate {
        /// sine, rising-ramp or falling-ramp
        #[arg(short, long, default_value = "sine")]
        waveform: Waveform,

        /// Tone frequency in Hz
        #[arg(short, long)]
        frequency: f32,

        /// Peak-to-peak uniform noise in sample units
        #[arg(short, long, default_value_t = 0)]
        noise: u16,

        #[arg(short = 'r', long, default_value_t = 30_000)]
        sample_rate: u32,

        /// Samples per buffer
        #[arg(short, long, default_value_t = 4096)]
        length: usize,

        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Number of buffers to analyze
        #[arg(long, default_value_t = 1)]
        cycles: usize,
    },

    /// Analyze live input from the default audio device
    #[cfg(feature = "capture")]
    Listen {
        /// Stop after this many readings (runs until the device goes away otherwise)
        #[arg(long)]
        cycles: Option<usize>,

        #[arg(short = 'r', long, default_value_t = 48_000)]
        sample_rate: u32,

        /// Samples per buffer
        #[arg(short, long, default_value_t = 4096)]
        length: usize,
    },

    /// Write the default configuration as JSON
    InitConfig {
        #[arg(short, long, default_value = "freqtune.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Simulate {
            waveform,
            frequency,
            noise,
            sample_rate,
            length,
            seed,
            cycles,
        } => {
            let simulator = SignalSimulator::new(config.simulator.clone(), seed);
            let open = move || -> Result<SimulatedSource> {
                Ok(SimulatedSource::new(
                    simulator,
                    waveform,
                    frequency,
                    noise,
                    sample_rate,
                ))
            };
            run(config, open, length, Some(cycles), cli.json)
        }
        #[cfg(feature = "capture")]
        Commands::Listen {
            cycles,
            sample_rate,
            length,
        } => {
            let open = move || freqtune_core::audio::CaptureSource::open(sample_rate);
            run(config, open, length, cycles, cli.json)
        }
        Commands::InitConfig { output } => {
            config_file::save(&config, &output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("Wrote configuration to {}", output.display());
            Ok(())
        }
    }
}

/// Loads the configuration file, if any, and applies the command-line overrides.
fn resolve_config(cli: &Cli) -> Result<TunerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            config_file::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => TunerConfig::default(),
    };

    if let Some(noise_floor) = cli.noise_floor {
        config.analysis.noise_floor = noise_floor;
    }
    if let Some(divisor) = cli.divisor {
        config.analysis.hysteresis_divisor = divisor;
    }
    if let Some(window) = cli.smoothing {
        config.analysis.smoothing = match window {
            0 => Smoothing::None,
            window => Smoothing::MovingAverage { window },
        };
    }

    config.validate()?;
    Ok(config)
}

/// Runs the fill → analyze → map cycle on a worker thread and prints
/// readings until `cycles` have been shown or the source stops.
///
/// The source is opened inside the worker because live capture streams
/// cannot move between threads.
fn run<S, F>(
    config: TunerConfig,
    open: F,
    length: usize,
    cycles: Option<usize>,
    json: bool,
) -> Result<()>
where
    S: SampleSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (reading_tx, reading_rx) = crossbeam_channel::bounded(4);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

    let worker = thread::spawn(move || -> Result<()> {
        let mut source = open()?;
        let tuner = Tuner::new(config);
        debug!("Worker started at {} Hz", source.sample_rate());
        analysis_loop(&mut source, &tuner, length, &reading_tx, &shutdown_rx)
    });

    let relayed = relay(&reading_rx, cycles, json, &mut io::stdout().lock());
    let _ = shutdown_tx.send(());
    drop(reading_rx);

    match worker.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("analysis thread panicked"),
    }
    debug!("Showed {} readings", relayed?);
    Ok(())
}

/// Writes readings as they arrive until `cycles` have been shown or the
/// worker hangs up. Returns how many were written.
fn relay<W: Write>(
    readings: &Receiver<Reading>,
    cycles: Option<usize>,
    json: bool,
    out: &mut W,
) -> Result<usize> {
    let mut shown = 0;
    while !cycles.is_some_and(|limit| shown >= limit) {
        let Ok(reading) = readings.recv() else {
            break;
        };
        write_reading(out, &reading, json)?;
        shown += 1;
    }
    Ok(shown)
}

fn analysis_loop<S: SampleSource>(
    source: &mut S,
    tuner: &Tuner,
    length: usize,
    readings: &Sender<Reading>,
    shutdown: &Receiver<()>,
) -> Result<()> {
    loop {
        let step = crossbeam_channel::select! {
            recv(shutdown) -> _ => {
                debug!("Worker received shutdown signal");
                Ok(false)
            },
            default => run_cycle(source, tuner, length, readings),
        };
        if !step? {
            return Ok(());
        }
    }
}

/// One acquisition and analysis; `Ok(false)` ends the worker.
fn run_cycle<S: SampleSource>(
    source: &mut S,
    tuner: &Tuner,
    length: usize,
    readings: &Sender<Reading>,
) -> Result<bool> {
    let buffer = match acquire(source, length) {
        Ok(buffer) => buffer,
        Err(AcquisitionError::ShortRead { .. }) => return Ok(true),
        Err(AcquisitionError::Disconnected) => {
            warn!("Sample source disconnected");
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };
    Ok(readings.send(tuner.process(&buffer)).is_ok())
}

fn write_reading<W: Write>(out: &mut W, reading: &Reading, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(reading)?)?;
        return Ok(());
    }

    match (&reading.note_name, reading.status) {
        (Some(name), status) if reading.valid => {
            let tag = match status {
                ReadingStatus::Confident => "ok",
                _ => "unsure",
            };
            writeln!(
                out,
                "{name:<4} {:+4} cents  {:>9.2} Hz  [{tag}]",
                reading.cents, reading.frequency
            )?;
        }
        _ => writeln!(out, "--   no tone")?,
    }
    Ok(())
}
