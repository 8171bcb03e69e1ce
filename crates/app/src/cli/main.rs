//! Contour development harness
//!
//! Runs the EQ processor on a simulated host audio thread and the analyzer
//! display on its own thread, while sweeping the peak band from the control
//! side. Useful for watching the two-thread model under real timing.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use contour_core::domain::config::{ConfigManager, ContourConfig, FftOrder};
use contour_core::domain::params::{ParamId, ParameterStore};
use contour_infra::analysis::{AnalyzerDisplay, DisplayFrame};
use contour_infra::audio::EqProcessor;
use crossbeam::channel::{self, Receiver, TryRecvError};
use std::f32::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FftSize {
    #[value(name = "2048")]
    S2048,
    #[value(name = "4096")]
    S4096,
    #[value(name = "8192")]
    S8192,
}

impl From<FftSize> for FftOrder {
    fn from(size: FftSize) -> Self {
        match size {
            FftSize::S2048 => FftOrder::Order2048,
            FftSize::S4096 => FftOrder::Order4096,
            FftSize::S8192 => FftOrder::Order8192,
        }
    }
}

#[derive(Parser)]
#[command(name = "contour")]
#[command(about = "Parametric EQ signal path and analyzer harness", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to the per-user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to run, in seconds
    #[arg(short, long, default_value_t = 3.0)]
    seconds: f64,

    /// Frequency of the test tone fed to the left channel
    #[arg(long, default_value_t = 440.0)]
    tone_hz: f32,

    /// Override the analyzer FFT size
    #[arg(long, value_enum)]
    fft_size: Option<FftSize>,

    /// Steepness of both cut filters, 0 (12 dB/Oct) to 3 (48 dB/Oct)
    #[arg(long, default_value_t = 1)]
    slope: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Contour starting...");

    let mut config = match &cli.config {
        Some(path) => ContourConfig::load_from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let (config, origin) = ConfigManager::for_user()?.load().await;
            if origin.is_fallback() {
                info!(?origin, "Running with the default configuration");
            }
            config
        }
    };
    if let Some(size) = cli.fft_size {
        config.analyzer.fft_order = size.into();
    }
    config.validate()?;
    debug!(?config, "Configuration resolved");
    let duration = run_duration(cli.seconds)?;

    let params = Arc::new(ParameterStore::new());
    params.set(ParamId::LowCutFreq, 80.0);
    params.set(ParamId::HighCutFreq, 12000.0);
    params.set(ParamId::LowCutSlope, f32::from(cli.slope));
    params.set(ParamId::HighCutSlope, f32::from(cli.slope));
    params.set(ParamId::PeakGain, 6.0);

    let sample_rate = f64::from(config.audio.sample_rate);
    let (processor, taps) = EqProcessor::prepare(
        params.clone(),
        sample_rate,
        config.audio.block_size,
        &config.analyzer,
    )?;

    let display = AnalyzerDisplay::new(params.clone(), taps, &config);
    let display = display.spawn(|frame: &DisplayFrame<'_>| {
        if frame.response_changed {
            debug!(
                response_points = frame.response.len(),
                left_points = frame.left.len(),
                right_points = frame.right.len(),
                "Redraw after parameter change"
            );
        }
    })?;

    let (stop_tx, stop_rx) = channel::bounded::<()>(1);
    let host = spawn_host(processor, cli.tone_hz, config.audio.block_size, stop_rx)?;

    run_control(&params, duration).await;

    let _ = stop_tx.send(());
    let processor = host
        .join()
        .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;
    let analysis = display
        .stop()
        .map_err(|_| anyhow::anyhow!("analysis thread panicked"))?;

    let dropped = processor.dropped_blocks();
    if dropped > 0 {
        warn!(dropped, "Analyzer blocks dropped by the audio thread");
    }
    info!(
        blocks = processor.pushed_blocks(),
        dropped,
        ticks = analysis.ticks(),
        response_updates = analysis.response_updates(),
        "Contour finished"
    );

    Ok(())
}

/// How long the harness runs; negative values mean "stop right away"
fn run_duration(seconds: f64) -> anyhow::Result<Duration> {
    let seconds_or_zero = if seconds < 0.0 { 0.0 } else { seconds };
    Duration::try_from_secs_f64(seconds_or_zero)
        .with_context(|| format!("--seconds {seconds} is not a usable run time"))
}

/// Simulated host: one callback per block at real-time cadence
fn spawn_host(
    mut processor: EqProcessor,
    tone_hz: f32,
    block_size: usize,
    stop: Receiver<()>,
) -> std::io::Result<thread::JoinHandle<EqProcessor>> {
    thread::Builder::new().name("contour-audio".to_string()).spawn(move || {
        let sample_rate = processor.sample_rate() as f32;
        let period = Duration::from_secs_f64(block_size as f64 / f64::from(sample_rate));
        let mut left = vec![0.0f32; block_size];
        let mut right = vec![0.0f32; block_size];
        let mut phase = 0.0f32;
        let step = 2.0 * PI * tone_hz / sample_rate;
        let mut noise = 0x1234_5678u32;

        info!(tone_hz, block_size, "Audio thread started");
        let mut next = Instant::now();

        loop {
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                *l = 0.5 * phase.sin();
                phase = (phase + step) % (2.0 * PI);

                // xorshift white noise on the right channel
                noise ^= noise << 13;
                noise ^= noise >> 17;
                noise ^= noise << 5;
                *r = (noise as f32 / u32::MAX as f32 - 0.5) * 0.5;
            }

            processor.process_block(&mut [&mut left[..], &mut right[..]]);

            next += period;
            if let Some(wait) = next.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }

        info!("Audio thread stopped");
        processor
    })
}

/// Control side: sweep the peak band across the spectrum until time is up
async fn run_control(params: &ParameterStore, duration: Duration) {
    let start = tokio::time::Instant::now();
    let mut interval = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let elapsed = start.elapsed();
                if elapsed >= duration {
                    break;
                }
                let position = elapsed.as_secs_f32() / duration.as_secs_f32().max(f32::EPSILON);
                let freq = params.set(ParamId::PeakFreq, 100.0 * 100.0_f32.powf(position));
                debug!(peak_freq = freq, "Peak swept");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }
}
