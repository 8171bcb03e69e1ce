//! The analysis thread: spectrum paths, response curve and redraw hand-off

use crate::analysis::path::PathProducer;
use crate::audio::processor::AnalyzerTaps;
use contour_core::domain::audio::Channel;
use contour_core::domain::coefficients::ChainCoefficients;
use contour_core::domain::config::{ContourConfig, FftOrder};
use contour_core::domain::dsp::MonoChain;
use contour_core::domain::geometry::{Gridlines, Path, Rect};
use contour_core::domain::params::{ChangeFlag, ListenerHandle, ParamId, ParameterStore};
use contour_core::domain::response::ResponseCurve;
use contour_core::domain::settings::ChainSettings;
use crossbeam::channel::{self, Sender};
use crossbeam::select;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Everything the rendering layer paints for one tick
#[derive(Debug, Clone, Copy)]
pub struct DisplayFrame<'a> {
    pub left: &'a Path,
    pub right: &'a Path,
    pub response: &'a Path,
    pub gridlines: &'a Gridlines,
    /// The response curve was recomputed this tick
    pub response_changed: bool,
}

/// Receives a frame at the end of every tick
pub trait RenderSink: Send {
    fn render(&mut self, frame: &DisplayFrame<'_>);
}

impl<F> RenderSink for F
where
    F: FnMut(&DisplayFrame<'_>) + Send,
{
    fn render(&mut self, frame: &DisplayFrame<'_>) {
        self(frame)
    }
}

/// Analysis-side state: both path producers and the response overlay
///
/// Registers a [`ChangeFlag`] with the parameter store for its lifetime.
pub struct AnalyzerDisplay {
    params: Arc<ParameterStore>,
    changed: ChangeFlag,
    listener: ListenerHandle,
    left: PathProducer,
    right: PathProducer,
    chain: MonoChain,
    response: ResponseCurve,
    gridlines: Gridlines,
    sample_rate: f64,
    refresh_rate_hz: u32,
    ticks: u64,
    response_updates: u64,
}

impl AnalyzerDisplay {
    pub fn new(params: Arc<ParameterStore>, taps: AnalyzerTaps, config: &ContourConfig) -> Self {
        let area = config.display.area();
        let range_db = f64::from(config.display.response_range_db);

        // Raised so the first tick draws the response curve
        let changed = ChangeFlag::new(true);
        let listener = params.add_listener(Arc::new(changed.clone()));

        let left = PathProducer::new(
            Channel::Left,
            taps.left,
            taps.block_size,
            taps.sample_rate,
            &config.analyzer,
            area,
        );
        let right = PathProducer::new(
            Channel::Right,
            taps.right,
            taps.block_size,
            taps.sample_rate,
            &config.analyzer,
            area,
        );

        Self {
            params,
            changed,
            listener,
            left,
            right,
            chain: MonoChain::new(),
            response: ResponseCurve::new(area, range_db),
            gridlines: Gridlines::new(area, range_db),
            sample_rate: taps.sample_rate,
            refresh_rate_hz: config.analyzer.refresh_rate_hz.max(1),
            ticks: 0,
            response_updates: 0,
        }
    }

    /// One timer tick: drain, analyse, update the overlay, hand off a frame
    pub fn tick<S: RenderSink + ?Sized>(&mut self, sink: &mut S) {
        let enabled = self.params.flag(ParamId::AnalyzerEnabled);
        let left_fresh = self.left.process(enabled);
        let right_fresh = self.right.process(enabled);

        let response_changed = self.changed.take();
        if response_changed {
            self.refresh_response();
        }

        self.ticks += 1;
        trace!(tick = self.ticks, left_fresh, right_fresh, response_changed, "Analysis tick");

        sink.render(&DisplayFrame {
            left: self.left.path(),
            right: self.right.path(),
            response: self.response.path(),
            gridlines: &self.gridlines,
            response_changed,
        });
    }

    fn refresh_response(&mut self) {
        let settings = ChainSettings::from_store(&self.params);
        let coeffs = ChainCoefficients::design(&settings, self.sample_rate);
        self.chain.update(&coeffs, &settings);
        self.response.update(&self.chain, self.sample_rate);
        self.response_updates += 1;
        debug!(
            peak_freq = settings.peak_freq,
            peak_gain_db = settings.peak_gain_db,
            "Response curve updated"
        );
    }

    /// Move the analysis area, relaying out paths and gridlines
    pub fn set_area(&mut self, area: Rect, range_db: f64) {
        self.left.set_area(area);
        self.right.set_area(area);
        self.response = ResponseCurve::new(area, range_db);
        self.gridlines = Gridlines::new(area, range_db);
        self.changed.raise();
    }

    pub fn set_fft_order(&mut self, order: FftOrder) {
        self.left.set_fft_order(order);
        self.right.set_fft_order(order);
    }

    pub fn left_path(&self) -> &Path {
        self.left.path()
    }

    pub fn right_path(&self) -> &Path {
        self.right.path()
    }

    pub fn response_path(&self) -> &Path {
        self.response.path()
    }

    pub fn gridlines(&self) -> &Gridlines {
        &self.gridlines
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// How many times the response curve has been recomputed
    pub fn response_updates(&self) -> u64 {
        self.response_updates
    }

    /// Run ticks on a dedicated thread at the configured refresh rate
    pub fn spawn<S: RenderSink + 'static>(self, mut sink: S) -> std::io::Result<DisplayHandle> {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
        let interval = Duration::from_secs_f64(1.0 / f64::from(self.refresh_rate_hz));

        let thread = thread::Builder::new()
            .name("contour-analysis".to_string())
            .spawn(move || {
                let mut display = self;
                let ticker = channel::tick(interval);
                info!(interval_ms = interval.as_millis() as u64, "Analysis thread started");

                loop {
                    select! {
                        recv(ticker) -> _ => display.tick(&mut sink),
                        recv(shutdown_rx) -> _ => break,
                    }
                }

                let ticks = display.ticks;
                info!(ticks, "Analysis thread stopped");
                display
            })?;

        Ok(DisplayHandle {
            shutdown: shutdown_tx,
            thread,
        })
    }
}

impl Drop for AnalyzerDisplay {
    fn drop(&mut self) {
        self.params.remove_listener(self.listener);
    }
}

/// Handle to a running analysis thread
pub struct DisplayHandle {
    shutdown: Sender<()>,
    thread: JoinHandle<AnalyzerDisplay>,
}

impl DisplayHandle {
    /// Stop the thread and get the display back
    pub fn stop(self) -> thread::Result<AnalyzerDisplay> {
        // A full channel means a stop is already pending
        let _ = self.shutdown.try_send(());
        self.thread.join()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}
