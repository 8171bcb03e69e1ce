//! Spectrum paths: magnitude vectors mapped onto the analysis area

use crate::analysis::fft::{FftDataGenerator, MagnitudeConsumer};
use crate::audio::sample_fifo::SampleBlockConsumer;
use contour_core::domain::audio::Channel;
use contour_core::domain::config::{AnalyzerConfig, FftOrder};
use contour_core::domain::geometry::{map_to_log10, remap, Path, Point, Rect, MAX_FREQUENCY, MIN_FREQUENCY};
use tracing::{debug, warn};

/// Vertical scale of the spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumScale {
    pub floor_db: f32,
    pub ceiling_db: f32,
}

impl From<&AnalyzerConfig> for SpectrumScale {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            floor_db: config.floor_db,
            ceiling_db: config.ceiling_db,
        }
    }
}

/// Lazily map one magnitude vector to points
///
/// Bin `k` sits at `k * sample_rate / fft_size` Hz. Bins outside the display
/// range and non-finite magnitudes are skipped.
pub fn spectrum_points(
    magnitudes: &[f32],
    fft_size: usize,
    sample_rate: f64,
    area: Rect,
    scale: SpectrumScale,
) -> impl Iterator<Item = Point> + Clone + '_ {
    let bin_width = sample_rate / fft_size as f64;
    let width = f64::from(area.width);
    let top = f64::from(area.y);
    let bottom = f64::from(area.bottom());

    magnitudes.iter().enumerate().filter_map(move |(bin, &db)| {
        let freq = bin as f64 * bin_width;
        if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&freq) || !db.is_finite() {
            return None;
        }

        let x = f64::from(area.x) + width * map_to_log10(freq, MIN_FREQUENCY, MAX_FREQUENCY);
        let y = remap(
            f64::from(db),
            f64::from(scale.floor_db),
            f64::from(scale.ceiling_db),
            bottom,
            top,
        );
        Some(Point::new(x as f32, y as f32))
    })
}

/// One channel's analyzer pipeline on the analysis thread
///
/// Drains sample blocks into the FFT data generator, drains magnitude vectors
/// and keeps a path built from the most recent one.
pub struct PathProducer {
    channel: Channel,
    samples: SampleBlockConsumer,
    block: Vec<f32>,
    generator: FftDataGenerator,
    magnitudes: MagnitudeConsumer,
    latest: Vec<f32>,
    path: Path,
    area: Rect,
    sample_rate: f64,
    scale: SpectrumScale,
}

impl PathProducer {
    pub fn new(
        channel: Channel,
        samples: SampleBlockConsumer,
        block_size: usize,
        sample_rate: f64,
        config: &AnalyzerConfig,
        area: Rect,
    ) -> Self {
        let (generator, magnitudes) =
            FftDataGenerator::new(config.fft_order, config.floor_db, config.fifo_capacity);
        let latest = vec![config.floor_db; config.fft_order.bins()];

        Self {
            channel,
            samples,
            block: vec![0.0; block_size.max(1)],
            generator,
            magnitudes,
            latest,
            path: Path::with_capacity(area.columns()),
            area,
            sample_rate,
            scale: SpectrumScale::from(config),
        }
    }

    /// Run one tick; returns whether the path was rebuilt
    ///
    /// With `enabled` false the FIFOs are still emptied but nothing is
    /// analysed; the path and the sliding window are cleared.
    pub fn process(&mut self, enabled: bool) -> bool {
        if !enabled {
            self.samples.skip_all();
            self.magnitudes.skip_all();
            self.generator.reset();
            self.path.clear();
            return false;
        }

        let dropped_before = self.generator.dropped_vectors();
        while self.samples.pull(&mut self.block) {
            self.generator.push_block(&self.block);
        }

        let dropped = self.generator.dropped_vectors() - dropped_before;
        if dropped > 0 {
            warn!(channel = self.channel.name(), dropped, "Spectrum vectors dropped");
        }

        let mut fresh = false;
        while self.magnitudes.pull(&mut self.latest) {
            fresh = true;
        }

        if fresh {
            let points = spectrum_points(
                &self.latest,
                self.generator.fft_size(),
                self.sample_rate,
                self.area,
                self.scale,
            );
            self.path.rebuild(points);
        }

        fresh
    }

    /// Switch FFT size; the next tick starts from an empty window
    pub fn set_fft_order(&mut self, order: FftOrder) {
        if order == self.generator.order() {
            return;
        }

        self.magnitudes = self.generator.change_order(order);
        self.latest = vec![self.scale.floor_db; order.bins()];
        self.path.clear();
        debug!(channel = self.channel.name(), fft_size = order.size(), "FFT order changed");
    }

    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    /// Points of the latest magnitude vector, recomputed on demand
    pub fn points(&self) -> impl Iterator<Item = Point> + Clone + '_ {
        spectrum_points(
            &self.latest,
            self.generator.fft_size(),
            self.sample_rate,
            self.area,
            self.scale,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn fft_order(&self) -> FftOrder {
        self.generator.order()
    }
}
