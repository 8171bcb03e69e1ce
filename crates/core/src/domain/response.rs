//! Frequency response overlay
//!
//! Evaluates the combined magnitude of a [`MonoChain`] once per pixel column
//! of the analysis area. Only rerun when a parameter changes.

use crate::domain::audio::{gain_to_db, MINUS_INFINITY_DB};
use crate::domain::dsp::MonoChain;
use crate::domain::geometry::{map_from_log10, remap, Path, Point, Rect, MAX_FREQUENCY, MIN_FREQUENCY};

/// Response curve evaluator and the last path it produced
#[derive(Debug, Clone)]
pub struct ResponseCurve {
    area: Rect,
    range_db: f64,
    path: Path,
}

impl ResponseCurve {
    /// `range_db` is the gain shown at the top edge; the bottom is its negative
    pub fn new(area: Rect, range_db: f64) -> Self {
        Self {
            area,
            range_db,
            path: Path::with_capacity(area.columns()),
        }
    }

    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Recompute the path for `chain` and return it
    pub fn update(&mut self, chain: &MonoChain, sample_rate: f64) -> &Path {
        let points = Self::points(chain, sample_rate, self.area, self.range_db);
        self.path.rebuild(points);
        &self.path
    }

    /// Last computed path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily evaluate one point per pixel column
    pub fn points(
        chain: &MonoChain,
        sample_rate: f64,
        area: Rect,
        range_db: f64,
    ) -> impl Iterator<Item = Point> + Clone + '_ {
        let columns = area.columns();
        let top = f64::from(area.y);
        let bottom = f64::from(area.bottom());

        (0..columns).map(move |i| {
            let freq = map_from_log10(i as f64 / columns as f64, MIN_FREQUENCY, MAX_FREQUENCY);
            let magnitude = chain.magnitude_for_frequency(freq, sample_rate);
            let db = gain_to_db(magnitude, MINUS_INFINITY_DB);
            let y = remap(db, -range_db, range_db, bottom, top);
            Point::new(area.x + i as f32, y as f32)
        })
    }
}
