//! Screen-space geometry handed to the rendering layer
//!
//! Points, rectangles and polylines in pixel units, plus the frequency and
//! decibel mappings shared by the spectrum analyzer and the response curve.

use serde::{Deserialize, Serialize};

/// Lowest frequency shown on the display
pub const MIN_FREQUENCY: f64 = 20.0;
/// Highest frequency shown on the display
pub const MAX_FREQUENCY: f64 = 20000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle; y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Width in whole pixel columns
    pub fn columns(&self) -> usize {
        self.width.max(0.0) as usize
    }
}

/// An open polyline, rebuilt wholesale on every update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Point>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Replace the contents, reusing the existing allocation
    pub fn rebuild<I: IntoIterator<Item = Point>>(&mut self, points: I) {
        self.points.clear();
        self.points.extend(points);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<Point> for Path {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl Extend<Point> for Path {
    fn extend<I: IntoIterator<Item = Point>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

// ============================================================================
// MAPPINGS
// ============================================================================

/// Linear remap of `value` from one range onto another
#[inline]
pub fn remap(value: f64, source_min: f64, source_max: f64, target_min: f64, target_max: f64) -> f64 {
    target_min + (value - source_min) * (target_max - target_min) / (source_max - source_min)
}

/// Position (0..1) of `value` on a logarithmic axis
#[inline]
pub fn map_to_log10(value: f64, min: f64, max: f64) -> f64 {
    (value / min).log10() / (max / min).log10()
}

/// Value at `proportion` (0..1) along a logarithmic axis
#[inline]
pub fn map_from_log10(proportion: f64, min: f64, max: f64) -> f64 {
    min * (max / min).powf(proportion)
}

// ============================================================================
// GRIDLINES
// ============================================================================

/// Frequencies that get a vertical gridline
pub const GRID_FREQUENCIES: [f64; 10] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0,
];

/// Gains that get a horizontal gridline
pub const GRID_GAINS: [f64; 5] = [-24.0, -12.0, 0.0, 12.0, 24.0];

/// Offset between the response scale and the analyzer scale labels
pub const ANALYZER_LABEL_OFFSET_DB: f64 = -24.0;

/// One labelled gridline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    /// x for frequency lines, y for gain lines
    pub position: f32,
    pub value: f64,
    pub label: String,
    /// Analyzer-scale label for gain lines
    pub secondary_label: Option<String>,
}

/// The fixed axis grid of the analysis area
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gridlines {
    pub frequencies: Vec<GridLine>,
    pub gains: Vec<GridLine>,
}

impl Gridlines {
    /// Lay out the grid for `area`, with gains spanning ±`range_db`
    pub fn new(area: Rect, range_db: f64) -> Self {
        let frequencies = GRID_FREQUENCIES
            .iter()
            .map(|&freq| GridLine {
                position: area.x
                    + (f64::from(area.width) * map_to_log10(freq, MIN_FREQUENCY, MAX_FREQUENCY)) as f32,
                value: freq,
                label: frequency_label(freq),
                secondary_label: None,
            })
            .collect();

        let gains = GRID_GAINS
            .iter()
            .map(|&gain| GridLine {
                position: remap(
                    gain,
                    -range_db,
                    range_db,
                    f64::from(area.bottom()),
                    f64::from(area.y),
                ) as f32,
                value: gain,
                label: gain_label(gain),
                secondary_label: Some(format!("{}", gain + ANALYZER_LABEL_OFFSET_DB)),
            })
            .collect();

        Self { frequencies, gains }
    }
}

/// "20Hz", "500Hz", "1kHz", "20kHz"
pub fn frequency_label(freq: f64) -> String {
    if freq >= 1000.0 {
        format!("{}kHz", freq / 1000.0)
    } else {
        format!("{}Hz", freq)
    }
}

/// "+12dB", "0dB", "-24dB"
pub fn gain_label(gain: f64) -> String {
    if gain > 0.0 {
        format!("+{}dB", gain)
    } else {
        format!("{}dB", gain)
    }
}
