//! Per-block snapshot of the EQ parameters

use crate::domain::params::{ParamId, ParameterStore, SLOPE_CHOICES};
use serde::{Deserialize, Serialize};

/// Steepness of a cut filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Slope12,
    Slope24,
    Slope36,
    Slope48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Slope12, Slope::Slope24, Slope::Slope36, Slope::Slope48];

    /// Slope for a choice index; anything out of range is the gentlest slope
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Slope::Slope24,
            2 => Slope::Slope36,
            3 => Slope::Slope48,
            _ => Slope::Slope12,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Butterworth order: 2, 4, 6 or 8
    pub fn order(self) -> usize {
        2 * (self.index() + 1)
    }

    /// Number of second-order sections needed for this slope
    pub fn sections(self) -> usize {
        self.order() / 2
    }

    pub fn db_per_octave(self) -> f32 {
        12.0 * self.sections() as f32
    }

    pub fn label(self) -> &'static str {
        SLOPE_CHOICES[self.index()]
    }
}

/// Immutable view of every parameter the filter math needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_quality: 1.0,
            low_cut_freq: 20.0,
            high_cut_freq: 20000.0,
            low_cut_slope: Slope::Slope12,
            high_cut_slope: Slope::Slope12,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
        }
    }
}

impl ChainSettings {
    /// Read a fresh snapshot from the live store
    ///
    /// Each field is one atomic load, so this is safe on the audio thread.
    pub fn from_store(store: &ParameterStore) -> Self {
        Self {
            peak_freq: store.get(ParamId::PeakFreq),
            peak_gain_db: store.get(ParamId::PeakGain),
            peak_quality: store.get(ParamId::PeakQuality),
            low_cut_freq: store.get(ParamId::LowCutFreq),
            high_cut_freq: store.get(ParamId::HighCutFreq),
            low_cut_slope: Slope::from_index(store.choice(ParamId::LowCutSlope)),
            high_cut_slope: Slope::from_index(store.choice(ParamId::HighCutSlope)),
            low_cut_bypassed: store.flag(ParamId::LowCutBypassed),
            peak_bypassed: store.flag(ParamId::PeakBypassed),
            high_cut_bypassed: store.flag(ParamId::HighCutBypassed),
        }
    }
}
