//! Coefficient factory
//!
//! Pure functions turning a [`ChainSettings`] snapshot and a sample rate into
//! biquad coefficients. The `make_*` functions are infallible and run on the
//! audio thread; frequencies at or above Nyquist are pulled just below it.
//! The `try_make_*` twins reject such inputs and are meant for everything else.

use crate::domain::audio::{db_to_gain, EqError, Result, MINUS_INFINITY_DB};
use crate::domain::dsp::{BiquadCoeffs, MAX_CUT_SECTIONS};
use crate::domain::settings::ChainSettings;
use std::f64::consts::PI;

/// Coefficients of one cut filter: 1 to 4 cascaded sections
///
/// Fixed-size storage so that designing a cut filter never allocates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutCoefficients {
    sections: [BiquadCoeffs; MAX_CUT_SECTIONS],
    len: usize,
}

impl CutCoefficients {
    pub fn as_slice(&self) -> &[BiquadCoeffs] {
        &self.sections[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BiquadCoeffs> {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a CutCoefficients {
    type Item = &'a BiquadCoeffs;
    type IntoIter = std::slice::Iter<'a, BiquadCoeffs>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Q of section `index` in an order-`order` Butterworth cascade
fn butterworth_q(order: usize, index: usize) -> f64 {
    let n = order as f64;
    1.0 / (2.0 * ((2.0 * index as f64 + 1.0) * PI / (2.0 * n)).cos())
}

fn butterworth(order: usize, design: impl Fn(f64) -> BiquadCoeffs) -> CutCoefficients {
    debug_assert!(order >= 2 && order % 2 == 0, "Butterworth order must be even");
    let len = (order / 2).clamp(1, MAX_CUT_SECTIONS);

    let mut sections = [BiquadCoeffs::identity(); MAX_CUT_SECTIONS];
    for (index, section) in sections.iter_mut().enumerate().take(len) {
        *section = design(butterworth_q(len * 2, index));
    }

    CutCoefficients { sections, len }
}

/// Order-`order` Butterworth high-pass as `order / 2` second-order sections
pub fn butterworth_high_pass(freq: f64, sample_rate: f64, order: usize) -> CutCoefficients {
    butterworth(order, |q| BiquadCoeffs::high_pass(sample_rate, freq, q))
}

/// Order-`order` Butterworth low-pass as `order / 2` second-order sections
pub fn butterworth_low_pass(freq: f64, sample_rate: f64, order: usize) -> CutCoefficients {
    butterworth(order, |q| BiquadCoeffs::low_pass(sample_rate, freq, q))
}

fn check_design(what: &str, freq: f64, sample_rate: f64, q: f64) -> Result<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(EqError::InvalidSampleRate(sample_rate));
    }
    if !(freq > 0.0 && freq < sample_rate / 2.0) {
        return Err(EqError::InvalidCoefficients(format!(
            "{what}: frequency {freq} Hz outside (0, {}) Hz",
            sample_rate / 2.0
        )));
    }
    if !(q > 0.0 && q.is_finite()) {
        return Err(EqError::InvalidCoefficients(format!("{what}: quality {q} must be positive")));
    }
    Ok(())
}

/// Highest design frequency, as a fraction of the sample rate
const NYQUIST_MARGIN: f64 = 0.499;

/// Pull a design frequency below Nyquist
///
/// Parameter bounds reach 20 kHz, which is above Nyquist for rates under
/// 40 kHz; such frequencies are designed at `NYQUIST_MARGIN * sample_rate`.
#[inline]
fn design_frequency(freq: f32, sample_rate: f64) -> f64 {
    let freq = f64::from(freq);
    debug_assert!(freq > 0.0, "filter frequency {freq} Hz must be positive");
    freq.min(NYQUIST_MARGIN * sample_rate)
}

// ============================================================================
// PEAK
// ============================================================================

/// Peak (bell) coefficients for the current settings
pub fn make_peak_filter(settings: &ChainSettings, sample_rate: f64) -> BiquadCoeffs {
    let freq = design_frequency(settings.peak_freq, sample_rate);
    debug_assert!(settings.peak_quality > 0.0, "peak quality must be positive");

    BiquadCoeffs::peaking(
        sample_rate,
        freq,
        f64::from(settings.peak_quality),
        db_to_gain(f64::from(settings.peak_gain_db), MINUS_INFINITY_DB),
    )
}

pub fn try_make_peak_filter(settings: &ChainSettings, sample_rate: f64) -> Result<BiquadCoeffs> {
    check_design(
        "peak",
        f64::from(settings.peak_freq),
        sample_rate,
        f64::from(settings.peak_quality),
    )?;
    Ok(make_peak_filter(settings, sample_rate))
}

// ============================================================================
// CUT FILTERS
// ============================================================================

/// Low-cut (high-pass) cascade for the selected slope
pub fn make_low_cut_filter(settings: &ChainSettings, sample_rate: f64) -> CutCoefficients {
    let freq = design_frequency(settings.low_cut_freq, sample_rate);
    butterworth_high_pass(freq, sample_rate, settings.low_cut_slope.order())
}

pub fn try_make_low_cut_filter(settings: &ChainSettings, sample_rate: f64) -> Result<CutCoefficients> {
    check_design("low cut", f64::from(settings.low_cut_freq), sample_rate, 1.0)?;
    Ok(make_low_cut_filter(settings, sample_rate))
}

/// High-cut (low-pass) cascade for the selected slope
pub fn make_high_cut_filter(settings: &ChainSettings, sample_rate: f64) -> CutCoefficients {
    let freq = design_frequency(settings.high_cut_freq, sample_rate);
    butterworth_low_pass(freq, sample_rate, settings.high_cut_slope.order())
}

pub fn try_make_high_cut_filter(settings: &ChainSettings, sample_rate: f64) -> Result<CutCoefficients> {
    check_design("high cut", f64::from(settings.high_cut_freq), sample_rate, 1.0)?;
    Ok(make_high_cut_filter(settings, sample_rate))
}

/// Every coefficient the mono chain needs for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainCoefficients {
    pub peak: BiquadCoeffs,
    pub low_cut: CutCoefficients,
    pub high_cut: CutCoefficients,
}

impl ChainCoefficients {
    /// Design all three stages
    pub fn design(settings: &ChainSettings, sample_rate: f64) -> Self {
        Self {
            peak: make_peak_filter(settings, sample_rate),
            low_cut: make_low_cut_filter(settings, sample_rate),
            high_cut: make_high_cut_filter(settings, sample_rate),
        }
    }

    /// Design all three stages, rejecting out-of-range inputs
    pub fn try_design(settings: &ChainSettings, sample_rate: f64) -> Result<Self> {
        Ok(Self {
            peak: try_make_peak_filter(settings, sample_rate)?,
            low_cut: try_make_low_cut_filter(settings, sample_rate)?,
            high_cut: try_make_high_cut_filter(settings, sample_rate)?,
        })
    }
}
