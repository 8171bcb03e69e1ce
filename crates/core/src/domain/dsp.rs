//! Filter sections and the fixed EQ topology
//!
//! This module provides the real-time half of the equalizer:
//! - Second-order biquad sections (Direct Form I)
//! - The cut-filter stage, a cascade of up to four sections
//! - The mono chain: low-cut, peak, high-cut in series
//! - An N-channel engine applying one coefficient set to every channel
//!
//! All processing is designed for:
//! - Zero allocations and no locks in the hot path
//! - Coefficient updates by value copy on the audio thread itself
//! - Identity pass-through for bypassed sections and stages

use crate::domain::audio::{validate_sample_rate, Result, STEREO};
use crate::domain::coefficients::{ChainCoefficients, CutCoefficients};
use crate::domain::settings::{ChainSettings, Slope};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of second-order sections a cut filter can hold (48 dB/oct)
pub const MAX_CUT_SECTIONS: usize = 4;

/// A filter stage that can sit in the mono chain
///
/// Stages process one channel in place. A bypassed stage must leave the
/// buffer untouched and report unity magnitude.
pub trait FilterStage: Send {
    /// Process a buffer of samples in place
    fn process(&mut self, buffer: &mut [f32]);

    /// Clear the filter memory
    fn reset(&mut self);

    fn is_bypassed(&self) -> bool;

    fn set_bypass(&mut self, bypass: bool);

    /// Linear magnitude of the stage at `freq` Hz
    fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64;

    /// Stage name for debugging/display
    fn name(&self) -> &str;
}

// ============================================================================
// BIQUAD SECTION
// ============================================================================

/// Biquad filter coefficients, normalised so that a0 == 1
///
/// Kept in f64: low corner frequencies at high sample rates put the poles
/// very close to the unit circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Unity gain, no filtering
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn normalized(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        }
    }

    /// Peaking (bell) filter
    ///
    /// `gain` is linear; a gain of 1 yields the identity response.
    #[must_use]
    pub fn peaking(sample_rate: f64, freq: f64, q: f64, gain: f64) -> Self {
        let a = gain.max(f64::MIN_POSITIVE).sqrt();
        let omega = 2.0 * PI * freq / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let c2 = -2.0 * omega.cos();

        Self::normalized(
            [1.0 + alpha * a, c2, 1.0 - alpha * a],
            [1.0 + alpha / a, c2, 1.0 - alpha / a],
        )
    }

    /// Second-order low-pass
    #[must_use]
    pub fn low_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let n = 1.0 / (PI * freq / sample_rate).tan();
        let n2 = n * n;
        let c1 = 1.0 / (1.0 + n / q + n2);

        Self {
            b0: c1,
            b1: 2.0 * c1,
            b2: c1,
            a1: 2.0 * c1 * (1.0 - n2),
            a2: c1 * (1.0 - n / q + n2),
        }
    }

    /// Second-order high-pass
    #[must_use]
    pub fn high_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let n = (PI * freq / sample_rate).tan();
        let n2 = n * n;
        let c1 = 1.0 / (1.0 + n / q + n2);

        Self {
            b0: c1,
            b1: -2.0 * c1,
            b2: c1,
            a1: 2.0 * c1 * (n2 - 1.0),
            a2: c1 * (1.0 - n / q + n2),
        }
    }

    /// Evaluate |H(e^jw)| at `freq` Hz
    pub fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq / sample_rate;
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;

        let numerator = self.b0 + z1 * self.b1 + z2 * self.b2;
        let denominator = 1.0 + z1 * self.a1 + z2 * self.a2;

        (numerator / denominator).norm()
    }

    /// All coefficients are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }
}

/// Stateful second-order section using Direct Form I
///
/// Direct Form I keeps coefficient swaps free of artifacts: the state is
/// made of past inputs and outputs, not of internal nodes that depend on
/// the old coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    bypassed: bool,
    // Previous input samples (x[n-1], x[n-2])
    x1: f64,
    x2: f64,
    // Previous output samples (y[n-1], y[n-2])
    y1: f64,
    y2: f64,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new(BiquadCoeffs::identity())
    }
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            bypassed: false,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Replace the coefficients, keeping the filter memory
    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    #[inline]
    fn process_sample(&mut self, x: f64) -> f64 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }
}

impl FilterStage for Biquad {
    fn process(&mut self, buffer: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(f64::from(*sample)) as f32;
        }
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.bypassed = bypass;
    }

    fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            1.0
        } else {
            self.coeffs.magnitude_for_frequency(freq, sample_rate)
        }
    }

    fn name(&self) -> &str {
        "Biquad"
    }
}

// ============================================================================
// CUT FILTER STAGE
// ============================================================================

/// Cascade of up to four biquad sections
///
/// Exactly `slope.sections()` sections are active after an update, always
/// the leading ones; the rest are bypassed.
#[derive(Debug, Clone)]
pub struct CutFilter {
    name: &'static str,
    sections: [Biquad; MAX_CUT_SECTIONS],
    slope: Option<Slope>,
    bypassed: bool,
}

impl CutFilter {
    /// Create a stage with every section bypassed
    pub fn new(name: &'static str) -> Self {
        let mut sections: [Biquad; MAX_CUT_SECTIONS] = Default::default();
        for section in sections.iter_mut() {
            section.set_bypass(true);
        }

        Self {
            name,
            sections,
            slope: None,
            bypassed: false,
        }
    }

    /// Install a coefficient set designed for `slope`
    ///
    /// When the slope changes every section is bypassed first, then sections
    /// are enabled in index order with their new coefficients. Sections that
    /// were idle are cleared before they start running. With an unchanged
    /// slope the coefficients are copied into the active sections in place.
    pub fn update(&mut self, coeffs: &CutCoefficients, slope: Slope) {
        let wanted = slope.sections().min(coeffs.len()).min(MAX_CUT_SECTIONS);
        debug_assert_eq!(coeffs.len(), slope.sections(), "coefficient set does not match slope");

        if self.slope == Some(slope) {
            for (section, c) in self.sections.iter_mut().zip(coeffs.iter()).take(wanted) {
                section.set_coeffs(*c);
            }
            return;
        }

        let previously_active = self.active_sections();
        for section in self.sections.iter_mut() {
            section.set_bypass(true);
        }

        for (index, c) in coeffs.iter().enumerate().take(wanted) {
            let section = &mut self.sections[index];
            section.set_coeffs(*c);
            if index >= previously_active {
                section.reset();
            }
            section.set_bypass(false);
        }

        self.slope = Some(slope);
    }

    /// Number of sections currently running
    pub fn active_sections(&self) -> usize {
        self.sections.iter().filter(|s| !s.is_bypassed()).count()
    }

    pub fn is_section_bypassed(&self, index: usize) -> bool {
        self.sections.get(index).map_or(true, |s| s.is_bypassed())
    }

    pub fn section(&self, index: usize) -> Option<&Biquad> {
        self.sections.get(index)
    }

    /// Slope of the last installed coefficient set
    pub fn slope(&self) -> Option<Slope> {
        self.slope
    }
}

impl FilterStage for CutFilter {
    fn process(&mut self, buffer: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for section in self.sections.iter_mut() {
            section.process(buffer);
        }
    }

    fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.reset();
        }
    }

    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.bypassed = bypass;
    }

    fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64 {
        if self.bypassed {
            return 1.0;
        }
        self.sections
            .iter()
            .map(|s| s.magnitude_for_frequency(freq, sample_rate))
            .product()
    }

    fn name(&self) -> &str {
        self.name
    }
}

// ============================================================================
// MONO CHAIN
// ============================================================================

/// Position of a stage inside the mono chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainPosition {
    LowCut,
    Peak,
    HighCut,
}

impl ChainPosition {
    pub const ALL: [ChainPosition; 3] = [ChainPosition::LowCut, ChainPosition::Peak, ChainPosition::HighCut];
}

/// Low-cut, peak and high-cut applied in series to one channel
#[derive(Debug, Clone)]
pub struct MonoChain {
    low_cut: CutFilter,
    peak: Biquad,
    high_cut: CutFilter,
}

impl Default for MonoChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoChain {
    pub fn new() -> Self {
        Self {
            low_cut: CutFilter::new("LowCut"),
            peak: Biquad::default(),
            high_cut: CutFilter::new("HighCut"),
        }
    }

    /// Install a designed coefficient set and the stage bypass flags
    pub fn update(&mut self, coeffs: &ChainCoefficients, settings: &ChainSettings) {
        self.peak.set_coeffs(coeffs.peak);
        self.low_cut.update(&coeffs.low_cut, settings.low_cut_slope);
        self.high_cut.update(&coeffs.high_cut, settings.high_cut_slope);

        self.low_cut.set_bypass(settings.low_cut_bypassed);
        self.peak.set_bypass(settings.peak_bypassed);
        self.high_cut.set_bypass(settings.high_cut_bypassed);
    }

    /// Run the block through all three stages
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.low_cut.process(buffer);
        self.peak.process(buffer);
        self.high_cut.process(buffer);
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }

    pub fn stage(&self, position: ChainPosition) -> &dyn FilterStage {
        match position {
            ChainPosition::LowCut => &self.low_cut,
            ChainPosition::Peak => &self.peak,
            ChainPosition::HighCut => &self.high_cut,
        }
    }

    fn stage_mut(&mut self, position: ChainPosition) -> &mut dyn FilterStage {
        match position {
            ChainPosition::LowCut => &mut self.low_cut,
            ChainPosition::Peak => &mut self.peak,
            ChainPosition::HighCut => &mut self.high_cut,
        }
    }

    pub fn set_bypassed(&mut self, position: ChainPosition, bypassed: bool) {
        self.stage_mut(position).set_bypass(bypassed);
    }

    pub fn is_bypassed(&self, position: ChainPosition) -> bool {
        self.stage(position).is_bypassed()
    }

    /// Combined linear magnitude of every non-bypassed stage
    pub fn magnitude_for_frequency(&self, freq: f64, sample_rate: f64) -> f64 {
        ChainPosition::ALL
            .iter()
            .map(|&p| self.stage(p).magnitude_for_frequency(freq, sample_rate))
            .product()
    }

    pub fn low_cut(&self) -> &CutFilter {
        &self.low_cut
    }

    pub fn peak(&self) -> &Biquad {
        &self.peak
    }

    pub fn high_cut(&self) -> &CutFilter {
        &self.high_cut
    }
}

// ============================================================================
// CHANNEL ENGINE
// ============================================================================

/// `N` independent mono chains sharing one coefficient design
///
/// Filter memory is per channel; coefficients are stereo-linked.
#[derive(Debug, Clone)]
pub struct ChannelEngine<const N: usize> {
    chains: [MonoChain; N],
    sample_rate: f64,
}

/// The two-channel engine run by the audio callback
pub type StereoEngine = ChannelEngine<STEREO>;

impl<const N: usize> ChannelEngine<N> {
    /// Create an engine for a validated sample rate
    pub fn new(sample_rate: f64) -> Result<Self> {
        Ok(Self {
            chains: std::array::from_fn(|_| MonoChain::new()),
            sample_rate: validate_sample_rate(sample_rate)?,
        })
    }

    /// Switch sample rate, clearing all filter memory
    pub fn prepare(&mut self, sample_rate: f64) -> Result<()> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        self.reset();
        Ok(())
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Design coefficients from `settings` and install them into every chain
    pub fn apply(&mut self, settings: &ChainSettings) {
        let coeffs = ChainCoefficients::design(settings, self.sample_rate);
        self.apply_coefficients(&coeffs, settings);
    }

    /// Install an already designed coefficient set into every chain
    pub fn apply_coefficients(&mut self, coeffs: &ChainCoefficients, settings: &ChainSettings) {
        for chain in self.chains.iter_mut() {
            chain.update(coeffs, settings);
        }
    }

    /// Process one channel's block; out-of-range channels are ignored
    #[inline]
    pub fn process_channel(&mut self, channel: usize, buffer: &mut [f32]) {
        if let Some(chain) = self.chains.get_mut(channel) {
            chain.process(buffer);
        }
    }

    pub fn chain(&self, channel: usize) -> Option<&MonoChain> {
        self.chains.get(channel)
    }

    pub fn chains(&self) -> &[MonoChain] {
        &self.chains
    }

    pub fn channel_count(&self) -> usize {
        N
    }

    pub fn reset(&mut self) {
        for chain in self.chains.iter_mut() {
            chain.reset();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::{gain_to_db, MINUS_INFINITY_DB};
    use crate::domain::coefficients::butterworth_high_pass;
    use proptest::prelude::*;

    const SAMPLE_RATE: f64 = 48000.0;

    fn generate_test_signal(samples: usize, frequency: f64) -> Vec<f32> {
        (0..samples)
            .map(|i| (2.0 * PI * frequency * i as f64 / SAMPLE_RATE).sin() as f32)
            .collect()
    }

    fn rms(buffer: &[f32]) -> f32 {
        (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
    }

    fn slope_strategy() -> impl Strategy<Value = Slope> {
        (0usize..4).prop_map(Slope::from_index)
    }

    // -------------------------------------------------------------------------
    // Biquad Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_biquad_unity() {
        let mut filter = Biquad::default();

        let input = vec![0.5, 0.3, 0.7];
        let mut output = input.clone();
        filter.process(&mut output);

        assert_eq!(input, output);
    }

    #[test]
    fn test_biquad_reset() {
        let mut filter = Biquad::new(BiquadCoeffs::high_pass(SAMPLE_RATE, 200.0, 0.707));

        let mut buffer = vec![0.5; 100];
        filter.process(&mut buffer);

        filter.reset();
        let mut silence = vec![0.0; 10];
        filter.process(&mut silence);

        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_biquad_bypass_leaves_buffer() {
        let mut filter = Biquad::new(BiquadCoeffs::low_pass(SAMPLE_RATE, 100.0, 0.707));
        filter.set_bypass(true);

        let input = generate_test_signal(256, 5000.0);
        let mut output = input.clone();
        filter.process(&mut output);

        assert_eq!(input, output);
        assert_eq!(filter.magnitude_for_frequency(5000.0, SAMPLE_RATE), 1.0);
    }

    #[test]
    fn test_low_pass_attenuates_highs() {
        let mut filter = Biquad::new(BiquadCoeffs::low_pass(SAMPLE_RATE, 500.0, 0.707));
        let mut signal = generate_test_signal(4800, 8000.0);
        filter.process(&mut signal);

        assert!(rms(&signal[2400..]) < 0.02);
    }

    #[test]
    fn test_corner_is_minus_three_db() {
        let hp = BiquadCoeffs::high_pass(SAMPLE_RATE, 1000.0, std::f64::consts::FRAC_1_SQRT_2);
        let lp = BiquadCoeffs::low_pass(SAMPLE_RATE, 1000.0, std::f64::consts::FRAC_1_SQRT_2);

        let hp_db = gain_to_db(hp.magnitude_for_frequency(1000.0, SAMPLE_RATE), MINUS_INFINITY_DB);
        let lp_db = gain_to_db(lp.magnitude_for_frequency(1000.0, SAMPLE_RATE), MINUS_INFINITY_DB);

        assert!((hp_db + 3.01).abs() < 0.05, "hp corner {hp_db}");
        assert!((lp_db + 3.01).abs() < 0.05, "lp corner {lp_db}");
    }

    #[test]
    fn test_peaking_gain_at_center() {
        let coeffs = BiquadCoeffs::peaking(SAMPLE_RATE, 1000.0, 1.0, 10.0_f64.powf(12.0 / 20.0));
        let db = gain_to_db(coeffs.magnitude_for_frequency(1000.0, SAMPLE_RATE), MINUS_INFINITY_DB);
        assert!((db - 12.0).abs() < 0.01);

        let flat = BiquadCoeffs::peaking(SAMPLE_RATE, 1000.0, 1.0, 1.0);
        assert!((flat.magnitude_for_frequency(300.0, SAMPLE_RATE) - 1.0).abs() < 1e-12);
    }

    // -------------------------------------------------------------------------
    // Cut Filter Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_cut_filter_starts_idle() {
        let filter = CutFilter::new("LowCut");
        assert_eq!(filter.active_sections(), 0);
        assert_eq!(filter.slope(), None);
        assert_eq!(filter.name(), "LowCut");
    }

    #[test]
    fn test_cut_filter_enables_leading_sections() {
        let mut filter = CutFilter::new("LowCut");
        let coeffs = butterworth_high_pass(100.0, SAMPLE_RATE, Slope::Slope36.order());

        filter.update(&coeffs, Slope::Slope36);

        assert_eq!(filter.active_sections(), 3);
        assert!(!filter.is_section_bypassed(0));
        assert!(!filter.is_section_bypassed(2));
        assert!(filter.is_section_bypassed(3));
        assert!(filter.is_section_bypassed(42));
    }

    #[test]
    fn test_cut_filter_slope_down_drops_stale_sections() {
        let mut filter = CutFilter::new("HighCut");
        filter.update(&butterworth_high_pass(100.0, SAMPLE_RATE, 8), Slope::Slope48);
        assert_eq!(filter.active_sections(), 4);

        let coeffs = butterworth_high_pass(100.0, SAMPLE_RATE, 2);
        filter.update(&coeffs, Slope::Slope12);

        assert_eq!(filter.active_sections(), 1);
        assert_eq!(filter.section(0).map(|s| *s.coeffs()), Some(coeffs.as_slice()[0]));
    }

    #[test]
    fn test_cut_filter_same_slope_copies_coefficients() {
        let mut filter = CutFilter::new("LowCut");
        filter.update(&butterworth_high_pass(100.0, SAMPLE_RATE, 4), Slope::Slope24);

        let moved = butterworth_high_pass(400.0, SAMPLE_RATE, 4);
        filter.update(&moved, Slope::Slope24);

        assert_eq!(filter.active_sections(), 2);
        assert_eq!(filter.section(1).map(|s| *s.coeffs()), Some(moved.as_slice()[1]));
    }

    #[test]
    fn test_cut_filter_stage_bypass() {
        let mut filter = CutFilter::new("LowCut");
        filter.update(&butterworth_high_pass(2000.0, SAMPLE_RATE, 8), Slope::Slope48);
        filter.set_bypass(true);

        let input = generate_test_signal(512, 100.0);
        let mut output = input.clone();
        filter.process(&mut output);

        assert_eq!(input, output);
        assert_eq!(filter.active_sections(), 4);
    }

    proptest! {
        #[test]
        fn prop_active_sections_follow_slope(previous in slope_strategy(), next in slope_strategy()) {
            let mut filter = CutFilter::new("LowCut");
            filter.update(&butterworth_high_pass(80.0, SAMPLE_RATE, previous.order()), previous);
            filter.update(&butterworth_high_pass(80.0, SAMPLE_RATE, next.order()), next);

            let active = next.sections();
            prop_assert_eq!(filter.active_sections(), active);
            for index in 0..MAX_CUT_SECTIONS {
                prop_assert_eq!(filter.is_section_bypassed(index), index >= active);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mono Chain / Engine Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_mono_chain_default_is_transparent_in_passband() {
        let settings = ChainSettings::default();
        let mut chain = MonoChain::new();
        chain.update(&ChainCoefficients::design(&settings, SAMPLE_RATE), &settings);

        let mut signal = generate_test_signal(9600, 1000.0);
        chain.process(&mut signal);

        assert!((rms(&signal[4800..]) - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }

    #[test]
    fn test_mono_chain_stage_bypass() {
        let settings = ChainSettings {
            peak_gain_db: 12.0,
            peak_bypassed: true,
            ..ChainSettings::default()
        };
        let mut chain = MonoChain::new();
        chain.update(&ChainCoefficients::design(&settings, SAMPLE_RATE), &settings);

        assert!(chain.is_bypassed(ChainPosition::Peak));
        assert!(!chain.is_bypassed(ChainPosition::LowCut));
        let magnitude = chain.magnitude_for_frequency(750.0, SAMPLE_RATE);
        assert!((gain_to_db(magnitude, MINUS_INFINITY_DB)).abs() < 0.1);

        chain.set_bypassed(ChainPosition::Peak, false);
        let magnitude = chain.magnitude_for_frequency(750.0, SAMPLE_RATE);
        assert!((gain_to_db(magnitude, MINUS_INFINITY_DB) - 12.0).abs() < 0.1);
    }

    #[test]
    fn test_engine_rejects_bad_sample_rate() {
        assert!(StereoEngine::new(0.0).is_err());
        let mut engine = StereoEngine::new(SAMPLE_RATE).unwrap();
        assert!(engine.prepare(f64::INFINITY).is_err());
        assert_eq!(engine.sample_rate(), SAMPLE_RATE);
    }

    #[test]
    fn test_engine_channels_share_coefficients() {
        let mut engine = StereoEngine::new(SAMPLE_RATE).unwrap();
        let settings = ChainSettings {
            low_cut_freq: 200.0,
            low_cut_slope: Slope::Slope36,
            peak_gain_db: -6.0,
            ..ChainSettings::default()
        };
        engine.apply(&settings);

        let left = engine.chain(0).unwrap();
        let right = engine.chain(1).unwrap();
        assert_eq!(left.peak().coeffs(), right.peak().coeffs());
        assert_eq!(left.low_cut().active_sections(), 3);
        assert_eq!(right.low_cut().active_sections(), 3);
        assert!(engine.chain(2).is_none());
    }

    #[test]
    fn test_engine_channels_keep_independent_state() {
        let mut engine = StereoEngine::new(SAMPLE_RATE).unwrap();
        engine.apply(&ChainSettings {
            peak_gain_db: 12.0,
            ..ChainSettings::default()
        });

        let mut left = generate_test_signal(512, 750.0);
        let mut right = vec![0.0; 512];
        engine.process_channel(0, &mut left);
        engine.process_channel(1, &mut right);
        engine.process_channel(7, &mut right);

        assert!(rms(&left) > 1.0);
        assert!(right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_engine_reset_clears_memory() {
        let mut engine = StereoEngine::new(SAMPLE_RATE).unwrap();
        engine.apply(&ChainSettings::default());

        let mut signal = generate_test_signal(512, 440.0);
        engine.process_channel(0, &mut signal);
        engine.reset();

        let mut silence = vec![0.0; 64];
        engine.process_channel(0, &mut silence);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    // -------------------------------------------------------------------------
    // Performance Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_performance_full_chain() {
        let mut engine = StereoEngine::new(SAMPLE_RATE).unwrap();
        let settings = ChainSettings {
            low_cut_slope: Slope::Slope48,
            high_cut_slope: Slope::Slope48,
            ..ChainSettings::default()
        };
        let mut signal = generate_test_signal(48000, 440.0);

        let start = std::time::Instant::now();
        for block in signal.chunks_mut(512) {
            engine.apply(&settings);
            engine.process_channel(0, block);
        }
        let duration = start.elapsed();

        // One second of audio through nine sections, with headroom for debug builds
        assert!(duration.as_millis() < 500);
    }
}
