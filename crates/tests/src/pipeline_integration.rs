//! Integration tests for the EQ signal path and analyzer pipeline
//!
//! These tests drive the parameter store, the processor and the analyzer
//! display together, including a real run with the audio and analysis sides
//! on separate threads.

use contour_core::domain::audio::{gain_to_db, Channel, MINUS_INFINITY_DB};
use contour_core::domain::coefficients::ChainCoefficients;
use contour_core::domain::config::{AnalyzerConfig, ContourConfig, FftOrder};
use contour_core::domain::dsp::{MonoChain, StereoEngine, MAX_CUT_SECTIONS};
use contour_core::domain::geometry::Rect;
use contour_core::domain::params::{ParamId, ParameterStore};
use contour_core::domain::response::ResponseCurve;
use contour_core::domain::settings::{ChainSettings, Slope};
use contour_infra::analysis::{AnalyzerDisplay, DisplayFrame};
use contour_infra::audio::{EqProcessor, Fifo, SingleChannelSampleFifo, FIFO_CAPACITY};
use crossbeam::channel;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn generate_sine_wave(frequency: f64, sample_rate: f64, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate).sin() as f32)
        .collect()
}

fn rms_db(samples: &[f32]) -> f64 {
    let mean_square = samples.iter().map(|&s| f64::from(s).powi(2)).sum::<f64>() / samples.len() as f64;
    // Relative to a full-scale sine
    gain_to_db((mean_square * 2.0).sqrt(), -200.0)
}

fn chain_for(settings: &ChainSettings, sample_rate: f64) -> MonoChain {
    let mut chain = MonoChain::new();
    chain.update(&ChainCoefficients::design(settings, sample_rate), settings);
    chain
}

// ============================================================================
// RESPONSE SCENARIOS
// ============================================================================

#[test]
fn test_flat_settings_are_unity_at_750_hz() {
    let params = ParameterStore::new();
    let chain = chain_for(&ChainSettings::from_store(&params), 44100.0);

    let db = gain_to_db(chain.magnitude_for_frequency(750.0, 44100.0), MINUS_INFINITY_DB);
    assert!(db.abs() < 0.5, "750 Hz at {db} dB");
}

#[test]
fn test_low_cut_slopes_two_octaves_below_corner() {
    let response_at_250 = |slope: Slope| {
        let settings = ChainSettings {
            low_cut_freq: 1000.0,
            low_cut_slope: slope,
            ..ChainSettings::default()
        };
        let chain = chain_for(&settings, 44100.0);
        let passband = chain.magnitude_for_frequency(5000.0, 44100.0);
        gain_to_db(chain.magnitude_for_frequency(250.0, 44100.0) / passband, -200.0)
    };

    let steep = response_at_250(Slope::Slope48);
    let gentle = response_at_250(Slope::Slope12);

    assert!((steep + 96.0).abs() < 3.0, "48 dB/Oct gave {steep}");
    assert!((gentle + 24.0).abs() < 1.0, "12 dB/Oct gave {gentle}");
}

#[test]
fn test_processed_audio_matches_response() {
    let sample_rate = 48000.0;
    let mut engine = StereoEngine::new(sample_rate).unwrap();
    let settings = ChainSettings {
        low_cut_freq: 1000.0,
        low_cut_slope: Slope::Slope12,
        ..ChainSettings::default()
    };
    engine.apply(&settings);

    let mut tone = generate_sine_wave(250.0, sample_rate, 24000);
    for block in tone.chunks_mut(512) {
        engine.apply(&settings);
        engine.process_channel(0, block);
    }

    let measured = rms_db(&tone[12000..]);
    let predicted = gain_to_db(
        engine.chain(0).unwrap().magnitude_for_frequency(250.0, sample_rate),
        -200.0,
    );
    assert!((measured - predicted).abs() < 0.5, "measured {measured}, predicted {predicted}");
}

#[test]
fn test_response_curve_is_idempotent_through_store() {
    let params = ParameterStore::new();
    params.set(ParamId::PeakFreq, 3000.0);
    params.set(ParamId::PeakGain, -9.5);
    params.set(ParamId::HighCutSlope, 2.0);
    params.set(ParamId::HighCutFreq, 8000.0);

    let settings = ChainSettings::from_store(&params);
    let chain = chain_for(&settings, 48000.0);
    let mut curve = ResponseCurve::new(Rect::new(0.0, 0.0, 600.0, 133.0), 24.0);

    let first = curve.update(&chain, 48000.0).clone();
    let again = chain_for(&ChainSettings::from_store(&params), 48000.0);
    let second = curve.update(&again, 48000.0).clone();

    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn prop_engine_sections_follow_slopes(
        slopes in prop::collection::vec(0usize..4, 1..8),
        freq in 30.0f32..15000.0,
    ) {
        let mut engine = StereoEngine::new(48000.0).unwrap();

        for index in slopes {
            let slope = Slope::from_index(index);
            let settings = ChainSettings {
                low_cut_freq: freq,
                high_cut_freq: freq,
                low_cut_slope: slope,
                high_cut_slope: slope,
                ..ChainSettings::default()
            };
            engine.apply(&settings);

            for chain in engine.chains() {
                prop_assert_eq!(chain.low_cut().active_sections(), slope.order() / 2);
                prop_assert_eq!(chain.high_cut().active_sections(), slope.order() / 2);
                for section in slope.order() / 2..MAX_CUT_SECTIONS {
                    prop_assert!(chain.low_cut().is_section_bypassed(section));
                }
            }
        }
    }
}

// ============================================================================
// FIFO SCENARIOS
// ============================================================================

#[test]
fn test_thirty_one_blocks_into_thirty_slots() {
    let (mut tx, mut rx) = Fifo::new(FIFO_CAPACITY, vec![0.0f32; 64]).split();

    let accepted = (0..31).filter(|&i| tx.push(&vec![i as f32; 64])).count();
    assert_eq!(accepted, 30);

    let mut out = vec![0.0f32; 64];
    for i in 0..30 {
        assert!(rx.pull(&mut out));
        assert!(out.iter().all(|&s| s == i as f32));
    }
    assert!(!rx.pull(&mut out));
}

#[test]
fn test_sample_fifo_recovers_after_overflow() {
    let (mut fifo, mut consumer) = SingleChannelSampleFifo::new(Channel::Left, 128, FIFO_CAPACITY);

    for i in 0..40 {
        fifo.update(&vec![i as f32; 128]);
    }
    assert_eq!(fifo.dropped_blocks(), 10);

    let mut block = vec![0.0f32; 128];
    let mut seen = Vec::new();
    while consumer.pull(&mut block) {
        seen.push(block[0]);
    }
    assert_eq!(seen, (0..30).map(|i| i as f32).collect::<Vec<_>>());

    fifo.update(&vec![99.0; 128]);
    assert!(consumer.pull(&mut block));
    assert_eq!(block[0], 99.0);
}

// ============================================================================
// PROCESSOR + DISPLAY
// ============================================================================

#[test]
fn test_parameter_change_reaches_audio_next_block() {
    let sample_rate = 48000.0;
    let params = Arc::new(ParameterStore::new());
    let (mut processor, _taps) =
        EqProcessor::prepare(params.clone(), sample_rate, 480, &AnalyzerConfig::default()).unwrap();

    let run = |processor: &mut EqProcessor| {
        let mut left = generate_sine_wave(750.0, sample_rate, 9600);
        let mut right = left.clone();
        for (l, r) in left.chunks_mut(480).zip(right.chunks_mut(480)) {
            processor.process_block(&mut [l, r]);
        }
        rms_db(&left[4800..])
    };

    let flat = run(&mut processor);
    params.set(ParamId::PeakGain, 12.0);
    let boosted = run(&mut processor);

    assert!(flat.abs() < 0.5, "flat {flat}");
    assert!((boosted - 12.0).abs() < 0.5, "boosted {boosted}");
}

#[test]
fn test_display_tracks_processor_in_lockstep() {
    let config = ContourConfig::default();
    let params = Arc::new(ParameterStore::new());
    let (mut processor, taps) = EqProcessor::prepare(
        params.clone(),
        f64::from(config.audio.sample_rate),
        config.audio.block_size,
        &config.analyzer,
    )
    .unwrap();
    let mut display = AnalyzerDisplay::new(params.clone(), taps, &config);

    let mut left = generate_sine_wave(2000.0, 48000.0, 512);
    let mut right = left.clone();
    for _ in 0..4 {
        processor.process_block(&mut [&mut left[..], &mut right[..]]);
    }

    let mut redraws = Vec::new();
    display.tick(&mut |frame: &DisplayFrame<'_>| {
        redraws.push((frame.left.len(), frame.right.len(), frame.response.len()));
    });

    // 2048-point FFT at 48 kHz: 853 bins between 20 Hz and 20 kHz
    assert_eq!(redraws, vec![(853, 853, 600)]);

    display.set_fft_order(FftOrder::Order4096);
    let mut sink = |_: &DisplayFrame<'_>| {};
    display.tick(&mut sink);
    assert!(display.left_path().is_empty());
}

#[test]
fn test_two_thread_run() {
    let config = ContourConfig::default();
    let params = Arc::new(ParameterStore::new());
    let (mut processor, taps) = EqProcessor::prepare(
        params.clone(),
        f64::from(config.audio.sample_rate),
        config.audio.block_size,
        &config.analyzer,
    )
    .unwrap();

    let (frame_tx, frame_rx) = channel::unbounded::<(usize, bool)>();
    let display = AnalyzerDisplay::new(params.clone(), taps, &config)
        .spawn(move |frame: &DisplayFrame<'_>| {
            let _ = frame_tx.send((frame.left.len(), frame.response_changed));
        })
        .unwrap();

    let audio = std::thread::spawn(move || {
        let mut left = generate_sine_wave(1000.0, 48000.0, 512);
        let mut right = left.clone();
        for _ in 0..200 {
            processor.process_block(&mut [&mut left[..], &mut right[..]]);
            std::thread::sleep(Duration::from_micros(500));
        }
        processor
    });

    params.set(ParamId::PeakGain, 6.0);

    let processor = audio.join().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    let display = display.stop().unwrap();

    let frames: Vec<(usize, bool)> = frame_rx.try_iter().collect();
    assert!(!frames.is_empty());
    assert!(frames.iter().any(|&(left, _)| left == 853));
    assert!(frames.iter().any(|&(_, changed)| changed));
    assert!(display.response_updates() >= 1);
    assert_eq!(processor.pushed_blocks() + processor.dropped_blocks(), 400);
}
