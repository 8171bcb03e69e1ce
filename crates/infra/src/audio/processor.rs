//! The EQ processor driven by the host's audio callback

use crate::audio::sample_fifo::{SampleBlockConsumer, SingleChannelSampleFifo};
use contour_core::domain::audio::{validate_sample_rate, Channel, EqError, Result};
use contour_core::domain::config::AnalyzerConfig;
use contour_core::domain::dsp::StereoEngine;
use contour_core::domain::params::ParameterStore;
use contour_core::domain::settings::ChainSettings;
use std::sync::Arc;
use tracing::info;

/// Analysis-thread ends of the two sample FIFOs
pub struct AnalyzerTaps {
    pub left: SampleBlockConsumer,
    pub right: SampleBlockConsumer,
    pub block_size: usize,
    pub sample_rate: f64,
}

/// Stereo EQ plus the producer side of the analyzer FIFOs
///
/// Lives on the audio thread once prepared.
pub struct EqProcessor {
    params: Arc<ParameterStore>,
    engine: StereoEngine,
    left_fifo: SingleChannelSampleFifo,
    right_fifo: SingleChannelSampleFifo,
}

impl EqProcessor {
    /// Validate the stream format and allocate everything processing needs
    pub fn prepare(
        params: Arc<ParameterStore>,
        sample_rate: f64,
        block_size: usize,
        analyzer: &AnalyzerConfig,
    ) -> Result<(Self, AnalyzerTaps)> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        if block_size == 0 {
            return Err(EqError::InvalidBlockSize(block_size));
        }
        if analyzer.fifo_capacity == 0 {
            return Err(EqError::InvalidConfiguration(
                "fifo_capacity must be at least 1".to_string(),
            ));
        }

        let mut engine = StereoEngine::new(sample_rate)?;
        engine.apply(&ChainSettings::from_store(&params));

        let (left_fifo, left) = SingleChannelSampleFifo::new(Channel::Left, block_size, analyzer.fifo_capacity);
        let (right_fifo, right) = SingleChannelSampleFifo::new(Channel::Right, block_size, analyzer.fifo_capacity);

        info!(
            sample_rate,
            block_size,
            fifo_capacity = analyzer.fifo_capacity,
            "EQ processor prepared"
        );

        Ok((
            Self {
                params,
                engine,
                left_fifo,
                right_fifo,
            },
            AnalyzerTaps {
                left,
                right,
                block_size,
                sample_rate,
            },
        ))
    }

    /// Filter one host block in place and feed the analyzer
    ///
    /// `channels` holds one planar slice per channel. Channels past the second
    /// are left untouched. A mono block runs through the left chain and feeds
    /// both analyzer FIFOs.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let settings = ChainSettings::from_store(&self.params);
        self.engine.apply(&settings);

        match channels {
            [] => {}
            [mono] => {
                self.engine.process_channel(Channel::Left.index(), mono);
                self.left_fifo.update(mono);
                self.right_fifo.update(mono);
            }
            [left, right, ..] => {
                self.engine.process_channel(Channel::Left.index(), left);
                self.engine.process_channel(Channel::Right.index(), right);
                self.left_fifo.update(left);
                self.right_fifo.update(right);
            }
        }
    }

    /// Clear filter memory and partially filled analyzer blocks
    pub fn reset(&mut self) {
        self.engine.reset();
        self.left_fifo.reset();
        self.right_fifo.reset();
    }

    pub fn engine(&self) -> &StereoEngine {
        &self.engine
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate()
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Blocks the analyzer FIFOs had no room for, both channels together
    pub fn dropped_blocks(&self) -> u64 {
        self.left_fifo.dropped_blocks() + self.right_fifo.dropped_blocks()
    }

    pub fn pushed_blocks(&self) -> u64 {
        self.left_fifo.pushed_blocks() + self.right_fifo.pushed_blocks()
    }
}
