//! Per-channel sample accumulation on the audio thread
//!
//! Host callbacks deliver blocks of whatever size the host likes. The
//! analyzer wants fixed-size blocks, so each channel gathers samples into a
//! preallocated block and hands it to the analysis thread when full.

use crate::audio::lockfree_fifo::{Fifo, FifoConsumer, FifoProducer};
use contour_core::domain::audio::Channel;

/// Analysis-thread end of a sample FIFO
pub type SampleBlockConsumer = FifoConsumer<Vec<f32>>;

/// Producer side of one channel's sample FIFO
///
/// A completed block that does not fit in the FIFO is dropped; the audio
/// thread never waits for the analysis thread.
pub struct SingleChannelSampleFifo {
    channel: Channel,
    block: Vec<f32>,
    fill: usize,
    producer: FifoProducer<Vec<f32>>,
    pushed_blocks: u64,
    dropped_blocks: u64,
}

impl SingleChannelSampleFifo {
    /// Allocate the block and a FIFO of `capacity` blocks
    ///
    /// A block size of zero is raised to one.
    pub fn new(channel: Channel, block_size: usize, capacity: usize) -> (Self, SampleBlockConsumer) {
        let block_size = block_size.max(1);
        let (producer, consumer) = Fifo::new(capacity, vec![0.0; block_size]).split();

        (
            Self {
                channel,
                block: vec![0.0; block_size],
                fill: 0,
                producer,
                pushed_blocks: 0,
                dropped_blocks: 0,
            },
            consumer,
        )
    }

    /// Append samples, pushing every block that fills up
    pub fn update(&mut self, samples: &[f32]) {
        let mut remaining = samples;

        while !remaining.is_empty() {
            let space = self.block.len() - self.fill;
            let take = space.min(remaining.len());

            self.block[self.fill..self.fill + take].copy_from_slice(&remaining[..take]);
            self.fill += take;
            remaining = &remaining[take..];

            if self.fill == self.block.len() {
                if self.producer.push(&self.block) {
                    self.pushed_blocks += 1;
                } else {
                    self.dropped_blocks += 1;
                }
                self.fill = 0;
            }
        }
    }

    /// Forget a partially filled block
    pub fn reset(&mut self) {
        self.fill = 0;
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    /// Samples waiting in the current, incomplete block
    pub fn pending_samples(&self) -> usize {
        self.fill
    }

    pub fn pushed_blocks(&self) -> u64 {
        self.pushed_blocks
    }

    /// Completed blocks that found the FIFO full
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped_blocks
    }
}
