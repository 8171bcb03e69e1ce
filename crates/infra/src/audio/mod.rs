//! Real-time side of the signal path
//!
//! Everything reachable from [`EqProcessor::process_block`] runs on the host's
//! audio thread: no allocation, no locks, no logging.

pub mod lockfree_fifo;
pub mod processor;
pub mod sample_fifo;

pub use lockfree_fifo::{Fifo, FifoConsumer, FifoProducer, FIFO_CAPACITY};
pub use processor::{AnalyzerTaps, EqProcessor};
pub use sample_fifo::{SampleBlockConsumer, SingleChannelSampleFifo};
