//! Analysis thread: spectrum and response-curve geometry
//!
//! Fed exclusively through the lock-free sample FIFOs and the parameter
//! store's change flag; nothing here is shared with the audio thread.

pub mod display;
pub mod fft;
pub mod path;

pub use display::{AnalyzerDisplay, DisplayFrame, DisplayHandle, RenderSink};
pub use fft::{blackman_harris_window, FftDataGenerator, MagnitudeConsumer};
pub use path::{spectrum_points, PathProducer, SpectrumScale};
