//! Contour infrastructure: the real-time audio side and the analysis thread
//!
//! - `audio`: lock-free FIFOs, per-channel sample FIFOs and the EQ processor
//!   run by the host callback
//! - `analysis`: FFT data generation, spectrum paths and the display thread

pub mod analysis;
pub mod audio;
