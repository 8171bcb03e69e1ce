//! Contour core: filter design, the per-channel processing chain and the
//! display geometry derived from them.
//!
//! Nothing in this crate spawns threads or touches timing. The real-time
//! plumbing that moves audio between threads lives in `contour-infra`.

pub mod domain;
