//! Audio vocabulary shared by the real-time and analysis sides
//!
//! This module defines the error type used across the signal path, the
//! channel identifiers of the stereo engine and decibel conversions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while preparing the signal path
///
/// None of these are ever produced on the audio thread: preparation and
/// validation happen before processing starts.
#[derive(Debug, Error)]
pub enum EqError {
    /// Sample rate is zero, negative or not finite
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// Block size of zero frames
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Filter design rejected its inputs
    #[error("Invalid filter design: {0}")]
    InvalidCoefficients(String),

    /// Inconsistent configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, EqError>;

/// Number of channels handled by the stereo engine
pub const STEREO: usize = 2;

/// Channel of the stereo engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub const ALL: [Channel; STEREO] = [Channel::Left, Channel::Right];

    /// Position of this channel in a planar buffer
    pub fn index(&self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Left => "left",
            Channel::Right => "right",
        }
    }
}

/// Check that a sample rate can drive filter design
///
/// Any finite positive rate is accepted. Filter frequencies that land at or
/// above its Nyquist limit are pulled just below it by the coefficient factory.
pub fn validate_sample_rate(sample_rate: f64) -> Result<f64> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        Err(EqError::InvalidSampleRate(sample_rate))
    }
}

/// Floor used when a gain of zero has to be expressed in decibels
pub const MINUS_INFINITY_DB: f64 = -100.0;

/// Convert a linear gain factor to decibels, never going below `floor_db`
#[inline]
pub fn gain_to_db(gain: f64, floor_db: f64) -> f64 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(floor_db)
    } else {
        floor_db
    }
}

/// Convert decibels to a linear gain factor
///
/// Anything at or below `floor_db` is treated as silence.
#[inline]
pub fn db_to_gain(db: f64, floor_db: f64) -> f64 {
    if db > floor_db {
        10.0_f64.powf(db / 20.0)
    } else {
        0.0
    }
}
