//! Domain entities and DSP rules

pub mod audio;
pub mod coefficients;
pub mod config;
pub mod dsp;
pub mod geometry;
pub mod params;
pub mod response;
pub mod settings;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{Channel, EqError, STEREO};
pub use coefficients::{ChainCoefficients, CutCoefficients};
pub use config::{
    AnalyzerConfig, AudioConfig, ConfigError, ConfigManager, ConfigOrigin, ContourConfig, DisplayConfig,
    FftOrder,
};
pub use dsp::{
    Biquad, BiquadCoeffs, ChainPosition, ChannelEngine, CutFilter, FilterStage, MonoChain,
    StereoEngine, MAX_CUT_SECTIONS,
};
pub use geometry::{GridLine, Gridlines, Path, Point, Rect};
pub use params::{ChangeFlag, ListenerHandle, ParamId, ParameterListener, ParameterStore};
pub use response::ResponseCurve;
pub use settings::{ChainSettings, Slope};
