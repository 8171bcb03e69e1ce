//! Parameter layout and the atomic parameter store
//!
//! The control surface writes parameters from its own thread while the audio
//! thread reads them once per block. Every value lives in its own atomic, so a
//! read never observes a torn float. Listeners are told that *something*
//! changed; they are expected to re-read whatever they need.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// Identifier of every automatable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
    LowCutBypassed,
    PeakBypassed,
    HighCutBypassed,
    AnalyzerEnabled,
}

pub const PARAM_COUNT: usize = 11;

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::LowCutFreq,
        ParamId::HighCutFreq,
        ParamId::PeakFreq,
        ParamId::PeakGain,
        ParamId::PeakQuality,
        ParamId::LowCutSlope,
        ParamId::HighCutSlope,
        ParamId::LowCutBypassed,
        ParamId::PeakBypassed,
        ParamId::HighCutBypassed,
        ParamId::AnalyzerEnabled,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static ParamSpec {
        &PARAMETER_LAYOUT[self.index()]
    }

    /// Look a parameter up by its display name
    pub fn from_name(name: &str) -> Option<Self> {
        PARAMETER_LAYOUT
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.id)
    }
}

/// Labels of the cut-filter slope choices
pub const SLOPE_CHOICES: [&str; 4] = ["12 dB/Oct", "24 dB/Oct", "36 dB/Oct", "48 dB/Oct"];

/// Value domain of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Continuous value snapped to `min + k * step`
    Float { min: f32, max: f32, step: f32 },
    /// Index into a fixed list of labels
    Choice(&'static [&'static str]),
    /// On/off switch stored as 0.0 or 1.0
    Toggle,
}

/// Static description of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: f32,
}

impl ParamSpec {
    /// Clamp and snap a raw value onto this parameter's legal grid
    pub fn snap(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.default } else { value };

        match self.kind {
            ParamKind::Float { min, max, step } => {
                let clamped = value.clamp(min, max);
                if step > 0.0 {
                    (min + step * ((clamped - min) / step).round()).clamp(min, max)
                } else {
                    clamped
                }
            }
            ParamKind::Choice(options) => {
                let last = options.len().saturating_sub(1) as f32;
                value.round().clamp(0.0, last)
            }
            ParamKind::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Lower and upper bound of the value domain
    pub fn bounds(&self) -> (f32, f32) {
        match self.kind {
            ParamKind::Float { min, max, .. } => (min, max),
            ParamKind::Choice(options) => (0.0, options.len().saturating_sub(1) as f32),
            ParamKind::Toggle => (0.0, 1.0),
        }
    }
}

const FREQ_RANGE: ParamKind = ParamKind::Float {
    min: 20.0,
    max: 20000.0,
    step: 1.0,
};

/// The complete parameter layout, indexed by [`ParamId::index`]
pub static PARAMETER_LAYOUT: [ParamSpec; PARAM_COUNT] = [
    ParamSpec {
        id: ParamId::LowCutFreq,
        name: "LowCut Freq",
        kind: FREQ_RANGE,
        default: 20.0,
    },
    ParamSpec {
        id: ParamId::HighCutFreq,
        name: "HighCut Freq",
        kind: FREQ_RANGE,
        default: 20000.0,
    },
    ParamSpec {
        id: ParamId::PeakFreq,
        name: "Peak Freq",
        kind: FREQ_RANGE,
        default: 750.0,
    },
    ParamSpec {
        id: ParamId::PeakGain,
        name: "Peak Gain",
        kind: ParamKind::Float {
            min: -24.0,
            max: 24.0,
            step: 0.5,
        },
        default: 0.0,
    },
    ParamSpec {
        id: ParamId::PeakQuality,
        name: "Peak Quality",
        kind: ParamKind::Float {
            min: 0.1,
            max: 10.0,
            step: 0.05,
        },
        default: 1.0,
    },
    ParamSpec {
        id: ParamId::LowCutSlope,
        name: "LowCut Slope",
        kind: ParamKind::Choice(&SLOPE_CHOICES),
        default: 0.0,
    },
    ParamSpec {
        id: ParamId::HighCutSlope,
        name: "HighCut Slope",
        kind: ParamKind::Choice(&SLOPE_CHOICES),
        default: 0.0,
    },
    ParamSpec {
        id: ParamId::LowCutBypassed,
        name: "LowCut Bypassed",
        kind: ParamKind::Toggle,
        default: 0.0,
    },
    ParamSpec {
        id: ParamId::PeakBypassed,
        name: "Peak Bypassed",
        kind: ParamKind::Toggle,
        default: 0.0,
    },
    ParamSpec {
        id: ParamId::HighCutBypassed,
        name: "HighCut Bypassed",
        kind: ParamKind::Toggle,
        default: 0.0,
    },
    ParamSpec {
        id: ParamId::AnalyzerEnabled,
        name: "Analyzer Enabled",
        kind: ParamKind::Toggle,
        default: 1.0,
    },
];

/// Receives "some parameter changed" notifications
///
/// Called on the thread that wrote the parameter. Implementations must be
/// cheap and must not call back into the store's listener registration.
pub trait ParameterListener: Send + Sync {
    fn parameter_changed(&self, id: ParamId, value: f32);
}

/// Token returned by [`ParameterStore::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(usize);

/// Live parameter values with atomic scalar reads
pub struct ParameterStore {
    values: [AtomicU32; PARAM_COUNT],
    listeners: RwLock<Vec<(ListenerHandle, Arc<dyn ParameterListener>)>>,
    next_handle: AtomicUsize,
}

impl ParameterStore {
    /// Create a store holding every parameter's default
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(PARAMETER_LAYOUT[i].default.to_bits())),
            listeners: RwLock::new(Vec::new()),
            next_handle: AtomicUsize::new(0),
        }
    }

    /// Current value of a parameter
    ///
    /// Safe to call from the audio thread: a single relaxed atomic load.
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Selected index of a choice parameter
    #[inline]
    pub fn choice(&self, id: ParamId) -> usize {
        self.get(id).max(0.0) as usize
    }

    /// State of a toggle parameter
    #[inline]
    pub fn flag(&self, id: ParamId) -> bool {
        self.get(id) >= 0.5
    }

    /// Write a parameter, clamped and snapped to its legal range
    ///
    /// Listeners are only notified when the stored value actually changes.
    /// Returns the value that was stored.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        let snapped = id.spec().snap(value);
        let previous = self.values[id.index()].swap(snapped.to_bits(), Ordering::Relaxed);

        if previous != snapped.to_bits() {
            trace!(param = id.spec().name, value = snapped, "Parameter changed");
            self.notify(id, snapped);
        }

        snapped
    }

    /// Write a toggle parameter
    pub fn set_flag(&self, id: ParamId, on: bool) -> bool {
        self.set(id, if on { 1.0 } else { 0.0 }) >= 0.5
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for spec in PARAMETER_LAYOUT.iter() {
            self.set(spec.id, spec.default);
        }
    }

    /// Register a change listener
    pub fn add_listener(&self, listener: Arc<dyn ParameterListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, listener));
        debug!(handle = handle.0, "Parameter listener registered");
        handle
    }

    /// Unregister a listener, returning whether it was registered
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        let removed = listeners.len() != before;
        if removed {
            debug!(handle = handle.0, "Parameter listener removed");
        }
        removed
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn notify(&self, id: ParamId, value: f32) {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for (_, listener) in listeners.iter() {
            listener.parameter_changed(id, value);
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for id in ParamId::ALL {
            map.entry(&id.spec().name, &self.get(id));
        }
        map.finish()
    }
}

/// Level-triggered "parameters changed" flag
///
/// One writer (whoever sets parameters) raises it, one reader (the analysis
/// timer) consumes it with a single atomic exchange.
#[derive(Debug, Clone, Default)]
pub struct ChangeFlag(Arc<AtomicBool>);

impl ChangeFlag {
    pub fn new(raised: bool) -> Self {
        Self(Arc::new(AtomicBool::new(raised)))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the flag: returns whether it was raised and lowers it
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl ParameterListener for ChangeFlag {
    fn parameter_changed(&self, _id: ParamId, _value: f32) {
        self.raise();
    }
}
