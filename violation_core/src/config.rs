//! Engine configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "stop_line": { "p1": [0.0, 100.0], "p2": [200.0, 100.0], "violation_side": "below" },
//!   "track_ttl": 30,
//!   "initial_phase": "GREEN"
//! }
//! ```
//!
//! Every field is optional. `"track_ttl": null` disables expiry.

use crate::{
    error::ConfigurationError,
    geometry::{LineGeometry, StopLine, ViolationSide},
    types::{Point, SignalPhase},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Frames a track may go unseen before its record is evicted (1 s at 30 fps).
pub const DEFAULT_TRACK_TTL: u64 = 30;

/// Stop line endpoints plus the side that counts as crossed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    pub p1: Point,
    pub p2: Point,
    pub violation_side: ViolationSide,
}

impl LineConfig {
    pub fn new(p1: Point, p2: Point, violation_side: ViolationSide) -> Self {
        Self {
            p1,
            p2,
            violation_side,
        }
    }

    pub fn geometry(&self) -> Result<LineGeometry, ConfigurationError> {
        LineGeometry::new(StopLine::new(self.p1, self.p2)?, self.violation_side)
    }
}

/// Configuration for one [`ViolationEngine`](crate::engine::ViolationEngine).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Stop line; `None` until the operator has drawn one
    pub stop_line: Option<LineConfig>,
    /// Track expiry in frames; `None` keeps records until the next window
    pub track_ttl: Option<u64>,
    /// Phase the controller starts in
    pub initial_phase: SignalPhase,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop_line: None,
            track_ttl: Some(DEFAULT_TRACK_TTL),
            initial_phase: SignalPhase::Green,
        }
    }
}

impl EngineConfig {
    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.track_ttl == Some(0) {
            return Err(ConfigurationError::ZeroTtl);
        }
        if let Some(line) = &self.stop_line {
            line.geometry()?;
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
