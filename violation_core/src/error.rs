//! Error taxonomy: configuration, per-frame input, and phase state errors.

use crate::types::{BBox, FrameIndex, TrackId};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal at setup: must be fixed before any frame is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("degenerate stop line: both endpoints are ({x}, {y})")]
    DegenerateLine { x: f64, y: f64 },

    #[error("stop line endpoints must be finite")]
    NonFiniteLine,

    #[error("violation side '{side}' is ambiguous for a vertical stop line")]
    AmbiguousSide { side: &'static str },

    #[error("track TTL must be at least one frame")]
    ZeroTtl,

    #[error("cannot read config {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Parse(String),
}

/// Bad per-frame input. Malformed boxes are recovered locally; out-of-order
/// frames reject the whole call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("malformed bounding box {bbox} for track {track_id}")]
    MalformedBox { track_id: TrackId, bbox: BBox },

    #[error("frame {got} arrived after frame {last}")]
    OutOfOrderFrame { got: FrameIndex, last: FrameIndex },
}

/// Rejected phase request; the current phase is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("unrecognised signal phase '{0}' (expected RED or GREEN)")]
    UnknownPhase(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    State(#[from] StateError),
}

pub type Result<T> = std::result::Result<T, Error>;
