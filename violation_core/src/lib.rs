//! `violation_core` — Red-light violation decision engine.
//!
//! # Module layout
//! - [`types`]          — Fundamental types (ids, boxes, detections, phase, events)
//! - [`error`]          — Configuration / input / state error taxonomy
//! - [`geometry`]       — Stop line and cross-product side test
//! - [`track`]          — Per-track record
//! - [`track_registry`] — Track creation, refresh, violation marking, TTL expiry
//! - [`signal`]         — RED/GREEN controller delimiting violation windows
//! - [`engine`]         — Per-frame orchestrator
//! - [`config`]         — JSON-loadable engine configuration
//! - [`audit`]          — Append-only violation sinks
//! - [`stats`]          — Running engine counters

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod signal;
pub mod stats;
pub mod track;
pub mod track_registry;
pub mod types;

pub use audit::{AuditSink, JsonLinesSink, MemorySink};
pub use config::{EngineConfig, LineConfig};
pub use engine::{FrameOutcome, ViolationEngine};
pub use error::{ConfigurationError, Error, InputError, Result, StateError};
pub use geometry::{LineGeometry, Side, StopLine, ViolationSide};
pub use signal::{PhaseTransition, SignalPhaseController};
pub use track::TrackRecord;
pub use track_registry::TrackRegistry;
pub use types::{BBox, Detection, FrameIndex, Point, SignalPhase, TrackId, ViolationEvent};
