//! `sim` — Traffic simulator standing in for the external detector:
//! vehicle trajectories, imperfect detections, phase schedules, replay.

pub mod detector;
pub mod replay;
pub mod scenarios;
pub mod vehicle;

pub use detector::{DetectorParams, DetectorSimulator};
pub use replay::{load_replay, save_replay, ReplayFrame, ReplayLog};
pub use scenarios::{PhaseSchedule, Scenario, ScenarioKind};
pub use vehicle::{MotionSpec, Vehicle};
