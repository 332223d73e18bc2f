//! Running counters describing what the engine has processed.

use serde::{Deserialize, Serialize};

/// Accumulated engine statistics. Reset together with the violation counter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Frames accepted by `process_frame`
    pub frames_processed: u64,
    /// RED frames that could not be evaluated because no line was configured
    pub frames_unevaluated: u64,
    /// Detections received in accepted frames
    pub detections_seen: u64,
    /// Detections skipped because their box was malformed
    pub detections_rejected: u64,
    /// Actual RED↔GREEN changes
    pub phase_transitions: u64,
    /// Records evicted by TTL
    pub tracks_expired: u64,
    /// Violations counted
    pub violations: u64,
}

impl EngineStats {
    /// Fraction of received detections that were malformed.
    pub fn rejection_rate(&self) -> f64 {
        if self.detections_seen == 0 {
            0.0
        } else {
            self.detections_rejected as f64 / self.detections_seen as f64
        }
    }
}
