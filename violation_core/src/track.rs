//! Track record: last known box, violation flag, first/last seen frame.

use crate::types::{BBox, FrameIndex, TrackId};
use serde::{Deserialize, Serialize};

/// Per-track state owned by the [`TrackRegistry`](crate::track_registry::TrackRegistry).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Identifier supplied by the external tracker
    pub track_id: TrackId,
    /// Box from the most recent frame the track appeared in
    pub last_bbox: BBox,
    /// Counted as a violator in the current window
    pub violated: bool,
    /// Frame of first appearance in the current window
    pub first_seen_frame: FrameIndex,
    /// Frame of the latest appearance
    pub last_seen_frame: FrameIndex,
    /// Number of upserts received (duplicates within a frame count separately)
    pub hits: u32,
}

impl TrackRecord {
    /// Create a fresh, non-violating record from its first detection.
    pub fn new(track_id: TrackId, bbox: BBox, frame_index: FrameIndex) -> Self {
        Self {
            track_id,
            last_bbox: bbox,
            violated: false,
            first_seen_frame: frame_index,
            last_seen_frame: frame_index,
            hits: 1,
        }
    }

    /// Refresh position and recency. The violation flag is left alone.
    pub fn observe(&mut self, bbox: BBox, frame_index: FrameIndex) {
        self.last_bbox = bbox;
        self.last_seen_frame = frame_index;
        self.hits = self.hits.saturating_add(1);
    }

    /// Frames since the track was last seen, relative to `now`.
    pub fn age(&self, now: FrameIndex) -> i64 {
        now.0.saturating_sub(self.last_seen_frame.0)
    }
}
