//! Track lifecycle management: creation, refresh, violation marking, expiry.
//!
//! # Lifecycle Policy
//! - **Creation**: first appearance of a track id inserts a non-violating record.
//! - **Refresh**: every later appearance updates `last_bbox` / `last_seen_frame`.
//! - **Violation**: `violated` flips false→true at most once; only `clear()`
//!   (a new violation window) can drop it again.
//! - **Expiry**: records not seen for more than `ttl` frames are evicted,
//!   so identities the tracker has retired do not accumulate.

use crate::{
    track::TrackRecord,
    types::{BBox, FrameIndex, TrackId},
};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Owns every live [`TrackRecord`], keyed by track id.
#[derive(Clone, Debug, Default)]
pub struct TrackRegistry {
    tracks: HashMap<TrackId, TrackRecord>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record or refresh an existing one. Never touches `violated`.
    pub fn upsert(&mut self, track_id: TrackId, bbox: BBox, frame_index: FrameIndex) {
        self.tracks
            .entry(track_id)
            .and_modify(|rec| rec.observe(bbox, frame_index))
            .or_insert_with(|| TrackRecord::new(track_id, bbox, frame_index));
    }

    /// Mark a track as violating. Returns `true` only on the false→true
    /// transition; unknown ids and already-violating tracks return `false`.
    pub fn mark_violation(&mut self, track_id: TrackId) -> bool {
        match self.tracks.get_mut(&track_id) {
            Some(rec) if !rec.violated => {
                rec.violated = true;
                true
            }
            _ => false,
        }
    }

    /// Drop every record. Used when a new violation window opens.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Remove records with `last_seen_frame < frame_index - ttl`.
    /// Returns the number of removed records.
    pub fn expire(&mut self, frame_index: FrameIndex, ttl: u64) -> usize {
        let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
        let cutoff = FrameIndex(frame_index.0.saturating_sub(ttl));
        let before = self.tracks.len();
        self.tracks.retain(|_, rec| rec.last_seen_frame >= cutoff);
        let removed = before - self.tracks.len();
        if removed > 0 {
            debug!(removed, %frame_index, %cutoff, "expired stale tracks");
        }
        removed
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackRecord> {
        self.tracks.get(&track_id)
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.tracks.contains_key(&track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Ids of every record currently flagged as violating, in ascending order.
    pub fn violated_ids(&self) -> BTreeSet<TrackId> {
        self.tracks
            .values()
            .filter(|rec| rec.violated)
            .map(|rec| rec.track_id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRecord> {
        self.tracks.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
