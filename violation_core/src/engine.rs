//! Engine orchestrator: the full violation-decision cycle for one frame.
//!
//! # Processing steps per frame
//! 1. Reject frames older than the last processed one (nothing is mutated)
//! 2. Apply a phase change if the supplied phase differs (opens a new window)
//! 3. Validate boxes; skip malformed ones, upsert the rest into the registry
//! 4. RED + configured line: crossing test, idempotent marking, count + events
//! 5. Expire tracks not seen within the TTL
//! 6. Report the counter, the violated set and this frame's events

use crate::{
    audit::AuditSink,
    config::{EngineConfig, LineConfig},
    error::{ConfigurationError, InputError, StateError},
    geometry::LineGeometry,
    signal::{PhaseTransition, SignalPhaseController},
    stats::EngineStats,
    track_registry::TrackRegistry,
    types::{Detection, FrameIndex, SignalPhase, TrackId, ViolationEvent},
};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Outputs of one `process_frame` call.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    pub frame_index: FrameIndex,
    /// Phase the frame was evaluated under
    pub phase: SignalPhase,
    /// Running violation counter after this frame
    pub violation_count: u64,
    /// Every track currently flagged as violating
    pub violated_ids: BTreeSet<TrackId>,
    /// Violations newly counted in this frame
    pub events: Vec<ViolationEvent>,
    /// Detections skipped because their box was malformed
    pub rejected: Vec<InputError>,
    /// Number of records evicted by TTL during this frame
    pub expired: usize,
}

/// Per-stream violation engine. Owns all mutable state; share nothing
/// between streams.
pub struct ViolationEngine {
    geometry: Option<LineGeometry>,
    track_ttl: Option<u64>,
    initial_phase: SignalPhase,
    registry: TrackRegistry,
    signal: SignalPhaseController,
    /// Ids already counted in the current window, kept across TTL expiry
    counted: HashSet<TrackId>,
    violation_count: u64,
    last_frame: Option<FrameIndex>,
    stats: EngineStats,
    audit: Option<Box<dyn AuditSink>>,
}

impl ViolationEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let geometry = config
            .stop_line
            .as_ref()
            .map(LineConfig::geometry)
            .transpose()?;
        Ok(Self {
            geometry,
            track_ttl: config.track_ttl,
            initial_phase: config.initial_phase,
            registry: TrackRegistry::new(),
            signal: SignalPhaseController::new(config.initial_phase),
            counted: HashSet::new(),
            violation_count: 0,
            last_frame: None,
            stats: EngineStats::default(),
            audit: None,
        })
    }

    /// Forward every emitted event to `sink`.
    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Install or replace the stop line. Takes effect from the next frame.
    pub fn configure_line(&mut self, line: LineConfig) -> Result<(), ConfigurationError> {
        self.geometry = Some(line.geometry()?);
        info!(
            p1 = ?line.p1,
            p2 = ?line.p2,
            side = line.violation_side.as_str(),
            "stop line configured"
        );
        Ok(())
    }

    /// Remove the stop line; evaluation is refused until a new one is set.
    pub fn clear_line(&mut self) {
        self.geometry = None;
    }

    pub fn geometry(&self) -> Option<&LineGeometry> {
        self.geometry.as_ref()
    }

    /// Change phase between frames. A real change clears the registry.
    pub fn set_phase(&mut self, phase: SignalPhase) -> PhaseTransition {
        let transition = self.signal.set_phase(phase);
        if transition.is_change() {
            self.registry.clear();
            self.counted.clear();
            self.stats.phase_transitions += 1;
        }
        transition
    }

    /// Textual phase input (`RED`, `GREEN`, `r`, `g`).
    pub fn set_phase_str(&mut self, raw: &str) -> Result<PhaseTransition, StateError> {
        let phase: SignalPhase = raw.parse()?;
        Ok(self.set_phase(phase))
    }

    /// Process one frame of detections under `phase`.
    pub fn process_frame(
        &mut self,
        phase: SignalPhase,
        detections: &[Detection],
        frame_index: FrameIndex,
    ) -> Result<FrameOutcome, InputError> {
        // ----------------------------------------------------------------
        // Step 1: Ordering check
        // ----------------------------------------------------------------
        if let Some(last) = self.last_frame {
            if frame_index < last {
                warn!(got = %frame_index, %last, "rejecting out-of-order frame");
                return Err(InputError::OutOfOrderFrame {
                    got: frame_index,
                    last,
                });
            }
        }

        // ----------------------------------------------------------------
        // Step 2: Phase transition
        // ----------------------------------------------------------------
        self.set_phase(phase);

        // ----------------------------------------------------------------
        // Step 3: Validate + upsert
        // ----------------------------------------------------------------
        let mut valid: Vec<&Detection> = Vec::with_capacity(detections.len());
        let mut rejected = Vec::new();
        for det in detections {
            if det.bbox.is_well_formed() {
                self.registry.upsert(det.track_id, det.bbox, frame_index);
                valid.push(det);
            } else {
                warn!(
                    track = %det.track_id,
                    bbox = %det.bbox,
                    frame = %frame_index,
                    "skipping malformed detection"
                );
                rejected.push(InputError::MalformedBox {
                    track_id: det.track_id,
                    bbox: det.bbox,
                });
            }
        }
        self.stats.detections_seen += detections.len() as u64;
        self.stats.detections_rejected += rejected.len() as u64;

        // ----------------------------------------------------------------
        // Step 4: Crossing evaluation (RED only, line required)
        // ----------------------------------------------------------------
        let mut events = Vec::new();
        if phase.is_red() {
            match self.geometry {
                Some(geometry) => {
                    for det in valid {
                        // A record re-created after expiry is flagged again
                        // for highlighting but not counted twice.
                        if geometry.crosses(&det.bbox)
                            && self.registry.mark_violation(det.track_id)
                            && self.counted.insert(det.track_id)
                        {
                            events.push(self.count_violation(det, frame_index));
                        }
                    }
                }
                None => {
                    self.stats.frames_unevaluated += 1;
                    debug!(frame = %frame_index, "no stop line configured, skipping evaluation");
                }
            }
        }

        // ----------------------------------------------------------------
        // Step 5: TTL expiry
        // ----------------------------------------------------------------
        let expired = match self.track_ttl {
            Some(ttl) => self.registry.expire(frame_index, ttl),
            None => 0,
        };
        self.stats.tracks_expired += expired as u64;

        self.last_frame = Some(frame_index);
        self.stats.frames_processed += 1;

        Ok(FrameOutcome {
            frame_index,
            phase,
            violation_count: self.violation_count,
            violated_ids: self.registry.violated_ids(),
            events,
            rejected,
            expired,
        })
    }

    fn count_violation(&mut self, det: &Detection, frame_index: FrameIndex) -> ViolationEvent {
        self.violation_count += 1;
        self.stats.violations += 1;
        let event = ViolationEvent {
            track_id: det.track_id,
            frame_index,
            position: LineGeometry::reference_point(&det.bbox),
            window: self.signal.window(),
        };
        info!(
            track = %event.track_id,
            frame = %frame_index,
            x = event.position.x,
            y = event.position.y,
            total = self.violation_count,
            "red-light violation"
        );
        if let Some(sink) = self.audit.as_mut() {
            if let Err(e) = sink.record(&event) {
                warn!(error = %e, "audit sink rejected violation event");
            }
        }
        event
    }

    /// Zero the counter and forget all tracks, the last frame index and the
    /// statistics. The stop line and audit sink are kept.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.signal = SignalPhaseController::new(self.initial_phase);
        self.counted.clear();
        self.violation_count = 0;
        self.last_frame = None;
        self.stats = EngineStats::default();
    }

    /// Flush the audit sink, if any.
    pub fn flush_audit(&mut self) -> std::io::Result<()> {
        match self.audit.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    pub fn violation_count(&self) -> u64 {
        self.violation_count
    }

    pub fn violated_ids(&self) -> BTreeSet<TrackId> {
        self.registry.violated_ids()
    }

    pub fn phase(&self) -> SignalPhase {
        self.signal.phase()
    }

    pub fn window(&self) -> u64 {
        self.signal.window()
    }

    pub fn last_frame(&self) -> Option<FrameIndex> {
        self.last_frame
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audit::MemorySink,
        geometry::ViolationSide,
        types::{BBox, Point},
    };

    fn line() -> LineConfig {
        LineConfig::new(
            Point::new(0.0, 100.0),
            Point::new(200.0, 100.0),
            ViolationSide::Below,
        )
    }

    fn engine_with_line(ttl: Option<u64>) -> ViolationEngine {
        ViolationEngine::new(EngineConfig {
            stop_line: Some(line()),
            track_ttl: ttl,
            ..Default::default()
        })
        .unwrap()
    }

    /// Box whose bottom edge sits at `bottom`.
    fn det(id: i64, bottom: f64) -> Detection {
        Detection::new(id, BBox::new(80.0, bottom - 40.0, 120.0, bottom))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = EngineConfig {
            stop_line: Some(LineConfig::new(
                Point::new(1.0, 1.0),
                Point::new(1.0, 1.0),
                ViolationSide::Below,
            )),
            ..Default::default()
        };
        assert!(ViolationEngine::new(cfg).is_err());
    }

    #[test]
    fn green_frames_never_count() {
        let mut eng = engine_with_line(None);
        let out = eng
            .process_frame(SignalPhase::Green, &[det(1, 150.0)], FrameIndex(0))
            .unwrap();
        assert_eq!(out.violation_count, 0);
        assert!(out.violated_ids.is_empty());
        assert_eq!(eng.registry().len(), 1, "Tracks update even on GREEN");
    }

    #[test]
    fn missing_line_refuses_evaluation_but_tracks() {
        let mut eng = ViolationEngine::new(EngineConfig::default()).unwrap();
        let out = eng
            .process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(0))
            .unwrap();
        assert_eq!(out.violation_count, 0);
        assert!(eng.registry().contains(TrackId(1)));
        assert_eq!(eng.stats().frames_unevaluated, 1);

        eng.configure_line(line()).unwrap();
        let out = eng
            .process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(1))
            .unwrap();
        assert_eq!(out.violation_count, 1);

        eng.clear_line();
        assert!(eng.geometry().is_none());
    }

    #[test]
    fn phase_change_is_applied_before_detections() {
        let mut eng = engine_with_line(None);
        eng.process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(0))
            .unwrap();
        // Same frame index, new phase: registry cleared then repopulated
        let out = eng
            .process_frame(SignalPhase::Green, &[det(2, 50.0)], FrameIndex(0))
            .unwrap();
        assert!(out.violated_ids.is_empty());
        assert!(!eng.registry().contains(TrackId(1)));
        assert!(eng.registry().contains(TrackId(2)));
        assert_eq!(out.violation_count, 1, "Counter survives window reset");
    }

    #[test]
    fn repeated_same_phase_does_not_reset() {
        let mut eng = engine_with_line(None);
        eng.process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(0))
            .unwrap();
        assert_eq!(eng.set_phase(SignalPhase::Red), PhaseTransition::Unchanged);
        let out = eng
            .process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(1))
            .unwrap();
        assert_eq!(out.violation_count, 1);
        assert_eq!(out.violated_ids.len(), 1);
        assert_eq!(eng.stats().phase_transitions, 1);
    }

    #[test]
    fn set_phase_str_rejects_unknown_value() {
        let mut eng = engine_with_line(None);
        assert!(eng.set_phase_str("blue").is_err());
        assert_eq!(eng.phase(), SignalPhase::Green);
        assert!(eng.set_phase_str("r").unwrap().is_change());
        assert_eq!(eng.phase(), SignalPhase::Red);
        assert_eq!(eng.window(), 1);
    }

    #[test]
    fn events_carry_reference_point_and_window() {
        let mut eng = engine_with_line(None);
        let out = eng
            .process_frame(SignalPhase::Red, &[det(3, 130.0)], FrameIndex(7))
            .unwrap();
        assert_eq!(
            out.events,
            vec![ViolationEvent {
                track_id: TrackId(3),
                frame_index: FrameIndex(7),
                position: Point::new(100.0, 130.0),
                window: 1,
            }]
        );
    }

    #[test]
    fn duplicate_detection_in_one_frame_counts_once() {
        let mut eng = engine_with_line(None);
        let out = eng
            .process_frame(
                SignalPhase::Red,
                &[det(1, 150.0), det(1, 160.0)],
                FrameIndex(0),
            )
            .unwrap();
        assert_eq!(out.violation_count, 1);
        assert_eq!(out.events.len(), 1);
    }

    #[test]
    fn ttl_expires_unseen_tracks() {
        let mut eng = engine_with_line(Some(2));
        eng.process_frame(SignalPhase::Green, &[det(1, 50.0), det(2, 50.0)], FrameIndex(0))
            .unwrap();
        for f in 1..=3 {
            eng.process_frame(SignalPhase::Green, &[det(2, 50.0)], FrameIndex(f))
                .unwrap();
        }
        // At frame 3, cutoff = 1: track 1 (last seen 0) is gone.
        assert!(!eng.registry().contains(TrackId(1)));
        assert!(eng.registry().contains(TrackId(2)));
        assert_eq!(eng.stats().tracks_expired, 1);
    }

    #[test]
    fn expired_violator_returning_in_same_window_is_not_recounted() {
        let mut eng = engine_with_line(Some(1));
        eng.process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(0))
            .unwrap();
        let out = eng
            .process_frame(SignalPhase::Red, &[], FrameIndex(5))
            .unwrap();
        assert_eq!(out.expired, 1);
        assert!(out.violated_ids.is_empty());
        let out = eng
            .process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(6))
            .unwrap();
        assert_eq!(out.violation_count, 1);
        assert!(out.events.is_empty());
        assert!(out.violated_ids.contains(&TrackId(1)), "Still highlighted");

        // A new window counts it again
        eng.set_phase(SignalPhase::Green);
        let out = eng
            .process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(7))
            .unwrap();
        assert_eq!(out.violation_count, 2);
    }

    #[test]
    fn audit_sink_receives_every_event() {
        let sink = MemorySink::new();
        let mut eng = engine_with_line(None).with_audit_sink(Box::new(sink.clone()));
        eng.process_frame(
            SignalPhase::Red,
            &[det(1, 150.0), det(2, 90.0), det(3, 150.0)],
            FrameIndex(0),
        )
        .unwrap();
        let ids: Vec<_> = sink.events().iter().map(|e| e.track_id).collect();
        assert_eq!(ids, vec![TrackId(1), TrackId(3)]);
        eng.flush_audit().unwrap();
    }

    #[test]
    fn reset_zeroes_everything_but_line() {
        let mut eng = engine_with_line(None);
        eng.process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(10))
            .unwrap();
        eng.reset();
        assert_eq!(eng.violation_count(), 0);
        assert!(eng.violated_ids().is_empty());
        assert!(eng.last_frame().is_none());
        assert_eq!(eng.phase(), SignalPhase::Green);
        assert_eq!(eng.stats(), &EngineStats::default());
        // Earlier frame indices are accepted again after reset
        let out = eng
            .process_frame(SignalPhase::Red, &[det(1, 150.0)], FrameIndex(0))
            .unwrap();
        assert_eq!(out.violation_count, 1);
    }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ViolationEngine>();
    }
}
