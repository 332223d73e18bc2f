//! Scenario definitions.
//!
//! Each scenario is a named configuration of vehicles, a stop line, a signal
//! phase schedule and detector imperfections. All scenarios are deterministic
//! given the same seed.

use crate::{
    detector::{DetectorParams, DetectorSimulator},
    replay::{ReplayFrame, ReplayLog},
    vehicle::{MotionSpec, Vehicle},
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use violation_core::{FrameIndex, LineConfig, Point, SignalPhase, ViolationSide};

/// Which pre-defined scenario to load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// 4 cars, horizontal stop line, one RED window, perfect detector
    Simple,
    /// 24 cars, slanted stop line, cycling signal
    Intersection,
    /// `Simple` seen through a lossy, jittery detector that emits bad boxes
    Noisy,
}

/// Phase changes keyed by the first frame they apply to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseSchedule {
    /// Sorted by frame ascending
    pub entries: Vec<(i64, SignalPhase)>,
}

impl PhaseSchedule {
    pub fn new(mut entries: Vec<(i64, SignalPhase)>) -> Self {
        entries.sort_by_key(|(frame, _)| *frame);
        Self { entries }
    }

    /// Alternate GREEN / RED with fixed durations, starting GREEN at frame 0.
    pub fn cycle(green_frames: i64, red_frames: i64, total_frames: i64) -> Self {
        let mut entries = Vec::new();
        let mut frame = 0;
        while frame < total_frames {
            entries.push((frame, SignalPhase::Green));
            entries.push((frame + green_frames, SignalPhase::Red));
            frame += green_frames + red_frames;
        }
        Self::new(entries)
    }

    /// Phase in force at `frame` (GREEN before the first entry).
    pub fn phase_at(&self, frame: i64) -> SignalPhase {
        self.entries
            .iter()
            .take_while(|(start, _)| *start <= frame)
            .last()
            .map(|(_, phase)| *phase)
            .unwrap_or_default()
    }
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Number of frames to generate
    pub frames: i64,
    pub stop_line: LineConfig,
    pub schedule: PhaseSchedule,
    pub detector: DetectorParams,
    pub vehicles: Vec<Vehicle>,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Simple => Self::simple(seed),
            ScenarioKind::Intersection => Self::intersection(seed),
            ScenarioKind::Noisy => Self::noisy(seed),
        }
    }

    /// Run the scenario and record every frame, both as detected and as
    /// ground truth.
    pub fn generate_log(&self) -> ReplayLog {
        let mut vehicles = self.vehicles.clone();
        let mut detector = DetectorSimulator::new(self.detector.clone(), self.seed);
        let mut frames = Vec::with_capacity(self.frames as usize);
        let mut ground_truth = Vec::with_capacity(self.frames as usize);

        for frame in 0..self.frames {
            let phase = self.schedule.phase_at(frame);
            ground_truth.push(ReplayFrame {
                frame_index: FrameIndex(frame),
                phase,
                detections: detector.ground_truth(&vehicles, frame),
            });
            frames.push(ReplayFrame {
                frame_index: FrameIndex(frame),
                phase,
                detections: detector.generate(&vehicles, frame),
            });
            for v in &mut vehicles {
                v.step(frame);
            }
        }

        ReplayLog {
            scenario_name: self.name.clone(),
            seed: self.seed,
            stop_line: Some(self.stop_line),
            frames,
            ground_truth,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 1: Simple
    // -----------------------------------------------------------------------
    fn simple(seed: u64) -> Self {
        let size = [80.0, 60.0];
        let vehicles = vec![
            // Runs the light: crosses y=400 at frame 76 (RED)
            Vehicle::new(1, [300.0, 100.0], [0.0, 4.0], size),
            // Stops at y=350 during RED, moves off on GREEN
            Vehicle::new(2, [600.0, 0.0], [0.0, 5.0], size).with_motion(MotionSpec::StopAndGo {
                halt_frame: 70,
                resume_frame: Some(245),
            }),
            // Crosses on GREEN and leaves the image before RED
            Vehicle::new(3, [900.0, 300.0], [0.0, 8.0], size),
            // Arrives late, crosses at frame 217 (RED)
            Vehicle::new(4, [1000.0, 0.0], [0.0, 6.0], size).appearing_at(150),
        ];

        Self {
            name: "Simple".into(),
            seed,
            frames: 300,
            stop_line: LineConfig::new(
                Point::new(0.0, 400.0),
                Point::new(1280.0, 400.0),
                ViolationSide::Below,
            ),
            schedule: PhaseSchedule::new(vec![
                (0, SignalPhase::Green),
                (60, SignalPhase::Red),
                (240, SignalPhase::Green),
            ]),
            detector: DetectorParams::default(),
            vehicles,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 2: Intersection
    // -----------------------------------------------------------------------
    fn intersection(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let frames = 600;

        let vehicles = (0..24)
            .map(|id| {
                let width = rng.gen_range(60.0..120.0);
                let appear = rng.gen_range(0..400);
                let vehicle = Vehicle::new(
                    id,
                    [rng.gen_range(100.0..1180.0), rng.gen_range(-200.0..100.0)],
                    [rng.gen_range(-0.5..0.5), rng.gen_range(2.0..6.0)],
                    [width, width * 0.75],
                )
                .appearing_at(appear);
                if rng.gen_bool(0.5) {
                    let halt = appear + rng.gen_range(30..60);
                    vehicle.with_motion(MotionSpec::StopAndGo {
                        halt_frame: halt,
                        resume_frame: Some(halt + rng.gen_range(60..150)),
                    })
                } else {
                    vehicle
                }
            })
            .collect();

        Self {
            name: "Intersection".into(),
            seed,
            frames,
            stop_line: LineConfig::new(
                Point::new(0.0, 520.0),
                Point::new(1280.0, 440.0),
                ViolationSide::Below,
            ),
            schedule: PhaseSchedule::cycle(90, 90, frames),
            detector: DetectorParams {
                p_detection: 0.95,
                jitter_px: 1.5,
                ..Default::default()
            },
            vehicles,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 3: Noisy
    // -----------------------------------------------------------------------
    fn noisy(seed: u64) -> Self {
        Self {
            name: "Noisy".into(),
            detector: DetectorParams {
                p_detection: 0.9,
                jitter_px: 2.0,
                p_malformed: 0.02,
                ..Default::default()
            },
            ..Self::simple(seed)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
