//! Vehicle trajectory models in image space.
//!
//! Each vehicle is described by the bottom-centre of its bounding box (where
//! it touches the road), a per-frame velocity in pixels, and a `MotionSpec`.
//! The simulator steps each vehicle forward once per frame.

use serde::{Deserialize, Serialize};
use violation_core::{BBox, Point};

/// Describes how a vehicle moves between frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity for the vehicle's whole lifetime.
    ConstantVelocity,
    /// Halts at `halt_frame` and stays put until `resume_frame` (forever if `None`).
    StopAndGo {
        halt_frame: i64,
        resume_frame: Option<i64>,
    },
}

/// A simulated vehicle with ground-truth position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    /// Track id the simulated tracker reports for this vehicle
    pub id: i64,
    /// Bottom-centre of the box [x, y] in pixels
    pub position: [f64; 2],
    /// Displacement per frame [vx, vy] in pixels
    pub velocity: [f64; 2],
    /// Box size [width, height] in pixels
    pub size: [f64; 2],
    pub motion: MotionSpec,
    /// Optional: vehicle enters the scene at this frame
    pub appear_at: Option<i64>,
    /// Optional: vehicle leaves the scene at this frame
    pub disappear_at: Option<i64>,
}

impl Vehicle {
    pub fn new(id: i64, position: [f64; 2], velocity: [f64; 2], size: [f64; 2]) -> Self {
        Self {
            id,
            position,
            velocity,
            size,
            motion: MotionSpec::ConstantVelocity,
            appear_at: None,
            disappear_at: None,
        }
    }

    pub fn with_motion(mut self, motion: MotionSpec) -> Self {
        self.motion = motion;
        self
    }

    pub fn appearing_at(mut self, frame: i64) -> Self {
        self.appear_at = Some(frame);
        self
    }

    /// Advance by one frame. Vehicles do not move before they appear or
    /// while halted.
    pub fn step(&mut self, frame: i64) {
        if self.appear_at.is_some_and(|a| frame < a) || self.is_halted(frame) {
            return;
        }
        self.position[0] += self.velocity[0];
        self.position[1] += self.velocity[1];
    }

    pub fn is_halted(&self, frame: i64) -> bool {
        match self.motion {
            MotionSpec::ConstantVelocity => false,
            MotionSpec::StopAndGo {
                halt_frame,
                resume_frame,
            } => frame >= halt_frame && resume_frame.map_or(true, |r| frame < r),
        }
    }

    /// True if the vehicle is in the scene at `frame`.
    pub fn is_active(&self, frame: i64) -> bool {
        if let Some(appear) = self.appear_at {
            if frame < appear {
                return false;
            }
        }
        if let Some(disappear) = self.disappear_at {
            if frame >= disappear {
                return false;
            }
        }
        true
    }

    /// Ground-truth bounding box.
    pub fn bbox(&self) -> BBox {
        BBox::from_bottom_center(
            Point::new(self.position[0], self.position[1]),
            self.size[0],
            self.size[1],
        )
    }
}
