//! Stop-line geometry: which side of the line a point lies on.
//!
//! # Side test
//! side(q) = sign( (p2 − p1) × (q − p1) )   (2D cross product, z component)
//!
//! The reference point of a detection is the bottom-centre of its box, so a
//! vehicle approaching from the top of the image "crosses" once its wheels
//! pass the line. Which sign counts as crossed is configured explicitly via
//! [`ViolationSide`]; it is never inferred from the line's orientation alone.

use crate::{
    error::ConfigurationError,
    types::{BBox, Point, Vec2},
};
use serde::{Deserialize, Serialize};

/// Sign of the cross product for a point relative to the directed line p1→p2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Negative,
    On,
    Positive,
}

impl Side {
    pub fn signum(self) -> i8 {
        match self {
            Self::Negative => -1,
            Self::On => 0,
            Self::Positive => 1,
        }
    }

    fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Positive
        } else if value < 0.0 {
            Self::Negative
        } else {
            Self::On
        }
    }

    fn flipped(self) -> Self {
        match self {
            Self::Negative => Self::Positive,
            Self::On => Self::On,
            Self::Positive => Self::Negative,
        }
    }
}

/// Configured side of the stop line on which a vehicle is in violation.
///
/// `Below` / `Above` are image-space conveniences (y grows downwards) and are
/// resolved against the line direction when the geometry is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSide {
    Positive,
    Negative,
    Below,
    Above,
}

impl ViolationSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Below => "below",
            Self::Above => "above",
        }
    }
}

/// The stop-line segment. Endpoints are distinct and finite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopLine {
    pub p1: Point,
    pub p2: Point,
}

impl StopLine {
    pub fn new(p1: Point, p2: Point) -> Result<Self, ConfigurationError> {
        let coords = [p1.x, p1.y, p2.x, p2.y];
        if !coords.iter().all(|c| c.is_finite()) {
            return Err(ConfigurationError::NonFiniteLine);
        }
        if p1 == p2 {
            return Err(ConfigurationError::DegenerateLine { x: p1.x, y: p1.y });
        }
        Ok(Self { p1, p2 })
    }

    pub fn direction(&self) -> Vec2 {
        self.p2 - self.p1
    }
}

/// Stop line plus the resolved violation side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineGeometry {
    line: StopLine,
    violation_side: Side,
}

impl LineGeometry {
    /// Validate the line and resolve `violation_side` to a cross-product sign.
    pub fn new(line: StopLine, violation_side: ViolationSide) -> Result<Self, ConfigurationError> {
        // Re-run endpoint validation: `StopLine` fields are public and may
        // have been deserialized directly.
        let line = StopLine::new(line.p1, line.p2)?;
        let dir = line.direction();
        let resolved = match violation_side {
            ViolationSide::Positive => Side::Positive,
            ViolationSide::Negative => Side::Negative,
            // Probe one pixel straight down: cross((dx, dy), (0, 1)) = dx.
            ViolationSide::Below | ViolationSide::Above => {
                let below = Side::of(dir.x);
                if below == Side::On {
                    return Err(ConfigurationError::AmbiguousSide {
                        side: violation_side.as_str(),
                    });
                }
                if violation_side == ViolationSide::Below {
                    below
                } else {
                    below.flipped()
                }
            }
        };
        Ok(Self {
            line,
            violation_side: resolved,
        })
    }

    pub fn line(&self) -> &StopLine {
        &self.line
    }

    pub fn violation_side(&self) -> Side {
        self.violation_side
    }

    /// Side of `point` relative to the directed line p1→p2.
    pub fn side(&self, point: &Point) -> Side {
        Side::of(self.line.direction().perp(&(*point - self.line.p1)))
    }

    /// Canonical reference point of a box for the crossing test.
    pub fn reference_point(bbox: &BBox) -> Point {
        bbox.bottom_center()
    }

    /// True if the box's reference point lies strictly on the violation side.
    pub fn crosses(&self, bbox: &BBox) -> bool {
        self.side(&Self::reference_point(bbox)) == self.violation_side
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
