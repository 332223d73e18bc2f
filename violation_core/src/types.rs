//! Fundamental types used across the entire workspace.

use crate::error::StateError;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ---------------------------------------------------------------------------
// Geometry scalars: detections arrive in image pixel coordinates (y grows down).
// ---------------------------------------------------------------------------

/// A point in the detection coordinate space.
pub type Point = Point2<f64>;

/// A displacement in the detection coordinate space.
pub type Vec2 = Vector2<f64>;

// ---------------------------------------------------------------------------
// Identifier types — newtype wrappers so IDs are never confused at compile time
// ---------------------------------------------------------------------------

/// Stable identifier assigned by the external tracker to one physical object.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackId(pub i64);

/// Index of a video frame. Frames are processed in non-decreasing order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FrameIndex(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Bounding box / detection
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box `(x1, y1)`–`(x2, y2)` in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from its bottom-centre point and its width / height.
    pub fn from_bottom_center(bottom_center: Point, width: f64, height: f64) -> Self {
        let half = width / 2.0;
        Self {
            x1: bottom_center.x - half,
            y1: bottom_center.y - height,
            x2: bottom_center.x + half,
            y2: bottom_center.y,
        }
    }

    /// True if every coordinate is finite and the corners are ordered.
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|c| c.is_finite())
            && self.x1 <= self.x2
            && self.y1 <= self.y2
    }

    /// Bottom-centre of the box: where the vehicle touches the road.
    pub fn bottom_center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, self.y2)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}, {:.1}, {:.1})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

/// One tracked object reported by the external detector for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub track_id: TrackId,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(track_id: i64, bbox: BBox) -> Self {
        Self {
            track_id: TrackId(track_id),
            bbox,
        }
    }
}

// ---------------------------------------------------------------------------
// Signal phase
// ---------------------------------------------------------------------------

/// Traffic-signal phase supplied from outside the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalPhase {
    Red,
    #[default]
    Green,
}

impl SignalPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Green => "GREEN",
        }
    }

    pub fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }
}

impl fmt::Display for SignalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `RED` / `GREEN` and the single-key toggles `r` / `g`, any case.
impl FromStr for SignalPhase {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" | "R" => Ok(Self::Red),
            "GREEN" | "G" => Ok(Self::Green),
            _ => Err(StateError::UnknownPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Violation event
// ---------------------------------------------------------------------------

/// A counted red-light violation. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub track_id: TrackId,
    pub frame_index: FrameIndex,
    /// Reference point (bottom-centre) that was found past the stop line
    pub position: Point,
    /// Ordinal of the violation window the event was counted in
    pub window: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_center_is_midpoint_of_lower_edge() {
        let b = BBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(b.bottom_center(), Point::new(20.0, 60.0));
        assert_eq!(b.width(), 20.0);
        assert_eq!(b.height(), 40.0);
    }

    #[test]
    fn inverted_or_nan_boxes_are_malformed() {
        assert!(BBox::new(0.0, 0.0, 0.0, 0.0).is_well_formed());
        assert!(!BBox::new(10.0, 0.0, 5.0, 1.0).is_well_formed());
        assert!(!BBox::new(0.0, 10.0, 5.0, 1.0).is_well_formed());
        assert!(!BBox::new(0.0, f64::NAN, 5.0, 1.0).is_well_formed());
    }

    #[test]
    fn from_bottom_center_round_trips_reference_point() {
        let p = Point::new(50.0, 120.0);
        let b = BBox::from_bottom_center(p, 40.0, 30.0);
        assert_eq!(b.bottom_center(), p);
        assert_eq!(b.y1, 90.0);
    }

    #[test]
    fn phase_parses_words_and_keys() {
        assert_eq!("red".parse::<SignalPhase>().unwrap(), SignalPhase::Red);
        assert_eq!("G".parse::<SignalPhase>().unwrap(), SignalPhase::Green);
        assert_eq!(" GREEN ".parse::<SignalPhase>().unwrap(), SignalPhase::Green);
        assert_eq!(
            "amber".parse::<SignalPhase>(),
            Err(StateError::UnknownPhase("amber".into()))
        );
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let d = Detection::new(7, BBox::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.starts_with("{\"track_id\":7,"), "{json}");
        assert_eq!(serde_json::to_string(&SignalPhase::Red).unwrap(), "\"RED\"");
    }
}
