//! Detector/tracker simulator.
//!
//! Generates per-frame `(track_id, bbox)` detections with:
//! - Miss probability (1 - P_D)
//! - Uniform box-corner jitter
//! - Occasional malformed boxes (x1/x2 swapped), as emitted by a faulty upstream
//! - Culling of boxes that lie completely outside the image

use crate::vehicle::Vehicle;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use violation_core::{BBox, Detection, TrackId};

/// Imperfections of the simulated detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Probability a visible vehicle is reported in a frame
    pub p_detection: f64,
    /// Max absolute jitter applied to each box corner (pixels)
    pub jitter_px: f64,
    /// Probability a reported box is malformed
    pub p_malformed: f64,
    /// Image size [width, height] in pixels
    pub frame_size: [f64; 2],
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            p_detection: 1.0,
            jitter_px: 0.0,
            p_malformed: 0.0,
            frame_size: [1280.0, 720.0],
        }
    }
}

impl DetectorParams {
    /// True if any part of `bbox` falls inside the image.
    pub fn is_visible(&self, bbox: &BBox) -> bool {
        let [w, h] = self.frame_size;
        bbox.x2 > 0.0 && bbox.y2 > 0.0 && bbox.x1 < w && bbox.y1 < h
    }
}

/// Generates detections from a set of vehicles.
pub struct DetectorSimulator {
    pub params: DetectorParams,
    rng: ChaCha8Rng,
}

impl DetectorSimulator {
    pub fn new(params: DetectorParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Noise-free detections of every visible, active vehicle.
    pub fn ground_truth(&self, vehicles: &[Vehicle], frame: i64) -> Vec<Detection> {
        vehicles
            .iter()
            .filter(|v| v.is_active(frame))
            .map(|v| Detection {
                track_id: TrackId(v.id),
                bbox: v.bbox(),
            })
            .filter(|d| self.params.is_visible(&d.bbox))
            .collect()
    }

    /// Detections as the imperfect detector would report them.
    pub fn generate(&mut self, vehicles: &[Vehicle], frame: i64) -> Vec<Detection> {
        let truth = self.ground_truth(vehicles, frame);
        let mut detections = Vec::with_capacity(truth.len());

        for det in truth {
            // Miss detection?
            if self.rng.gen::<f64>() > self.params.p_detection {
                continue;
            }

            let j = self.params.jitter_px;
            let mut bbox = det.bbox;
            if j > 0.0 {
                bbox.x1 += self.rng.gen_range(-j..=j);
                bbox.y1 += self.rng.gen_range(-j..=j);
                bbox.x2 += self.rng.gen_range(-j..=j);
                bbox.y2 += self.rng.gen_range(-j..=j);
            }

            if self.rng.gen::<f64>() < self.params.p_malformed {
                std::mem::swap(&mut bbox.x1, &mut bbox.x2);
            }

            detections.push(Detection {
                track_id: det.track_id,
                bbox,
            });
        }

        detections
    }
}
