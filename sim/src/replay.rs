//! Replay: serialize/deserialize detection logs for offline analysis & replay.

use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use violation_core::{Detection, FrameIndex, LineConfig, SignalPhase};

/// A full recorded detection log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    /// Stop line the log was recorded against, if known
    #[serde(default)]
    pub stop_line: Option<LineConfig>,
    /// Detector output in chronological order
    pub frames: Vec<ReplayFrame>,
    /// Noise-free detections, one per entry in `frames`
    #[serde(default)]
    pub ground_truth: Vec<ReplayFrame>,
}

/// Everything the engine receives for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub frame_index: FrameIndex,
    pub phase: SignalPhase,
    pub detections: Vec<Detection>,
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)?;
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{Scenario, ScenarioKind};

    #[test]
    fn saved_log_loads_back() {
        let log = Scenario::build(ScenarioKind::Noisy, 5).generate_log();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noisy.json");
        save_replay(&log, &path).unwrap();
        assert_eq!(load_replay(&path).unwrap(), log);
    }

    #[test]
    fn hand_written_log_without_optional_fields() {
        let raw = r#"{
            "scenario_name": "manual",
            "seed": 0,
            "frames": [
                { "frame_index": 0, "phase": "RED",
                  "detections": [ { "track_id": 1, "bbox": { "x1": 0, "y1": 0, "x2": 10, "y2": 10 } } ] }
            ]
        }"#;
        let log: ReplayLog = serde_json::from_str(raw).unwrap();
        assert!(log.stop_line.is_none());
        assert!(log.ground_truth.is_empty());
        assert_eq!(log.frames[0].phase, SignalPhase::Red);
    }
}
