//! Audit sinks: append-only records of counted violations.

use crate::types::ViolationEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

/// Receives every [`ViolationEvent`] the engine emits, in emission order.
pub trait AuditSink: Send {
    fn record(&mut self, event: &ViolationEvent) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One line of a JSON-lines audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ViolationEvent,
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> AuditSink for JsonLinesSink<W> {
    fn record(&mut self, event: &ViolationEvent) -> io::Result<()> {
        let record = AuditRecord {
            recorded_at: Utc::now(),
            event: event.clone(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// In-memory sink. Clones share the same buffer, so a caller can keep one
/// handle while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ViolationEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<ViolationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemorySink {
    fn record(&mut self, event: &ViolationEvent) -> io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameIndex, Point, TrackId};
    use std::io::{BufRead, BufReader};

    fn event(id: i64, frame: i64) -> ViolationEvent {
        ViolationEvent {
            track_id: TrackId(id),
            frame_index: FrameIndex(frame),
            position: Point::new(100.0, 110.0),
            window: 1,
        }
    }

    #[test]
    fn json_lines_one_record_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&event(1, 10)).unwrap();
        sink.record(&event(2, 11)).unwrap();
        let bytes = sink.into_inner();
        let lines: Vec<_> = BufReader::new(bytes.as_slice())
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        let rec: AuditRecord = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(rec.event, event(2, 11));
        assert!(lines[0].contains("\"track_id\":1"));
        assert!(lines[0].contains("\"recorded_at\""));
    }

    #[test]
    fn append_to_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        for id in [1, 2] {
            let mut sink = JsonLinesSink::append_to(&path).unwrap();
            sink.record(&event(id, id)).unwrap();
            sink.flush().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let handle = MemorySink::new();
        let mut owned = handle.clone();
        owned.record(&event(3, 4)).unwrap();
        assert_eq!(handle.events(), vec![event(3, 4)]);
    }
}
