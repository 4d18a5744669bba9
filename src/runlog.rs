//! Append-only JSONL log of reconciliation activity.
//!
//! Recoverable conditions (missing per-source snapshots, defensively padded
//! override rows) are recorded here rather than aborting the run; fatal
//! conditions propagate as errors and the log simply shows an unterminated
//! run.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    RunStarted,
    SourceLoaded,
    SnapshotMissing,
    OverrideRowsMalformed,
    RunCompleted,
    OverrideSaved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Wraps the workspace event log path.
pub struct ReconciliationLog {
    events_path: PathBuf,
}

impl ReconciliationLog {
    pub fn new(events_path: PathBuf) -> Self {
        Self { events_path }
    }

    pub fn append(&self, event_type: EventType, details: serde_json::Value) -> Result<Uuid> {
        let event = RunEvent {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            details,
        };
        if let Some(parent) = self.events_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)?;
        file.write_all(serde_json::to_string(&event)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(event.event_id)
    }
}
