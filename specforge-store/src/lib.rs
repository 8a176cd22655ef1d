//! specforge store - run artifacts on disk
//!
//! The session core only exposes a per-turn tuple (document snapshot, raw
//! response, held error); this crate is the persistence collaborator that
//! consumes it. Every turn yields a raw-text snapshot, a document snapshot,
//! and one line in an append-only transcript. All JSON is written compact
//! with sorted keys so identical runs produce identical bytes.

use chrono::Utc;
use serde::Serialize;
use specforge_core::{SpecForgeResult, StoreError, TurnRecord};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const TRANSCRIPT_FILE: &str = "transcript.jsonl";

/// Where one turn's artifacts landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPaths {
    pub raw_path: PathBuf,
    pub spec_path: PathBuf,
    pub transcript_path: PathBuf,
}

/// Append-only artifact store for one session run. Each run gets its own
/// directory under the runs root, keyed by a sortable UUIDv7.
#[derive(Debug, Clone)]
pub struct RunStore {
    run_dir: PathBuf,
    run_id: String,
}

impl RunStore {
    /// Create the run directory (and the runs root if needed).
    pub fn create(runs_root: impl AsRef<Path>) -> SpecForgeResult<Self> {
        let run_id = Uuid::now_v7().to_string();
        let run_dir = runs_root.as_ref().join(&run_id);
        fs::create_dir_all(&run_dir).map_err(|e| io_error(&run_dir, e))?;
        tracing::debug!(run_id = %run_id, dir = %run_dir.display(), "run store created");
        Ok(Self { run_dir, run_id })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Persist one turn: raw model text, document snapshot, and a transcript
    /// line carrying the full record.
    pub fn record_turn(&self, record: &TurnRecord) -> SpecForgeResult<TurnPaths> {
        let ts = timestamp();

        let raw_path = self.run_dir.join(format!("raw_{}.txt", ts));
        fs::write(&raw_path, &record.raw).map_err(|e| io_error(&raw_path, e))?;

        let spec_path = self.run_dir.join(format!("spec_{}.json", ts));
        fs::write(&spec_path, canonical_json(&record.spec)?)
            .map_err(|e| io_error(&spec_path, e))?;

        let transcript_path = self.run_dir.join(TRANSCRIPT_FILE);
        let mut line = canonical_json(record)?;
        line.push('\n');
        let mut transcript = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&transcript_path)
            .map_err(|e| io_error(&transcript_path, e))?;
        transcript
            .write_all(line.as_bytes())
            .map_err(|e| io_error(&transcript_path, e))?;

        Ok(TurnPaths {
            raw_path,
            spec_path,
            transcript_path,
        })
    }

    /// Capture model output that could not be parsed, for offline debugging.
    pub fn save_json_error(&self, raw: &str, error: &str) -> SpecForgeResult<PathBuf> {
        let path = self.run_dir.join(format!("json_error_{}.txt", timestamp()));
        let contents = format!("{}\n\n---- RAW OUTPUT ----\n{}", error, raw);
        fs::write(&path, contents).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}

/// Compact JSON with fully sorted keys: values are rebuilt through
/// `serde_json::Value`, whose map is ordered.
fn canonical_json<T: Serialize>(value: &T) -> SpecForgeResult<String> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Serialize {
        reason: e.to_string(),
    })?;
    serde_json::to_string(&value).map_err(|e| {
        StoreError::Serialize {
            reason: e.to_string(),
        }
        .into()
    })
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string()
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
