//! # Checkpoint writer
//!
//! Periodic state snapshots under `<run_dir>/checkpoints/`.
//!
//! ## Rules
//! - Predicate: `tick > 0 && tick % every_ticks == 0` (tick 0 never
//!   checkpoints)
//! - File name: `tick_NNNNN.json`, five-digit zero-padded tick
//! - `created_at` is wall clock and excluded from the fingerprint

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use af_api::CheckpointDoc;
use af_types::{ForgeError, ForgeResult, Tick};

use crate::json::to_pretty_document;

/// Writes checkpoint documents on the configured cadence.
pub struct CheckpointWriter {
    dir: PathBuf,
    every_ticks: u64,
    include_agent_memory: bool,
    include_probes: bool,
}

impl CheckpointWriter {
    pub fn create(
        run_dir: &Path,
        every_ticks: u64,
        include_agent_memory: bool,
        include_probes: bool,
    ) -> ForgeResult<Self> {
        let dir = run_dir.join("checkpoints");
        fs::create_dir_all(&dir).map_err(|e| {
            ForgeError::ArtifactWrite(format!("failed to create checkpoints dir: {}", e))
        })?;
        Ok(CheckpointWriter {
            dir,
            every_ticks: every_ticks.max(1),
            include_agent_memory,
            include_probes,
        })
    }

    pub fn should_checkpoint(&self, tick: Tick) -> bool {
        tick.as_u64() > 0 && tick.as_u64() % self.every_ticks == 0
    }

    pub fn include_agent_memory(&self) -> bool {
        self.include_agent_memory
    }

    pub fn include_probes(&self) -> bool {
        self.include_probes
    }

    /// Write one checkpoint document. Returns the file path.
    pub fn write(&self, doc: &CheckpointDoc) -> ForgeResult<PathBuf> {
        let path = self.dir.join(format!("tick_{:05}.json", doc.tick.as_u64()));
        let body = to_pretty_document(doc)?;

        let mut file = File::create(&path).map_err(|e| {
            ForgeError::ArtifactWrite(format!("failed to create checkpoint {:?}: {}", path, e))
        })?;
        file.write_all(body.as_bytes()).map_err(|e| {
            ForgeError::ArtifactWrite(format!("failed to write checkpoint {:?}: {}", path, e))
        })?;
        file.sync_all().map_err(|e| {
            ForgeError::ArtifactWrite(format!("failed to sync checkpoint {:?}: {}", path, e))
        })?;

        debug!("Wrote checkpoint {:?}", path);
        Ok(path)
    }
}
