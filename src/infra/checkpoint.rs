// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the run configuration and per-round model weights
// under the save directory.
//
// What gets saved:
//   1. run_config.json               — the full run configuration,
//      written once at startup so a finished directory is
//      self-describing
//   2. embedding_round_{r}.ckpt      — embedding parameter group
//      after round r's training epochs
//   3. codesign_round_{r}.ckpt      — co-design parameter group
//      after round r's training epochs
//
// The checkpoint files themselves are produced by the model
// process; this side only decides names and hands over paths.
//
// File naming convention:
//   {save_dir}/
//     run_config.json
//     embedding_round_0.ckpt
//     codesign_round_0.ckpt
//     ...

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::traits::{GenerativeModel, ParamGroup};

/// Manages the save directory: run config plus per-round weights.
pub struct CheckpointManager {
    /// Directory where everything for this run lands
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create save directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the run configuration as pretty-printed JSON.
    /// Called once at startup.
    pub fn save_config<C: Serialize>(&self, config: &C) -> Result<()> {
        let path = self.dir.join("run_config.json");
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write run config '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "saved run config");
        Ok(())
    }

    /// Save both parameter groups for round `round`.
    pub fn save_round<M: GenerativeModel>(&self, model: &mut M, round: usize) -> Result<()> {
        for group in [ParamGroup::Embedding, ParamGroup::Codesign] {
            let path = self
                .dir
                .join(format!("{}_round_{}.ckpt", group.as_str(), round));
            model
                .save_group(group, &path)
                .with_context(|| format!("cannot save checkpoint '{}'", path.display()))?;
        }
        tracing::info!(round, "saved round checkpoints");
        Ok(())
    }
}
