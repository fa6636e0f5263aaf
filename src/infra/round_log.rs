// ============================================================
// Layer 6 — Round Log
// ============================================================
// Append-only human-readable record of each round, one line
// per round in {save_dir}/log.txt:
//
//   model from round 2: ddg mean -0.8412, std 0.3120, history best -0.9978 at round 1
//
// The scores of round r evaluate the model trained in round
// r-1, which is why the line names r-1 ("round -1" is the
// pretrained model). The file survives the process: a rerun
// pointed at the same directory keeps appending.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::candidate::RoundState;

pub struct RoundLog {
    path: PathBuf,
    file: File,
}

impl RoundLog {
    /// Open (or create) the round log under `save_dir`.
    pub fn open(save_dir: impl AsRef<Path>) -> Result<Self> {
        let path = save_dir.as_ref().join("log.txt");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open round log '{}'", path.display()))?;
        Ok(Self { path, file })
    }

    /// Append one round's statistics.
    pub fn append(
        &mut self,
        round: usize,
        mean: f64,
        std: f64,
        state: &RoundState,
    ) -> Result<()> {
        let line = format!(
            "model from round {}: ddg mean {:.4}, std {:.4}, history best {:.4} at round {}",
            round as i64 - 1,
            mean,
            std,
            state.best_score,
            state.best_round,
        );
        tracing::info!("{line}");
        writeln!(self.file, "{line}")
            .with_context(|| format!("cannot append to '{}'", self.path.display()))?;
        self.file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
