// ============================================================
// Layer 6 — ddG Oracle Adapter
// ============================================================
// The fitness oracle is a separate predictor (its own trained
// model, its own runtime). This adapter invokes it as a
// command, one structure pair per call:
//
//   {ddg_cmd} {reference_path} {candidate_path}
//
// and parses a single float from the last non-empty line of
// its stdout. Negative output means the candidate is
// predicted to bind better than the reference.
//
// Any failure — non-zero exit, unparseable output, spawn
// error — surfaces as an anyhow error; the selector maps it
// to a neutral score of 0 and keeps going.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::domain::traits::FitnessOracle;

pub struct DdgCommandOracle {
    /// Predictor command line; first token is the program
    command: String,
}

impl DdgCommandOracle {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl FitnessOracle for DdgCommandOracle {
    fn predict_ddg(&self, reference: &Path, candidate: &Path) -> Result<f64> {
        let mut tokens = self.command.split_whitespace();
        let program = tokens.next().context("ddg command is empty")?;

        let output = Command::new(program)
            .args(tokens)
            .arg(reference)
            .arg(candidate)
            .output()
            .with_context(|| format!("cannot run ddg predictor '{program}'"))?;

        if !output.status.success() {
            bail!(
                "ddg predictor exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_score(&stdout)
    }
}

/// The score is the last non-empty stdout line; predictors are
/// free to print progress above it.
fn parse_score(stdout: &str) -> Result<f64> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .context("ddg predictor printed nothing")?;
    line.parse::<f64>()
        .with_context(|| format!("ddg predictor printed a non-numeric score: '{line}'"))
}
