// ============================================================
// Layer 6 — Structure Store
// ============================================================
// File persistence for antibody complexes.
//
// Structures are written as the serde form of the domain
// record, one file per complex:
//
//   {dir}/{id}.json       — e.g. the per-run originals
//   {dir}/{id}_{n}.json   — round candidates, tagged with the
//                           originating sample index
//
// The ddG oracle consumes these paths; the on-disk format is
// this store's contract with it. Crystallographic formats are
// converted upstream by the featurization tooling.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::complex::Complex;
use crate::domain::traits::StructureStore;

pub struct JsonStructureStore;

impl JsonStructureStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonStructureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureStore for JsonStructureStore {
    fn write(&self, complex: &Complex, dir: &Path, sample_tag: Option<usize>) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create structure directory '{}'", dir.display()))?;

        let name = match sample_tag {
            Some(n) => format!("{}_{n}.json", complex.id),
            None => format!("{}.json", complex.id),
        };
        let path = dir.join(name);

        let json = serde_json::to_string(complex)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write structure '{}'", path.display()))?;

        // Oracle invocations may run from another working
        // directory, so hand back an absolute path.
        let absolute = path
            .canonicalize()
            .with_context(|| format!("cannot resolve '{}'", path.display()))?;
        tracing::debug!("Wrote structure '{}'", absolute.display());
        Ok(absolute)
    }
}
