// ============================================================
// Layer 4 — Evaluation-Set Loader
// ============================================================
// Loads the set of antibody complexes to be optimized.
//
// Two layouts are accepted:
//   - a single JSON file holding an array of complexes
//   - a directory of *.json files, one complex each
//
// The JSON schema is the serde form of `domain::complex::Complex`.
// Parsing of raw crystallographic formats happens upstream in
// the featurization tooling; by the time a run starts, the eval
// set is already in this normalized form.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::domain::complex::Complex;

/// Load every complex of the evaluation set, in a stable order.
pub fn load_eval_set(path: impl AsRef<Path>) -> Result<Vec<Complex>> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("eval set '{}' does not exist", path.display());
    }

    let complexes = if path.is_dir() {
        load_directory(path)?
    } else {
        load_file(path)?
    };

    if complexes.is_empty() {
        bail!("eval set '{}' contains no complexes", path.display());
    }

    tracing::info!(
        "Loaded {} complexes from '{}'",
        complexes.len(),
        path.display()
    );
    Ok(complexes)
}

/// A single file holding a JSON array of complexes.
fn load_file(path: &Path) -> Result<Vec<Complex>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read eval set '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse eval set '{}'", path.display()))
}

/// A directory of per-complex JSON files, loaded in filename
/// order so example indices are reproducible across runs.
fn load_directory(dir: &Path) -> Result<Vec<Complex>> {
    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("cannot read directory '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut complexes = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let complex: Complex = serde_json::from_str(&raw)
            .with_context(|| format!("cannot parse '{}'", path.display()))?;
        tracing::debug!("Loaded complex '{}' from '{}'", complex.id, path.display());
        complexes.push(complex);
    }
    Ok(complexes)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tiny_complex(id: &str) -> Complex {
        let mut chains = BTreeMap::new();
        chains.insert(
            "H".to_string(),
            crate::domain::complex::Chain { residues: Vec::new() },
        );
        Complex {
            id: id.to_string(),
            chains,
            heavy_chain: "H".to_string(),
            light_chain: "H".to_string(),
            antigen_chains: Vec::new(),
            cdr_ranges: BTreeMap::new(),
            epitope: None,
        }
    }

    #[test]
    fn test_load_array_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.json");
        let set = vec![tiny_complex("1abc"), tiny_complex("2def")];
        fs::write(&path, serde_json::to_string(&set).unwrap()).unwrap();

        let loaded = load_eval_set(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "1abc");
    }

    #[test]
    fn test_load_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for id in ["2def", "1abc"] {
            let path = dir.path().join(format!("{id}.json"));
            fs::write(&path, serde_json::to_string(&tiny_complex(id)).unwrap()).unwrap();
        }

        let loaded = load_eval_set(dir.path()).unwrap();
        // Filename order, not insertion order
        assert_eq!(loaded[0].id, "1abc");
        assert_eq!(loaded[1].id, "2def");
    }

    #[test]
    fn test_missing_path_errors() {
        assert!(load_eval_set("/nonexistent/eval.json").is_err());
    }

    #[test]
    fn test_empty_set_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_eval_set(dir.path()).is_err());
    }
}
