// ============================================================
// Layer 3 — Antibody Complex Domain Types
// ============================================================
// The structural record at the heart of the system:
//   - A Complex is an antibody (heavy + light chain) plus
//     optional antigen chains, identified by a stable id
//   - Each chain is a sequence of residues with backbone
//     coordinates (N, CA, C, O) and an optional side-chain
//     centroid
//   - CDRs (complementarity-determining regions) are the
//     loops being redesigned; their positions are recorded
//     as inclusive index ranges into the owning chain
//
// A Complex is never mutated in place. Replacing a CDR
// derives a FRESH Complex: the new loop is substituted and
// both flanks are rigidly translated so the chain stays
// continuous at the splice points.
//
// Reference: Kabat/Chothia CDR numbering conventions
//            Rust Book §5 (Structs)

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// A single 3-D coordinate, in angstroms.
pub type Coord = [f64; 3];

/// Backbone atom order used throughout: N, CA, C, O.
/// CA (index 1) is the alignment atom.
pub const BACKBONE_ATOMS: usize = 4;
pub const CA: usize = 1;

// ─── Cdr ──────────────────────────────────────────────────────────────────────
/// Which CDR loop a model redesigns. H = heavy chain, L = light chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cdr {
    H1,
    H2,
    H3,
    L1,
    L2,
    L3,
}

impl Cdr {
    /// True if this CDR sits on the heavy chain.
    pub fn on_heavy_chain(&self) -> bool {
        matches!(self, Cdr::H1 | Cdr::H2 | Cdr::H3)
    }

    /// The key used in `Complex::cdr_ranges`, e.g. "H3".
    pub fn as_str(&self) -> &'static str {
        match self {
            Cdr::H1 => "H1",
            Cdr::H2 => "H2",
            Cdr::H3 => "H3",
            Cdr::L1 => "L1",
            Cdr::L2 => "L2",
            Cdr::L3 => "L3",
        }
    }
}

impl std::fmt::Display for Cdr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Residue ──────────────────────────────────────────────────────────────────
/// One amino acid: single-letter code plus backbone geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Residue {
    /// Single-letter amino acid code (e.g. 'G' for glycine)
    pub code: char,

    /// Backbone atom coordinates in N, CA, C, O order
    pub backbone: [Coord; 4],

    /// Side-chain centroid, when known. Absent for freshly
    /// generated residues (side chains are not placed here).
    pub sidechain_center: Option<Coord>,
}

impl Residue {
    /// The alpha-carbon position — the reference point for
    /// splice translations and rigid alignment.
    pub fn ca(&self) -> Coord {
        self.backbone[CA]
    }

    /// Rigidly translate every atom of this residue.
    pub fn translate(&mut self, t: Coord) {
        for atom in self.backbone.iter_mut() {
            atom[0] += t[0];
            atom[1] += t[1];
            atom[2] += t[2];
        }
        if let Some(center) = self.sidechain_center.as_mut() {
            center[0] += t[0];
            center[1] += t[1];
            center[2] += t[2];
        }
    }
}

// ─── Chain ────────────────────────────────────────────────────────────────────
/// An ordered run of residues belonging to one peptide chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub residues: Vec<Residue>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// One-letter sequence of the whole chain.
    pub fn sequence(&self) -> String {
        self.residues.iter().map(|r| r.code).collect()
    }

    /// CA position of residue `i`.
    pub fn ca(&self, i: usize) -> Option<Coord> {
        self.residues.get(i).map(|r| r.ca())
    }
}

// ─── Complex ──────────────────────────────────────────────────────────────────
/// An antibody-antigen complex. Immutable by convention:
/// derivations return a fresh owned record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complex {
    /// Stable identifier (typically the PDB id)
    pub id: String,

    /// All peptide chains, keyed by chain name
    pub chains: BTreeMap<String, Chain>,

    /// Name of the heavy chain within `chains`
    pub heavy_chain: String,

    /// Name of the light chain within `chains`
    pub light_chain: String,

    /// Names of the antigen chains, possibly empty
    pub antigen_chains: Vec<String>,

    /// Inclusive residue ranges of each annotated CDR,
    /// keyed by CDR name ("H1".."L3")
    pub cdr_ranges: BTreeMap<String, (usize, usize)>,

    /// Antigen residues in contact with the antibody, as
    /// (chain name, residue index) pairs. Computed at load
    /// time by the featurization side; not recomputed here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epitope: Option<Vec<(String, usize)>>,
}

impl Complex {
    /// The chain carrying the given CDR.
    pub fn cdr_chain_name(&self, cdr: Cdr) -> &str {
        if cdr.on_heavy_chain() {
            &self.heavy_chain
        } else {
            &self.light_chain
        }
    }

    /// Inclusive (start, end) residue range of the given CDR.
    pub fn cdr_range(&self, cdr: Cdr) -> Result<(usize, usize)> {
        self.cdr_ranges
            .get(cdr.as_str())
            .copied()
            .with_context(|| format!("complex '{}' has no {} annotation", self.id, cdr))
    }

    /// One-letter sequence of the given CDR loop.
    pub fn cdr_sequence(&self, cdr: Cdr) -> Result<String> {
        let (start, end) = self.cdr_range(cdr)?;
        let chain = self.chain(self.cdr_chain_name(cdr))?;
        Ok(chain.residues[start..=end].iter().map(|r| r.code).collect())
    }

    fn chain(&self, name: &str) -> Result<&Chain> {
        self.chains
            .get(name)
            .with_context(|| format!("complex '{}' has no chain '{}'", self.id, name))
    }

    /// Derive a new Complex with the given CDR replaced.
    ///
    /// `seq` is the new loop sequence; `coords[i]` holds the atom
    /// coordinates of residue `i` in N, CA, C, O order with an
    /// optional fifth side-chain centroid. Both must cover exactly
    /// the annotated CDR range.
    ///
    /// Flank handling: the left flank (everything before the CDR)
    /// is rigidly translated by the offset between the new and old
    /// first-CDR CA; the right flank by the offset at the last-CDR
    /// CA. The chain therefore stays continuous at both splice
    /// points while non-CDR internal geometry is preserved.
    pub fn with_cdr(&self, cdr: Cdr, seq: &str, coords: &[Vec<Coord>]) -> Result<Complex> {
        let chain_name = self.cdr_chain_name(cdr).to_string();
        let (start, end) = self.cdr_range(cdr)?;
        if start > end {
            bail!(
                "CDR {} of '{}' has an inverted range {}..={}",
                cdr,
                self.id,
                start,
                end
            );
        }
        let loop_len = end - start + 1;

        if seq.chars().count() != loop_len || coords.len() != loop_len {
            bail!(
                "CDR {} of '{}' spans {} residues, got sequence of {} and {} coordinate rows",
                cdr,
                self.id,
                loop_len,
                seq.chars().count(),
                coords.len()
            );
        }
        for (i, atoms) in coords.iter().enumerate() {
            if atoms.len() < BACKBONE_ATOMS {
                bail!("residue {} has {} atoms, need at least {}", i, atoms.len(), BACKBONE_ATOMS);
            }
        }

        let mut chains = self.chains.clone();
        let chain = chains
            .get_mut(&chain_name)
            .with_context(|| format!("complex '{}' has no chain '{}'", self.id, chain_name))?;
        if end >= chain.len() {
            bail!("CDR range {}..={} exceeds chain '{}' of length {}", start, end, chain_name, chain.len());
        }

        // Splice translations, measured at the CA atoms
        let old_start_ca = chain.residues[start].ca();
        let old_end_ca = chain.residues[end].ca();
        let new_start_ca = coords[0][CA];
        let new_end_ca = coords[loop_len - 1][CA];
        let start_trans = sub(new_start_ca, old_start_ca);
        let end_trans = sub(new_end_ca, old_end_ca);

        // Left flank follows the new loop start
        for res in chain.residues[..start].iter_mut() {
            res.translate(start_trans);
        }
        // Right flank follows the new loop end
        for res in chain.residues[end + 1..].iter_mut() {
            res.translate(end_trans);
        }
        // The loop itself is replaced outright
        for (offset, (code, atoms)) in seq.chars().zip(coords.iter()).enumerate() {
            chain.residues[start + offset] = Residue {
                code,
                backbone: [atoms[0], atoms[1], atoms[2], atoms[3]],
                sidechain_center: atoms.get(BACKBONE_ATOMS).copied(),
            };
        }

        Ok(Complex {
            id: self.id.clone(),
            chains,
            heavy_chain: self.heavy_chain.clone(),
            light_chain: self.light_chain.clone(),
            antigen_chains: self.antigen_chains.clone(),
            cdr_ranges: self.cdr_ranges.clone(),
            // Contact annotation is stale after a redesign; kept
            // as-is here, dropped by rederived() below.
            epitope: self.epitope.clone(),
        })
    }

    /// A minimal re-derivation of this record: chain geometry and
    /// CDR annotation only. Interface/contact recomputation is
    /// skipped; the epitope annotation is dropped.
    pub fn rederived(&self) -> Complex {
        Complex {
            id: self.id.clone(),
            chains: self.chains.clone(),
            heavy_chain: self.heavy_chain.clone(),
            light_chain: self.light_chain.clone(),
            antigen_chains: self.antigen_chains.clone(),
            cdr_ranges: self.cdr_ranges.clone(),
            epitope: None,
        }
    }
}

fn sub(a: Coord, b: Coord) -> Coord {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Straight-line chain along x with one residue per angstrom.
    fn test_complex(len: usize, cdr_start: usize, cdr_end: usize) -> Complex {
        let residues = (0..len)
            .map(|i| {
                let x = i as f64;
                Residue {
                    code: 'G',
                    backbone: [
                        [x, -0.5, 0.0],
                        [x, 0.0, 0.0],
                        [x, 0.5, 0.0],
                        [x, 1.0, 0.0],
                    ],
                    sidechain_center: None,
                }
            })
            .collect();

        let mut chains = BTreeMap::new();
        chains.insert("H".to_string(), Chain { residues });
        chains.insert("L".to_string(), Chain { residues: Vec::new() });

        let mut cdr_ranges = BTreeMap::new();
        cdr_ranges.insert("H3".to_string(), (cdr_start, cdr_end));

        Complex {
            id: "test".to_string(),
            chains,
            heavy_chain: "H".to_string(),
            light_chain: "L".to_string(),
            antigen_chains: Vec::new(),
            cdr_ranges,
            epitope: Some(vec![("A".to_string(), 3)]),
        }
    }

    fn loop_coords(offsets: &[f64]) -> Vec<Vec<Coord>> {
        offsets
            .iter()
            .map(|&x| {
                vec![
                    [x, -0.5, 1.0],
                    [x, 0.0, 1.0],
                    [x, 0.5, 1.0],
                    [x, 1.0, 1.0],
                ]
            })
            .collect()
    }

    #[test]
    fn test_with_cdr_replaces_loop() {
        let cplx = test_complex(10, 3, 5);
        let derived = cplx
            .with_cdr(Cdr::H3, "ARN", &loop_coords(&[3.0, 4.0, 5.0]))
            .unwrap();

        let chain = &derived.chains["H"];
        assert_eq!(chain.sequence(), "GGGARNGGGG");
        // New loop geometry is taken verbatim
        assert_eq!(chain.residues[4].ca(), [4.0, 0.0, 1.0]);
    }

    #[test]
    fn test_with_cdr_translates_flanks() {
        let cplx = test_complex(10, 3, 5);
        // New loop CA endpoints are shifted by +1 in z
        let derived = cplx
            .with_cdr(Cdr::H3, "ARN", &loop_coords(&[3.0, 4.0, 5.0]))
            .unwrap();

        let chain = &derived.chains["H"];
        // Left flank moved by new_start_ca - old_start_ca = (0,0,1)
        assert_eq!(chain.residues[0].ca(), [0.0, 0.0, 1.0]);
        assert_eq!(chain.residues[2].ca(), [2.0, 0.0, 1.0]);
        // Right flank moved by the end-splice offset, also (0,0,1)
        assert_eq!(chain.residues[9].ca(), [9.0, 0.0, 1.0]);
        // Internal flank geometry preserved up to the rigid shift
        let d01 = chain.residues[1].ca()[0] - chain.residues[0].ca()[0];
        assert_eq!(d01, 1.0);
    }

    #[test]
    fn test_with_cdr_does_not_touch_original() {
        let cplx = test_complex(10, 3, 5);
        let _ = cplx
            .with_cdr(Cdr::H3, "ARN", &loop_coords(&[3.0, 4.0, 5.0]))
            .unwrap();
        // Derivation never mutates the source record
        assert_eq!(cplx.chains["H"].sequence(), "GGGGGGGGGG");
        assert_eq!(cplx.chains["H"].residues[0].ca(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_with_cdr_length_mismatch() {
        let cplx = test_complex(10, 3, 5);
        assert!(cplx.with_cdr(Cdr::H3, "AR", &loop_coords(&[3.0, 4.0])).is_err());
    }

    #[test]
    fn test_with_cdr_inverted_range() {
        // An inverted annotation in the eval-set file must error,
        // not panic.
        let cplx = test_complex(10, 5, 3);
        let err = cplx
            .with_cdr(Cdr::H3, "ARN", &loop_coords(&[3.0, 4.0, 5.0]))
            .unwrap_err();
        assert!(err.to_string().contains("inverted range"));
    }

    #[test]
    fn test_rederived_drops_epitope() {
        let cplx = test_complex(10, 3, 5);
        assert!(cplx.epitope.is_some());
        let minimal = cplx.rederived();
        assert!(minimal.epitope.is_none());
        assert_eq!(minimal.chains["H"].sequence(), cplx.chains["H"].sequence());
    }

    #[test]
    fn test_cdr_sequence() {
        let cplx = test_complex(10, 3, 5);
        assert_eq!(cplx.cdr_sequence(Cdr::H3).unwrap(), "GGG");
    }
}
