// ============================================================
// Layer 3 — Candidate & Round-State Domain Types
// ============================================================
// Value types flowing through one refinement round:
//
//   SampledCdr      — one raw model sample (sequence + frame)
//   InferenceOutput — everything one sampling call returned
//   ScoredCandidate — a derived complex with its ddG score,
//                     the unit stored in the training buffer
//   SelectionOutcome— the per-example selector result
//   LossPair        — the two coupled losses of a forward pass
//   RoundState      — running best-round bookkeeping
//
// All of these are plain data; behaviour lives in Layer 5.

use serde::{Deserialize, Serialize};

use crate::domain::complex::{Complex, Coord};

// ─── SampledCdr ───────────────────────────────────────────────────────────────
/// One sampled CDR redesign, straight from the model. Transient:
/// produced per sample and consumed immediately by filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampledCdr {
    /// Model-reported perplexity over the sequence; lower is
    /// more confident. The ranking key during selection.
    pub perplexity: f64,

    /// One-letter amino acid sequence of the redesigned loop
    pub sequence: String,

    /// Predicted atom coordinates, one row per residue in
    /// N, CA, C, O (+ optional centroid) order
    pub coords: Vec<Vec<Coord>>,

    /// Reference (input-frame) coordinates of the same residues,
    /// used as the alignment target when `aligned` is false
    pub ref_coords: Vec<Vec<Coord>>,
}

/// Everything one `infer` call produced for a replicated batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceOutput {
    pub samples: Vec<SampledCdr>,

    /// True if the model already emitted coordinates in the
    /// reference frame; false means the caller must align.
    pub aligned: bool,
}

// ─── ScoredCandidate ──────────────────────────────────────────────────────────
/// A derived complex paired with its predicted ddG. Score 0 marks
/// padding entries (the unmodified original).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub complex: Complex,
    pub score: f64,
}

/// The selector's result for one example: exactly `n_samples`
/// candidates (improving ones first, originals as padding), plus
/// the scores of the real acceptances for round statistics.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub candidates: Vec<ScoredCandidate>,
    pub accepted_scores: Vec<f64>,
}

// ─── LossPair ─────────────────────────────────────────────────────────────────
/// The two losses of the coupled forward pass: one per parameter
/// group (embedding sub-model, structure/sequence co-design
/// sub-model). Scalar values only — gradients stay model-side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LossPair {
    pub embedding: f64,
    pub codesign: f64,
}

// ─── RoundState ───────────────────────────────────────────────────────────────
/// Best-round bookkeeping across the whole run. The scores of
/// round `r` evaluate the model produced at the end of round
/// `r - 1`, so `best_round` starts at -1 (the pretrained model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    /// Round whose model produced the best mean so far
    pub best_round: i64,

    /// Best (lowest) mean ddG observed so far
    pub best_score: f64,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            best_round: -1,
            best_score: f64::INFINITY,
        }
    }

    /// Record round `round`'s mean score. Updates only on a
    /// strictly better (lower) mean, so `best_score` is
    /// monotonically non-increasing; NaN never updates.
    /// Returns true when the best improved.
    pub fn observe(&mut self, round: usize, mean_score: f64) -> bool {
        if mean_score < self.best_score {
            self.best_score = mean_score;
            self.best_round = round as i64 - 1;
            true
        } else {
            false
        }
    }
}

/// Mean and population standard deviation of a score list.
/// Empty input yields (NaN, NaN) so a round with no accepted
/// candidates still logs a line instead of failing.
pub fn mean_std(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
