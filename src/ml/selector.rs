// ============================================================
// Layer 5 — Candidate Selector
// ============================================================
// The per-example pipeline of one refinement round:
//
//   1. Replicate the example n_tries times, sample the model
//      once on the whole batch (stochastic decoding)
//   2. Per sample, in order: drop duplicates (first occurrence
//      of a sequence wins), drop high-perplexity samples,
//      drop validity failures, align the frame if the model
//      did not
//   3. Rank the surviving pool by ascending perplexity —
//      confidence, not fitness, decides evaluation order
//   4. Walk the ranked pool: derive the candidate complex,
//      persist it, score it against the original with the
//      ddG oracle, accept only strictly-negative (improving)
//      scores; stop at n_samples acceptances
//   5. Pad with the unmodified original (score 0) until the
//      set holds exactly n_samples entries
//
// Failure semantics: a sampling failure skips the whole
// example for this round (Ok(None)); an oracle failure scores
// that candidate 0, which can never be accepted. Neither
// aborts the round.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use rand::rngs::StdRng;

use crate::domain::candidate::{ScoredCandidate, SelectionOutcome};
use crate::domain::complex::{Complex, Coord};
use crate::domain::traits::{FitnessOracle, GenerativeModel, StructureStore};
use crate::domain::validity;
use crate::ml::align;

/// Samples with a perplexity above this are never considered.
const MAX_PERPLEXITY: f64 = 10.0;

/// One pool entry surviving the filters, ready for scoring.
struct PoolEntry {
    perplexity: f64,
    sequence: String,
    coords: Vec<Vec<Coord>>,
    /// Index of the originating sample within the batch,
    /// used to tag the persisted structure file
    sample_idx: usize,
}

pub struct CandidateSelector {
    /// How many redesigns to sample per example
    n_tries: usize,

    /// How many candidates to accept per example
    n_samples: usize,
}

impl CandidateSelector {
    pub fn new(n_tries: usize, n_samples: usize) -> Self {
        assert!(n_tries > 0 && n_samples > 0);
        Self { n_tries, n_samples }
    }

    /// Run the full pipeline for one example. Returns Ok(None)
    /// when sampling failed and the example is skipped for this
    /// round; otherwise exactly `n_samples` candidates plus the
    /// scores of the real (non-padding) acceptances.
    #[allow(clippy::too_many_arguments)]
    pub fn select<M, O, S>(
        &self,
        origin: &Complex,
        origin_path: &Path,
        round_dir: &Path,
        model: &mut M,
        oracle: &O,
        store: &S,
        rng: &mut StdRng,
    ) -> Result<Option<SelectionOutcome>>
    where
        M: GenerativeModel,
        O: FitnessOracle,
        S: StructureStore,
    {
        // ── Step 1: stochastic sampling on the replicated batch ───────────────
        let batch: Vec<Complex> = std::iter::repeat(origin)
            .cloned()
            .take(self.n_tries)
            .collect();
        let output = match model.infer(&batch, false, rng) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Sampling failed for '{}', skipping example: {e:#}", origin.id);
                return Ok(None);
            }
        };

        // ── Step 2: dedup, perplexity cutoff, validity, alignment ─────────────
        let mut seen: HashSet<String> = HashSet::new();
        let mut pool: Vec<PoolEntry> = Vec::new();
        for (sample_idx, sample) in output.samples.into_iter().enumerate() {
            if !seen.insert(sample.sequence.clone()) {
                continue;
            }
            if sample.perplexity > MAX_PERPLEXITY {
                tracing::debug!(
                    "'{}' sample {}: perplexity {:.2} too high, skip",
                    origin.id,
                    sample_idx,
                    sample.perplexity
                );
                continue;
            }
            let report = validity::check(&sample.sequence);
            if !report.is_valid() {
                tracing::debug!(
                    "'{}' sample {} '{}': validity check failed ({:?}), skip",
                    origin.id,
                    sample_idx,
                    sample.sequence,
                    report
                );
                continue;
            }
            let coords = if output.aligned {
                sample.coords
            } else {
                match align::align_to_reference(&sample.coords, &sample.ref_coords) {
                    Ok(coords) => coords,
                    Err(e) => {
                        tracing::warn!(
                            "'{}' sample {}: alignment failed, skip: {e:#}",
                            origin.id,
                            sample_idx
                        );
                        continue;
                    }
                }
            };
            pool.push(PoolEntry {
                perplexity: sample.perplexity,
                sequence: sample.sequence,
                coords,
                sample_idx,
            });
        }

        // ── Step 3: rank by confidence ────────────────────────────────────────
        pool.sort_by(|a, b| a.perplexity.total_cmp(&b.perplexity));

        // ── Step 4: derive, persist, score, accept ────────────────────────────
        let cdr = model.cdr();
        let mut candidates: Vec<ScoredCandidate> = Vec::with_capacity(self.n_samples);
        let mut accepted_scores: Vec<f64> = Vec::new();
        for entry in &pool {
            let derived = match origin.with_cdr(cdr, &entry.sequence, &entry.coords) {
                Ok(derived) => derived,
                Err(e) => {
                    tracing::warn!(
                        "'{}' sample {}: CDR replacement failed, skip: {e:#}",
                        origin.id,
                        entry.sample_idx
                    );
                    continue;
                }
            };
            // Disk errors propagate: they are environment failures,
            // not part of the selection contract.
            let candidate_path = store.write(&derived, round_dir, Some(entry.sample_idx))?;

            let score = match oracle.predict_ddg(origin_path, &candidate_path) {
                Ok(score) => score,
                Err(e) => {
                    tracing::error!("ddg prediction failed for '{}': {e:#}", origin.id);
                    0.0
                }
            };
            if score < 0.0 {
                candidates.push(ScoredCandidate {
                    // Interface recomputation intentionally skipped
                    complex: derived.rederived(),
                    score,
                });
                accepted_scores.push(score);
            }
            if candidates.len() >= self.n_samples {
                break;
            }
        }

        // ── Step 5: pad with the unmodified original ──────────────────────────
        while candidates.len() < self.n_samples {
            candidates.push(ScoredCandidate {
                complex: origin.clone(),
                score: 0.0,
            });
        }

        Ok(Some(SelectionOutcome {
            candidates,
            accepted_scores,
        }))
    }
}
