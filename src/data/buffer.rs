// ============================================================
// Layer 4 — Training Buffer
// ============================================================
// The mutable training signal of the self-training loop.
//
// Wraps the base evaluation set and holds, per original
// example, the currently committed set of exactly `n_samples`
// scored candidates. Training iterates over the committed
// candidates; the originals stay untouched for candidate
// generation and as the oracle's reference structures.
//
// Updates are two-phase:
//   stage(i, candidates) — recorded into a pending slot;
//   commit()             — swaps every staged slot into the
//                          active area at once.
// A training pass therefore never observes a half-updated
// buffer mixing candidates generated under different model
// states.
//
// The active area starts as `n_samples` copies of each
// original at score 0, so the exactly-N invariant holds even
// when round 0 fails to generate candidates for an example.

use crate::domain::candidate::ScoredCandidate;
use crate::domain::complex::Complex;

pub struct TrainingBuffer {
    /// The base dataset: one original complex per example
    originals: Vec<Complex>,

    /// Candidates per original example in the buffer
    n_samples: usize,

    /// Currently committed candidate sets, indexed by example
    active: Vec<Vec<ScoredCandidate>>,

    /// Staged-but-uncommitted candidate sets
    pending: Vec<Option<Vec<ScoredCandidate>>>,
}

impl TrainingBuffer {
    pub fn new(originals: Vec<Complex>, n_samples: usize) -> Self {
        assert!(n_samples > 0, "buffer needs at least one candidate slot");
        let active = originals
            .iter()
            .map(|cplx| {
                vec![
                    ScoredCandidate {
                        complex: cplx.clone(),
                        score: 0.0,
                    };
                    n_samples
                ]
            })
            .collect();
        let pending = vec![None; originals.len()];
        Self {
            originals,
            n_samples,
            active,
            pending,
        }
    }

    /// Number of original examples.
    pub fn example_count(&self) -> usize {
        self.originals.len()
    }

    /// Number of trainable items (`example_count * n_samples`).
    pub fn len(&self) -> usize {
        self.originals.len() * self.n_samples
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn original(&self, i: usize) -> &Complex {
        &self.originals[i]
    }

    pub fn originals(&self) -> &[Complex] {
        &self.originals
    }

    /// The committed candidate at logical index `idx`, laid out
    /// example-major: idx = example * n_samples + slot.
    pub fn get(&self, idx: usize) -> Option<&ScoredCandidate> {
        let example = idx / self.n_samples;
        let slot = idx % self.n_samples;
        self.active.get(example)?.get(slot)
    }

    /// Committed candidates of one example.
    pub fn candidates(&self, i: usize) -> &[ScoredCandidate] {
        &self.active[i]
    }

    /// Stage a fresh candidate set for example `i`. Not visible
    /// to readers until `commit`. Exactly `n_samples` entries
    /// are required — the selector pads before staging.
    pub fn stage(&mut self, i: usize, candidates: Vec<ScoredCandidate>) {
        assert_eq!(
            candidates.len(),
            self.n_samples,
            "staged candidate set for example {i} must have exactly n_samples entries"
        );
        self.pending[i] = Some(candidates);
    }

    /// Swap every staged slot into the active area at once and
    /// clear the pending area. Examples that were never staged
    /// this sweep keep their previous candidates.
    pub fn commit(&mut self) {
        let mut swapped = 0usize;
        for (i, slot) in self.pending.iter_mut().enumerate() {
            if let Some(candidates) = slot.take() {
                self.active[i] = candidates;
                swapped += 1;
            }
        }
        tracing::debug!(
            "Buffer commit: {} of {} examples refreshed",
            swapped,
            self.originals.len()
        );
    }

    /// Snapshot of every committed candidate complex, in buffer
    /// order, for the training phase to batch over.
    pub fn training_items(&self) -> Vec<Complex> {
        self.active
            .iter()
            .flat_map(|set| set.iter().map(|c| c.complex.clone()))
            .collect()
    }
}
