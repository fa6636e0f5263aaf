// ============================================================
// Layer 3 — Core Traits (Collaborator Seams)
// ============================================================
// The refinement pipeline coordinates three external
// collaborators. Each is a trait here so the pipeline can be
// exercised against stubs in tests and against the process
// adapters (Layer 5/6) in production:
//
//   - GenerativeModel — the structure-conditioned sequence
//     generator being improved. Sampling, the coupled forward
//     pass, and the two optimizers live behind this seam; the
//     loop only controls WHEN gradients flush.
//   - FitnessOracle   — predicted binding-affinity change
//     (ddG) between two structure files; negative improves.
//   - StructureStore  — persistence of complexes keyed by id;
//     the on-disk format is the store's contract.
//
// This is the Dependency Inversion Principle from SOLID,
// applied using Rust's trait system.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::rngs::StdRng;

use crate::domain::candidate::{InferenceOutput, LossPair};
use crate::domain::complex::{Cdr, Complex};

// ─── ParamGroup ───────────────────────────────────────────────────────────────
/// The two independently-optimized parameter sets of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// The embedding/language sub-model
    Embedding,

    /// The structure/sequence co-design sub-model. The only
    /// group whose gradient norm is clipped before a step.
    Codesign,
}

impl ParamGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamGroup::Embedding => "embedding",
            ParamGroup::Codesign => "codesign",
        }
    }
}

// ─── GenerativeModel ──────────────────────────────────────────────────────────
/// The generator under refinement. One implementation is the
/// external model-server bridge (`ml::model::ProcessModel`);
/// tests use in-memory stubs.
pub trait GenerativeModel {
    /// Which CDR this model redesigns (e.g. H3).
    fn cdr(&self) -> Cdr;

    /// Switch between training mode (dropout on, gradients
    /// recorded) and evaluation mode.
    fn set_training(&mut self, training: bool) -> Result<()>;

    /// Sample one redesign per batch entry. `greedy = false`
    /// requests stochastic decoding; the explicit RNG carries
    /// the run's seeded state into sampling.
    fn infer(
        &mut self,
        batch: &[Complex],
        greedy: bool,
        rng: &mut StdRng,
    ) -> Result<InferenceOutput>;

    /// (Re)create both optimizers at the given learning rate.
    /// Called at the start of every round's training phase.
    fn init_optimizers(&mut self, lr: f64) -> Result<()>;

    /// Run the coupled forward pass on one micro-batch, scale
    /// both losses by `loss_scale`, and ACCUMULATE gradients
    /// for both groups (additive — nothing is zeroed here).
    /// Returns the scaled scalar losses for bookkeeping.
    fn forward_backward(&mut self, batch: &[Complex], loss_scale: f64) -> Result<LossPair>;

    /// Clip the accumulated gradient norm of one group.
    fn clip_grad_norm(&mut self, group: ParamGroup, max_norm: f64) -> Result<()>;

    /// Apply one optimizer step to one group.
    fn optimizer_step(&mut self, group: ParamGroup) -> Result<()>;

    /// Zero one group's accumulated gradients.
    fn zero_grad(&mut self, group: ParamGroup) -> Result<()>;

    /// Persist one group's current parameters to `path`.
    fn save_group(&mut self, group: ParamGroup, path: &Path) -> Result<()>;
}

// ─── FitnessOracle ────────────────────────────────────────────────────────────
/// Predicted change in binding free energy between an original
/// and a candidate structure file. Negative means the candidate
/// binds better. May fail on malformed structures; the caller
/// treats a failure as a neutral score.
pub trait FitnessOracle {
    fn predict_ddg(&self, reference: &Path, candidate: &Path) -> Result<f64>;
}

// ─── StructureStore ───────────────────────────────────────────────────────────
/// Read/write of structure files keyed by complex id. A sample
/// tag distinguishes multiple candidates of the same complex
/// within one round directory.
pub trait StructureStore {
    /// Write `complex` under `dir`, returning the absolute path
    /// of the written file.
    fn write(&self, complex: &Complex, dir: &Path, sample_tag: Option<usize>) -> Result<PathBuf>;
}
