// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the eval-set files on disk and the
// micro-batches the training loop consumes:
//
//   eval set (JSON)
//       │
//       ▼
//   loader            → parses the complexes to be optimized
//       │
//       ▼
//   TrainingBuffer    → per-example candidate sets with
//       │               two-phase stage/commit updates
//       ▼
//   TrainLoader       → sequential micro-batches, optional
//                       background prefetch
//
// Each module is responsible for exactly one step.

/// Loads the evaluation set of antibody complexes
pub mod loader;

/// Per-example candidate sets with two-phase commit
pub mod buffer;

/// Sequential micro-batch iteration with optional prefetch
pub mod batcher;
