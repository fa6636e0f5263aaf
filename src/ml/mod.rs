// ============================================================
// Layer 5 — ML / Pipeline Layer
// ============================================================
// The stochastic and numeric heart of the refinement loop.
// Everything that talks to the generative model lives here;
// no other layer sends it a request.
//
// What's in this layer:
//
//   model.rs    — ProcessModel, the line-delimited JSON
//                 bridge to the external model server that
//                 owns the network weights and optimizers
//
//   align.rs    — Kabsch rigid-body alignment of a predicted
//                 CDR backbone onto its reference frame
//
//   selector.rs — the per-example candidate pipeline:
//                 sample → dedup → perplexity cutoff →
//                 validity screen → align → rank → score →
//                 accept/pad
//
//   trainer.rs  — the joint optimization loop: gradient
//                 accumulation across micro-batches with
//                 synchronized flushes for both parameter
//                 groups
//
// Reference: Kabsch (1976) A solution for the best rotation

/// Bridge to the external model server process
pub mod model;

/// Kabsch rigid-body alignment
pub mod align;

/// Per-example candidate generation and selection
pub mod selector;

/// Joint two-group optimization loop
pub mod trainer;
