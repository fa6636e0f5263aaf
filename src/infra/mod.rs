// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs       — Run config and per-round weights
//                         Writes run_config.json once, and asks
//                         the model process to persist each
//                         parameter group after every round.
//
//   round_log.rs        — Per-round progress log
//                         Appends one human-readable line per
//                         round (ddg mean/std, running best)
//                         to {save_dir}/log.txt.
//
//   oracle.rs           — External ddG predictor
//                         Runs the configured command on a
//                         reference/candidate file pair and
//                         parses the predicted score.
//
//   structure_store.rs  — Complex persistence
//                         Serialises complexes as JSON files
//                         keyed by id, with a sample tag for
//                         candidates within a round.
//
// Why is this a separate layer?
//   These concerns are used by multiple other layers but
//   don't belong to any one of them. Keeping them here:
//   - Prevents duplication across layers
//   - Makes it easy to swap implementations
//     (e.g. swap JSON structures for a real PDB writer)
//   - Keeps other layers focused on their core logic
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Run config and per-round checkpoint management
pub mod checkpoint;

/// External ddG prediction command
pub mod oracle;

/// Append-only per-round progress log
pub mod round_log;

/// JSON persistence of complexes
pub mod structure_store;
