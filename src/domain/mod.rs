// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust value types and traits defining what the system
// talks about: antibody complexes, sampled candidates, the
// validity screen, and the collaborator seams.
//
// Rules for this layer:
//   - NO process spawning or file I/O
//   - NO pipeline control flow
//   - Only plain structs, enums, traits, and pure functions
//
// Why keep this layer pure?
//   - Unit testable without a model server or oracle binary
//   - Every other layer can depend on it without cycles
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Antibody complex, chains, residues, CDR derivation
pub mod complex;

// Sampled candidates, scored candidates, round-state bookkeeping
pub mod candidate;

// Heuristic sequence validity screen (charge, motif, repeats)
pub mod validity;

// Collaborator seams: model, fitness oracle, structure store
pub mod traits;
