// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// the refinement run.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct database/file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Think of this layer as the "director" — it tells other
// layers what to do but doesn't do the work itself.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The iterative refinement workflow
pub mod refine_use_case;
