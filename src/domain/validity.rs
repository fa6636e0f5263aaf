// ============================================================
// Layer 3 — Sequence Validity Filter
// ============================================================
// Heuristic developability screen applied to every sampled
// CDR sequence before it is ever scored. Three independent
// checks, all of which must pass:
//
//   1. Charge balance — net charge within [-2, +2]
//      R, K count +1, H counts +0.1, D and E count -1
//   2. Motif exclusion — no N-X-S and no N-X-T window
//      (the N-glycosylation liability motif)
//   3. Repeat limit — no residue repeated more than 5
//      times in a row
//
// The result keeps all three booleans so a caller can log
// which check rejected a sequence, not just that one did.

use serde::{Deserialize, Serialize};

/// Longest allowed run of one residue type.
const MAX_REPEAT_RUN: usize = 5;

/// Inclusive net-charge window a sequence must stay within.
const CHARGE_MIN: f64 = -2.0;
const CHARGE_MAX: f64 = 2.0;

// ─── ValidityReport ───────────────────────────────────────────────────────────
/// Outcome of the three checks for one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityReport {
    /// Net charge within [-2.0, +2.0]
    pub charge_ok: bool,

    /// No N-X-S/T glycosylation window found
    pub motif_ok: bool,

    /// No residue run longer than 5
    pub repeat_ok: bool,
}

impl ValidityReport {
    /// All three checks passed.
    pub fn is_valid(&self) -> bool {
        self.charge_ok && self.motif_ok && self.repeat_ok
    }
}

/// Run the full validity screen on a one-letter sequence.
///
/// Pure function of the sequence contents: same input, same
/// report, regardless of call order.
pub fn check(seq: &str) -> ValidityReport {
    ValidityReport {
        charge_ok: charge_check(seq),
        motif_ok: motif_check(seq),
        repeat_ok: repeat_check(seq),
    }
}

/// Convenience wrapper when only the combined verdict matters.
pub fn is_valid(seq: &str) -> bool {
    check(seq).is_valid()
}

/// Net charge within [-2.0, +2.0]. Arginine and lysine are
/// fully basic, histidine weakly so, aspartate and glutamate
/// acidic; everything else is neutral.
fn charge_check(seq: &str) -> bool {
    let mut charge = 0.0f64;
    for res in seq.chars() {
        match res {
            'R' | 'K' => charge += 1.0,
            'H' => charge += 0.1,
            'D' | 'E' => charge -= 1.0,
            _ => {}
        }
    }
    (CHARGE_MIN..=CHARGE_MAX).contains(&charge)
}

/// Reject any 3-residue window of the form N-X-S or N-X-T.
/// The middle residue is unconstrained.
fn motif_check(seq: &str) -> bool {
    let residues: Vec<char> = seq.chars().collect();
    for window in residues.windows(3) {
        if window[0] == 'N' && (window[2] == 'S' || window[2] == 'T') {
            return false;
        }
    }
    true
}

/// Reject any run of a single residue longer than 5.
fn repeat_check(seq: &str) -> bool {
    let mut longest = 0usize;
    let mut run = 0usize;
    let mut previous = None;
    for res in seq.chars() {
        if Some(res) == previous {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
        previous = Some(res);
    }
    longest <= MAX_REPEAT_RUN
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        // Same sequence, same verdict, every time
        let seq = "ARDYKGNQ";
        let first = check(seq);
        for _ in 0..10 {
            assert_eq!(check(seq), first);
        }
    }

    #[test]
    fn test_charge_boundary() {
        // Three basic residues → charge 3.0 → rejected
        assert!(!check("RKR").charge_ok);
        // Two basic residues → charge 2.0 → exactly on the edge, passes
        assert!(check("RKG").charge_ok);
        // Symmetric on the acidic side
        assert!(!check("DED").charge_ok);
        assert!(check("DEG").charge_ok);
    }

    #[test]
    fn test_histidine_weak_charge() {
        // 2 basic + 1 histidine = 2.1 → out of range
        assert!(!check("RKH").charge_ok);
        // 1 basic + 1 histidine = 1.1 → in range
        assert!(check("RHG").charge_ok);
    }

    #[test]
    fn test_motif_boundary() {
        // N-X-S fails regardless of X
        assert!(!check("NGS").motif_ok);
        assert!(!check("NAS").motif_ok);
        // N-X-T also fails
        assert!(!check("NGT").motif_ok);
        // N-X-<anything else> passes
        assert!(check("NGA").motif_ok);
        // Motif must start with N
        assert!(check("QGS").motif_ok);
        // Found anywhere in the sequence
        assert!(!check("GGNGSGG").motif_ok);
    }

    #[test]
    fn test_repeat_boundary() {
        // Run of exactly 6 fails
        assert!(!check("GGGGGG").repeat_ok);
        // Run of exactly 5 passes
        assert!(check("GGGGG").repeat_ok);
        // Interrupted runs reset the counter
        assert!(check("GGGAGGG").repeat_ok);
    }

    #[test]
    fn test_checks_are_independent() {
        // Fails charge, passes motif and repeat
        let report = check("RRR");
        assert!(!report.charge_ok);
        assert!(report.motif_ok);
        assert!(report.repeat_ok);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_empty_sequence_valid() {
        assert!(is_valid(""));
    }
}
