// ============================================================
// Layer 5 — Structural Aligner (Kabsch)
// ============================================================
// Least-squares rigid-body superposition of a predicted CDR
// backbone onto its reference frame. Used only when the model
// reports that its output is NOT already frame-aligned.
//
// The fit runs on the CA atoms alone (one per residue); the
// resulting transform is then applied to the FULL predicted
// atom set, recentered around the predicted set's fitted
// centroid before rotating and re-translating:
//
//   p' = R * (p - centroid_mobile) + centroid_reference
//
// where R minimizes the RMSD between predicted and reference
// CA positions.
//
// Algorithm (Kabsch 1976):
//   1. Center both CA sets on their centroids
//   2. Covariance H = P^T * Q
//   3. SVD: H = U * S * V^T
//   4. R = V * U^T, with the last row of V^T sign-flipped
//      when det(R) < 0 (reflection guard)
//
// Equal-length, non-degenerate point sets are required; fewer
// than 3 points, or a collinear set (rank-deficient covariance,
// leaving the rotation about the point axis unconstrained), is
// rejected with an error.

use anyhow::{bail, Result};
use nalgebra::{Matrix3, Vector3, SVD};

use crate::domain::complex::{Coord, CA};

/// Rigid transform fitted from predicted onto reference CAs.
/// Applies as p' = R * (p - centroid_mobile) + centroid_ref.
#[derive(Debug, Clone)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub centroid_mobile: Vector3<f64>,
    pub centroid_ref: Vector3<f64>,
}

impl RigidTransform {
    pub fn apply(&self, p: Coord) -> Coord {
        let centered = Vector3::new(p[0], p[1], p[2]) - self.centroid_mobile;
        let out = self.rotation * centered + self.centroid_ref;
        [out[0], out[1], out[2]]
    }
}

/// Fit the rotation and translation that superpose `mobile`
/// onto `reference` with minimal RMSD. The translation maps a
/// mobile-centroid-centered point into the reference frame.
pub fn kabsch_fit(mobile: &[Coord], reference: &[Coord]) -> Result<RigidTransform> {
    if mobile.len() != reference.len() {
        bail!(
            "point sets must have equal length: {} vs {}",
            mobile.len(),
            reference.len()
        );
    }
    if mobile.len() < 3 {
        bail!("need at least 3 points for a rigid fit, got {}", mobile.len());
    }

    let cent_mob = centroid(mobile);
    let cent_ref = centroid(reference);

    // Covariance of the centered point sets: H = P^T * Q
    let mut h = Matrix3::<f64>::zeros();
    for (p, q) in mobile.iter().zip(reference.iter()) {
        let p = Vector3::new(p[0], p[1], p[2]) - cent_mob;
        let q = Vector3::new(q[0], q[1], q[2]) - cent_ref;
        for i in 0..3 {
            for j in 0..3 {
                h[(i, j)] += p[i] * q[j];
            }
        }
    }

    let svd = SVD::new(h, true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        bail!("SVD of the covariance matrix did not converge");
    };

    // A collinear (or coincident) point set drops the covariance
    // below rank 2 and leaves the fitted rotation arbitrary about
    // the point axis.
    let max_sv = svd.singular_values.max();
    let rank = svd
        .singular_values
        .iter()
        .filter(|&&s| s > max_sv * 1e-8)
        .count();
    if rank < 2 {
        bail!("degenerate point set: covariance rank {rank}, cannot fit a rotation");
    }

    let mut rotation = v_t.transpose() * u.transpose();
    if rotation.determinant() < 0.0 {
        // Reflection: flip the last row of V^T and rebuild
        let mut v_t = v_t;
        for j in 0..3 {
            v_t[(2, j)] = -v_t[(2, j)];
        }
        rotation = v_t.transpose() * u.transpose();
    }

    Ok(RigidTransform {
        rotation,
        centroid_mobile: cent_mob,
        centroid_ref: cent_ref,
    })
}

/// Align a predicted per-residue coordinate set to its
/// reference. The fit uses the CA atoms only; the transform is
/// then applied to every atom of every residue.
pub fn align_to_reference(
    coords: &[Vec<Coord>],
    ref_coords: &[Vec<Coord>],
) -> Result<Vec<Vec<Coord>>> {
    let mobile_ca: Vec<Coord> = coords.iter().map(|atoms| atoms[CA]).collect();
    let ref_ca: Vec<Coord> = ref_coords.iter().map(|atoms| atoms[CA]).collect();
    let transform = kabsch_fit(&mobile_ca, &ref_ca)?;

    Ok(coords
        .iter()
        .map(|atoms| atoms.iter().map(|&a| transform.apply(a)).collect())
        .collect())
}

/// RMSD between two equal-length point sets, no alignment.
pub fn rmsd(a: &[Coord], b: &[Coord]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return f64::NAN;
    }
    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| {
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            let dz = p[2] - q[2];
            dx * dx + dy * dy + dz * dz
        })
        .sum();
    (sum_sq / a.len() as f64).sqrt()
}

fn centroid(points: &[Coord]) -> Vector3<f64> {
    let mut sum = Vector3::zeros();
    for p in points {
        sum += Vector3::new(p[0], p[1], p[2]);
    }
    sum / points.len() as f64
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// An asymmetric backbone-ish point cloud. The CA atoms wind
    /// around the chain axis so the CA-only fit is well posed.
    fn reference_residues() -> Vec<Vec<Coord>> {
        (0..6)
            .map(|i| {
                let x = i as f64 * 1.5;
                let y = (i as f64 * 0.9).sin();
                let z = (i as f64 * 0.7).cos();
                vec![
                    [x, y + 0.3, z - 0.2],
                    [x + 0.4, y + 1.0, z + 0.1],
                    [x + 0.9, y + 0.2, z + 0.5],
                    [x + 1.1, y - 0.6, z + 0.3],
                ]
            })
            .collect()
    }

    /// Rotate around z by `angle` and shift by `t`.
    fn transformed(residues: &[Vec<Coord>], angle: f64, t: Coord) -> Vec<Vec<Coord>> {
        let (sin, cos) = angle.sin_cos();
        residues
            .iter()
            .map(|atoms| {
                atoms
                    .iter()
                    .map(|a| {
                        [
                            cos * a[0] - sin * a[1] + t[0],
                            sin * a[0] + cos * a[1] + t[1],
                            a[2] + t[2],
                        ]
                    })
                    .collect()
            })
            .collect()
    }

    fn flat(residues: &[Vec<Coord>]) -> Vec<Coord> {
        residues.iter().flatten().copied().collect()
    }

    #[test]
    fn test_alignment_recovers_rigid_motion() {
        let reference = reference_residues();
        // The "prediction" is the reference moved by a rigid motion
        let mobile = transformed(&reference, 0.7, [3.0, -2.0, 5.0]);

        let aligned = align_to_reference(&mobile, &reference).unwrap();
        let err = rmsd(&flat(&aligned), &flat(&reference));
        assert!(err < 1e-9, "post-alignment RMSD {err} should be ~0");
    }

    #[test]
    fn test_alignment_transforms_all_atoms() {
        let reference = reference_residues();
        let mobile = transformed(&reference, -1.2, [0.5, 8.0, -1.0]);
        let aligned = align_to_reference(&mobile, &reference).unwrap();
        // Every atom row survives, not just the CAs
        assert_eq!(aligned.len(), reference.len());
        for (a, r) in aligned.iter().zip(reference.iter()) {
            assert_eq!(a.len(), r.len());
        }
    }

    #[test]
    fn test_identity_when_already_aligned() {
        let reference = reference_residues();
        let aligned = align_to_reference(&reference, &reference).unwrap();
        let err = rmsd(&flat(&aligned), &flat(&reference));
        assert!(err < 1e-9);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let a = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let b = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        assert!(kabsch_fit(&a, &b).is_err());
    }

    #[test]
    fn test_too_few_points_rejected() {
        let a = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        assert!(kabsch_fit(&a, &a).is_err());
    }

    #[test]
    fn test_collinear_points_rejected() {
        // Points on a line leave the rotation about that line
        // unconstrained; the fit must refuse instead of guessing.
        let line: Vec<Coord> = (0..5).map(|i| [i as f64, 0.0, 0.0]).collect();
        let err = kabsch_fit(&line, &line).unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn test_coincident_points_rejected() {
        let pile = vec![[2.0, 1.0, 3.0]; 4];
        assert!(kabsch_fit(&pile, &pile).is_err());
    }
}
