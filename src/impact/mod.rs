//! Impact projection: from a contact point, direction and sensitivity to a
//! labeling of the tetrahedra into fracture pieces.

use nalgebra::{Point3, Vector3};
use tracing::trace;

use crate::config::ImpactConfig;
use crate::error::{FractureError, Result};
use crate::mesh::connected_labels;
use crate::modes::FractureModes;

/// One impact query
#[derive(Debug, Clone, PartialEq)]
pub struct Impact {
    pub contact_point: Point3<f64>,
    /// Direction in field space; only a non-zero 3-vector with d = 3 is
    /// directional, anything else (the usual `[1.0]`) is isotropic
    pub direction: Vec<f64>,
    /// Sensitivity; larger values separate more pieces, 0 separates none
    pub threshold: f64,
}

impl Impact {
    pub fn new(contact_point: Point3<f64>, direction: Vec<f64>, threshold: f64) -> Self {
        Self {
            contact_point,
            direction,
            threshold,
        }
    }

    pub fn from_config(contact_point: Point3<f64>, config: &ImpactConfig) -> Self {
        Self::new(contact_point, config.direction.clone(), config.threshold)
    }
}

/// Result of projecting one impact onto the fracture modes
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactState {
    pub contact_point: Point3<f64>,
    pub direction: Vec<f64>,
    pub threshold: f64,
    pub contact_tet: usize,
    /// Modal weight cₖ of each mode
    pub mode_weights: Vec<f64>,
    /// Per-tet response; signed for d = 1, magnitude for d = 3
    pub tet_response: Vec<f64>,
    /// Canonical fracture label of every tetrahedron
    pub tet_labels: Vec<usize>,
    /// Fracture label of every intrinsic piece
    pub piece_labels: Vec<usize>,
    pub n_pieces: usize,
}

impl FractureModes {
    /// Project an impact onto the modes and label the resulting pieces
    ///
    /// # Errors
    /// `UnlocatableContact` if the contact point is farther than
    /// `contact_tolerance · diagonal` from every tetrahedron.
    pub fn impact_projection(&self, impact: &Impact) -> Result<ImpactState> {
        let mesh = self.mesh();
        let d = self.field_dim();
        let p = impact.contact_point;

        let tolerance = self.parameters().contact_tolerance * mesh.diagonal();
        let location = self.grid().locate(mesh, &p);
        let location = match location {
            Some(loc) if loc.distance <= tolerance => loc,
            other => {
                return Err(FractureError::UnlocatableContact {
                    point: p,
                    distance: other.map_or(f64::INFINITY, |l| l.distance),
                    tolerance,
                })
            }
        };

        let directional = d == 3 && impact.direction.len() == 3 && impact.direction.iter().any(|&c| c != 0.0);
        let reference: Option<Vector3<f64>> = if directional {
            Some(Vector3::new(impact.direction[0], impact.direction[1], impact.direction[2]))
        } else {
            let towards_center = self.centroid() - p;
            (towards_center.norm() > 0.0).then_some(towards_center)
        };

        let modes = self.modes();
        let mode_weights: Vec<f64> = (0..modes.num_modes())
            .map(|k| {
                let value = self.mode_at(k, location.tet, &location.weights);
                let excitation = self.relative_excitation(k, location.tet);

                let (projection, alignment) = if d == 3 {
                    let v = Vector3::new(value[0], value[1], value[2]);
                    let projection = reference.map_or(0.0, |r| v.dot(&r));
                    let alignment = if directional {
                        let denom = v.norm() * reference.map_or(0.0, |r| r.norm());
                        let cos = if denom > 0.0 { projection / denom } else { 0.0 };
                        0.5 * (1.0 + cos.abs())
                    } else {
                        1.0
                    };
                    (projection, alignment)
                } else {
                    (value[0], 1.0)
                };

                let sign = if projection < 0.0 { -1.0 } else { 1.0 };
                sign * excitation * alignment / modes.eigenvalues[k]
            })
            .collect();

        // u_t = Σ cₖ φ̄ₖ(t)
        let num_tets = mesh.num_tets();
        let mut response = vec![0.0; num_tets * d];
        for (k, &c) in mode_weights.iter().enumerate() {
            if c != 0.0 {
                for (u, v) in response.iter_mut().zip(self.tet_values(k)) {
                    *u += c * v;
                }
            }
        }

        let partition = self.partition();
        let means = partition.piece_means(mesh.volumes(), &response, d);
        let jumps: Vec<f64> = partition
            .piece_pairs
            .iter()
            .map(|&[a, b]| {
                means[a]
                    .iter()
                    .zip(&means[b])
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();
        let max_jump = jumps.iter().copied().fold(0.0, f64::max);

        let pair_separated: Vec<bool> = jumps
            .iter()
            .map(|&jump| {
                let relative = if max_jump > 0.0 { jump / max_jump } else { 0.0 };
                relative > 0.0 && impact.threshold * relative >= 1.0
            })
            .collect();
        trace!(
            pairs = jumps.len(),
            separated = pair_separated.iter().filter(|&&s| s).count(),
            "piece separation"
        );

        let (tet_labels, n_pieces) = connected_labels(self.adjacency(), |face| {
            partition.face_pair[face].is_some_and(|pair| pair_separated[pair])
        });

        let mut piece_labels = vec![0; partition.num_pieces];
        for (&piece, &label) in partition.tet_piece.iter().zip(&tet_labels) {
            piece_labels[piece] = label;
        }

        let tet_response = if d == 1 {
            response
        } else {
            response
                .chunks_exact(d)
                .map(|u| u.iter().map(|x| x * x).sum::<f64>().sqrt())
                .collect()
        };

        Ok(ImpactState {
            contact_point: p,
            direction: impact.direction.clone(),
            threshold: impact.threshold,
            contact_tet: location.tet,
            mode_weights,
            tet_response,
            tet_labels,
            piece_labels,
            n_pieces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use crate::modes::ModeParameters;

    fn box_modes(d: usize) -> FractureModes {
        let mesh = MeshGenerator::generate_box(5, 4, 3, 1.25, 1.0, 0.75).unwrap();
        FractureModes::compute_modes(mesh, ModeParameters::new(5).with_field_dim(d)).unwrap()
    }

    #[test]
    fn test_zero_threshold_keeps_one_piece() {
        let modes = box_modes(1);
        let state = modes
            .impact_projection(&Impact::new(Point3::new(0.1, 0.5, 0.4), vec![1.0], 0.0))
            .unwrap();
        assert_eq!(state.n_pieces, 1);
        assert!(state.tet_labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_high_threshold_separates() {
        let modes = box_modes(1);
        let state = modes
            .impact_projection(&Impact::new(Point3::new(0.6, 0.5, 0.4), vec![1.0], 10.0))
            .unwrap();
        assert!(state.n_pieces >= 2);
        assert_eq!(state.tet_labels[0], 0);
        assert_eq!(state.mode_weights.len(), 5);
        // Pieces never split an intrinsic piece
        for (t, &piece) in modes.partition().tet_piece.iter().enumerate() {
            assert_eq!(state.tet_labels[t], state.piece_labels[piece]);
        }
    }

    #[test]
    fn test_far_contact_is_rejected() {
        let modes = box_modes(1);
        let err = modes
            .impact_projection(&Impact::new(Point3::new(5.0, 0.5, 0.4), vec![1.0], 10.0))
            .unwrap_err();
        assert!(matches!(err, FractureError::UnlocatableContact { .. }));
    }

    #[test]
    fn test_directional_vector_impact() {
        let modes = box_modes(3);
        let point = Point3::new(0.6, 0.5, 0.75);
        let down = modes
            .impact_projection(&Impact::new(point, vec![0.0, 0.0, -1.0], 10.0))
            .unwrap();
        let iso = modes.impact_projection(&Impact::new(point, vec![1.0], 10.0)).unwrap();

        assert_eq!(down.tet_response.len(), modes.mesh().num_tets());
        assert!(down.tet_response.iter().all(|&r| r >= 0.0));
        assert!(down.n_pieces >= 1 && iso.n_pieces >= 1);
        for (a, b) in down.mode_weights.iter().zip(&iso.mode_weights) {
            assert!(a.abs() <= b.abs() + 1e-15);
        }
    }
}
