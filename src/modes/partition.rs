use std::collections::HashMap;

use crate::mesh::{connected_labels, TetAdjacency};

/// Impact-independent decomposition of the solid implied by its modes
///
/// An interior face is cut when, for some mode, the per-tet mode values on
/// its two sides point in opposite directions. Pieces are the connected
/// components of what remains.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicPartition {
    /// Piece id of every tetrahedron (canonical order)
    pub tet_piece: Vec<usize>,
    pub num_pieces: usize,
    pub volumes: Vec<f64>,
    /// Adjacent piece pairs `[p, q]` with `p < q`
    pub piece_pairs: Vec<[usize; 2]>,
    /// For each interior face, the index into `piece_pairs` of the pieces it
    /// joins, `None` for faces inside one piece
    pub face_pair: Vec<Option<usize>>,
}

impl IntrinsicPartition {
    /// Build the partition from per-tet mode values
    ///
    /// `tet_values[k]` holds `field_dim` components per tetrahedron for mode k.
    pub fn build(adjacency: &TetAdjacency, volumes: &[f64], tet_values: &[Vec<f64>], field_dim: usize) -> Self {
        let opposed = |face: usize| {
            let [a, b] = adjacency.interior_faces()[face].tets;
            tet_values.iter().any(|values| {
                let va = &values[a * field_dim..(a + 1) * field_dim];
                let vb = &values[b * field_dim..(b + 1) * field_dim];
                va.iter().zip(vb).map(|(x, y)| x * y).sum::<f64>() < 0.0
            })
        };

        let (tet_piece, num_pieces) = connected_labels(adjacency, opposed);

        let mut piece_volumes = vec![0.0; num_pieces];
        for (&piece, &v) in tet_piece.iter().zip(volumes) {
            piece_volumes[piece] += v;
        }

        let mut pair_index: HashMap<[usize; 2], usize> = HashMap::new();
        let mut piece_pairs = Vec::new();
        let face_pair = adjacency
            .interior_faces()
            .iter()
            .map(|face| {
                let (p, q) = (tet_piece[face.tets[0]], tet_piece[face.tets[1]]);
                if p == q {
                    return None;
                }
                let key = [p.min(q), p.max(q)];
                Some(*pair_index.entry(key).or_insert_with(|| {
                    piece_pairs.push(key);
                    piece_pairs.len() - 1
                }))
            })
            .collect();

        Self {
            tet_piece,
            num_pieces,
            volumes: piece_volumes,
            piece_pairs,
            face_pair,
        }
    }

    /// Volume-weighted mean of a per-tet field over each piece
    ///
    /// `field` holds `field_dim` components per tetrahedron.
    pub fn piece_means(&self, tet_volumes: &[f64], field: &[f64], field_dim: usize) -> Vec<Vec<f64>> {
        let mut means = vec![vec![0.0; field_dim]; self.num_pieces];
        for (tet, (&piece, &vol)) in self.tet_piece.iter().zip(tet_volumes).enumerate() {
            for c in 0..field_dim {
                means[piece][c] += vol * field[tet * field_dim + c];
            }
        }
        for (mean, &vol) in means.iter_mut().zip(&self.volumes) {
            mean.iter_mut().for_each(|m| *m /= vol);
        }
        means
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_sign_change_splits_partition() {
        let mesh = MeshGenerator::generate_box(4, 1, 1, 1.0, 1.0, 1.0).unwrap();
        let adj = TetAdjacency::build(&mesh).unwrap();

        // One "mode" that changes sign at x = 0.5
        let values: Vec<f64> = (0..mesh.num_tets()).map(|t| mesh.tet_centroid(t).x - 0.5).collect();
        let partition = IntrinsicPartition::build(&adj, mesh.volumes(), &[values], 1);

        assert_eq!(partition.num_pieces, 2);
        assert_eq!(partition.piece_pairs, vec![[0, 1]]);
        assert_relative_eq!(partition.volumes[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(partition.volumes[1], 0.5, epsilon = 1e-12);

        let cut = partition.face_pair.iter().filter(|p| p.is_some()).count();
        // x = 0.5 plane: one quad, two triangles
        assert_eq!(cut, 2);
    }

    #[test]
    fn test_piece_means() {
        let mesh = MeshGenerator::generate_box(2, 1, 1, 2.0, 1.0, 1.0).unwrap();
        let adj = TetAdjacency::build(&mesh).unwrap();
        let values: Vec<f64> = (0..mesh.num_tets()).map(|t| mesh.tet_centroid(t).x - 1.0).collect();
        let partition = IntrinsicPartition::build(&adj, mesh.volumes(), &[values.clone()], 1);

        let means = partition.piece_means(mesh.volumes(), &values, 1);
        assert_eq!(means.len(), 2);
        assert_relative_eq!(means[0][0] + means[1][0], 0.0, epsilon = 1e-12);
    }
}
