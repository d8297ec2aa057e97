use nalgebra::Point3;

use crate::error::{FractureError, Result};
use crate::mesh::VolumeMesh;

/// Structured mesh generator for tests, benchmarks and the demo
pub struct MeshGenerator;

impl MeshGenerator {
    /// Generate a box domain subdivided into linear tetrahedra
    ///
    /// Each hexahedral cell is split into 6 tetrahedra sharing the
    /// v000–v111 diagonal (Kuhn subdivision). Every cell uses the same
    /// diagonal, so the faces match across cells and the mesh is conforming.
    ///
    /// # Arguments
    /// * `nx`, `ny`, `nz` - Number of divisions in each direction
    /// * `lx`, `ly`, `lz` - Domain dimensions
    pub fn generate_box(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Result<VolumeMesh> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(FractureError::invalid_mesh(format!(
                "box needs at least one division per axis, got {nx}x{ny}x{nz}"
            )));
        }

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let dz = lz / nz as f64;

        let node_id = |ix: usize, iy: usize, iz: usize| ix + iy * (nx + 1) + iz * (nx + 1) * (ny + 1);

        let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for iz in 0..=nz {
            for iy in 0..=ny {
                for ix in 0..=nx {
                    nodes.push(Point3::new(ix as f64 * dx, iy as f64 * dy, iz as f64 * dz));
                }
            }
        }

        // Axis orders; each walks from v000 to v111 along unit steps
        const PATHS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let mut tets = Vec::with_capacity(6 * nx * ny * nz);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    for path in PATHS {
                        let mut corner = [ix, iy, iz];
                        let mut tet = [node_id(ix, iy, iz); 4];
                        for (step, axis) in path.into_iter().enumerate() {
                            corner[axis] += 1;
                            tet[step + 1] = node_id(corner[0], corner[1], corner[2]);
                        }
                        tets.push(tet);
                    }
                }
            }
        }

        // Half the paths are left-handed; VolumeMesh::new reorients them
        VolumeMesh::new(nodes, tets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TetAdjacency;
    use approx::assert_relative_eq;

    #[test]
    fn test_6tet_subdivision_count() {
        let mesh = MeshGenerator::generate_box(2, 3, 4, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(mesh.num_tets(), 6 * 2 * 3 * 4);
        assert_eq!(mesh.num_nodes(), 3 * 4 * 5);
    }

    #[test]
    fn test_box_volume() {
        let mesh = MeshGenerator::generate_box(3, 2, 2, 2.0, 1.5, 0.5).unwrap();
        assert_relative_eq!(mesh.total_volume(), 1.5, epsilon = 1e-12);
        for &v in mesh.volumes() {
            assert_relative_eq!(v, 1.5 / (6.0 * 12.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_mesh_is_conforming() {
        let mesh = MeshGenerator::generate_box(3, 3, 3, 1.0, 1.0, 1.0).unwrap();
        let adj = TetAdjacency::build(&mesh).unwrap();
        assert_eq!(adj.num_components(), 1);
        // Surface of a 3x3x3 box: 6 sides x 9 quads x 2 triangles
        assert_eq!(adj.boundary_faces().len(), 108);
    }

    #[test]
    fn test_zero_divisions_rejected() {
        assert!(MeshGenerator::generate_box(0, 1, 1, 1.0, 1.0, 1.0).is_err());
    }
}
