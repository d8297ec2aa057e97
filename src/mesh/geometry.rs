use nalgebra::{Point3, Vector3};
use std::path::Path;
use tracing::debug;

use crate::error::{FractureError, Result};

/// Tetrahedra whose volume falls below this fraction of the bounding-box
/// diagonal cubed are rejected as degenerate.
pub const DEGENERATE_VOLUME_RATIO: f64 = 1e-12;

/// Compute the Jacobian determinant of a linear tetrahedron
///
/// J = [x1-x0  x2-x0  x3-x0]
///
/// det(J) = 6 × signed volume. Positive for a right-handed vertex ordering.
pub fn compute_tet_jacobian(vertices: &[Point3<f64>; 4]) -> f64 {
    let e1 = vertices[1] - vertices[0];
    let e2 = vertices[2] - vertices[0];
    let e3 = vertices[3] - vertices[0];

    // det(J) = e1 · (e2 × e3)
    e1.dot(&e2.cross(&e3))
}

/// Immutable tetrahedral volume mesh
///
/// Built once from the output of an external tetrahedralizer. After
/// construction every tetrahedron is positively oriented and has a volume
/// above [`DEGENERATE_VOLUME_RATIO`] × diagonal³.
#[derive(Debug, Clone)]
pub struct VolumeMesh {
    nodes: Vec<Point3<f64>>,
    tets: Vec<[usize; 4]>,
    volumes: Vec<f64>,
}

impl VolumeMesh {
    /// Validate and build a volume mesh
    ///
    /// # Errors
    /// `InvalidMesh` if coordinates are not finite, an index is out of range,
    /// a vertex belongs to no tetrahedron, or a tetrahedron has (near) zero
    /// volume.
    pub fn new(nodes: Vec<Point3<f64>>, mut tets: Vec<[usize; 4]>) -> Result<Self> {
        if nodes.len() < 4 {
            return Err(FractureError::invalid_mesh(format!(
                "need at least 4 vertices, got {}",
                nodes.len()
            )));
        }
        if tets.is_empty() {
            return Err(FractureError::invalid_mesh("mesh has no tetrahedra"));
        }
        if let Some(idx) = nodes.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(FractureError::invalid_mesh(format!(
                "vertex {idx} has non-finite coordinates"
            )));
        }

        let (min, max) = bounding_box(&nodes);
        let diagonal = (max - min).norm();
        let min_volume = DEGENERATE_VOLUME_RATIO * diagonal.powi(3);

        let mut volumes = Vec::with_capacity(tets.len());
        let mut reoriented = 0usize;
        let mut referenced = vec![false; nodes.len()];

        for (tet_idx, tet) in tets.iter_mut().enumerate() {
            if let Some(&bad) = tet.iter().find(|&&v| v >= nodes.len()) {
                return Err(FractureError::invalid_mesh(format!(
                    "tetrahedron {tet_idx} references vertex {bad}, mesh has {} vertices",
                    nodes.len()
                )));
            }

            for &v in tet.iter() {
                referenced[v] = true;
            }

            let corners = [nodes[tet[0]], nodes[tet[1]], nodes[tet[2]], nodes[tet[3]]];
            let volume = compute_tet_jacobian(&corners) / 6.0;

            if volume.abs() <= min_volume {
                return Err(FractureError::invalid_mesh(format!(
                    "tetrahedron {tet_idx} is degenerate (volume {volume:.3e})"
                )));
            }
            if volume < 0.0 {
                tet.swap(2, 3);
                reoriented += 1;
            }
            volumes.push(volume.abs());
        }

        if let Some(unused) = referenced.iter().position(|&r| !r) {
            return Err(FractureError::invalid_mesh(format!(
                "vertex {unused} is not referenced by any tetrahedron"
            )));
        }

        if reoriented > 0 {
            debug!(reoriented, "reoriented negatively oriented tetrahedra");
        }

        Ok(Self { nodes, tets, volumes })
    }

    /// Read a mesh from TetGen `.node` / `.ele` files
    pub fn from_tetgen<P: AsRef<Path>, Q: AsRef<Path>>(node_path: P, ele_path: Q) -> Result<Self> {
        let (nodes, tets) = super::tetgen::read_tetgen(node_path.as_ref(), ele_path.as_ref())?;
        Self::new(nodes, tets)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_tets(&self) -> usize {
        self.tets.len()
    }

    pub fn nodes(&self) -> &[Point3<f64>] {
        &self.nodes
    }

    pub fn tets(&self) -> &[[usize; 4]] {
        &self.tets
    }

    /// Corner coordinates of one tetrahedron
    pub fn tet_vertices(&self, tet: usize) -> [Point3<f64>; 4] {
        let t = &self.tets[tet];
        [self.nodes[t[0]], self.nodes[t[1]], self.nodes[t[2]], self.nodes[t[3]]]
    }

    /// Volume of each tetrahedron (all positive)
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn total_volume(&self) -> f64 {
        self.volumes.iter().sum()
    }

    pub fn tet_centroid(&self, tet: usize) -> Point3<f64> {
        let v = self.tet_vertices(tet);
        Point3::from((v[0].coords + v[1].coords + v[2].coords + v[3].coords) * 0.25)
    }

    /// Volume-weighted centroid of the solid
    pub fn centroid(&self) -> Point3<f64> {
        let mut acc = Vector3::zeros();
        for (tet, &vol) in self.volumes.iter().enumerate() {
            acc += self.tet_centroid(tet).coords * vol;
        }
        Point3::from(acc / self.total_volume())
    }

    /// Axis-aligned bounding box (min, max)
    pub fn bounding_box(&self) -> (Point3<f64>, Point3<f64>) {
        bounding_box(&self.nodes)
    }

    /// Length of the bounding-box diagonal
    pub fn diagonal(&self) -> f64 {
        let (min, max) = self.bounding_box();
        (max - min).norm()
    }
}

pub(crate) fn bounding_box(points: &[Point3<f64>]) -> (Point3<f64>, Point3<f64>) {
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tet() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_single_tet_volume() {
        let mesh = VolumeMesh::new(unit_tet(), vec![[0, 1, 2, 3]]).unwrap();
        assert_relative_eq!(mesh.total_volume(), 1.0 / 6.0, epsilon = 1e-14);
    }

    #[test]
    fn test_inverted_tet_is_reoriented() {
        let mesh = VolumeMesh::new(unit_tet(), vec![[0, 2, 1, 3]]).unwrap();
        let det = compute_tet_jacobian(&mesh.tet_vertices(0));
        assert!(det > 0.0);
        assert_relative_eq!(mesh.volumes()[0], 1.0 / 6.0, epsilon = 1e-14);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let err = VolumeMesh::new(unit_tet(), vec![[0, 1, 2, 4]]).unwrap_err();
        assert!(matches!(err, FractureError::InvalidMesh(_)));
    }

    #[test]
    fn test_flat_tet_rejected() {
        let mut nodes = unit_tet();
        nodes[3] = Point3::new(0.5, 0.5, 0.0);
        let err = VolumeMesh::new(nodes, vec![[0, 1, 2, 3]]).unwrap_err();
        assert!(matches!(err, FractureError::InvalidMesh(_)));
    }

    #[test]
    fn test_unreferenced_vertex_rejected() {
        let mut nodes = unit_tet();
        nodes.push(Point3::new(2.0, 2.0, 2.0));
        let err = VolumeMesh::new(nodes, vec![[0, 1, 2, 3]]).unwrap_err();
        match err {
            FractureError::InvalidMesh(message) => assert!(message.contains("vertex 4")),
            other => panic!("expected InvalidMesh, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_vertex_rejected() {
        let err = VolumeMesh::new(unit_tet(), vec![[0, 1, 1, 3]]).unwrap_err();
        assert!(matches!(err, FractureError::InvalidMesh(_)));
    }
}
