use nalgebra::Point3;
use rayon::prelude::*;
use std::path::Path;

use super::geometry::VolumeMesh;
use super::search::SearchGrid;
use crate::error::{FractureError, Result};

/// Triangle surface mesh (fine display surface or interior surface)
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    /// Build a surface, checking that every face index is in range
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self> {
        if let Some((idx, face)) = faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|&v| v >= vertices.len()))
        {
            return Err(FractureError::invalid_mesh(format!(
                "surface face {idx} {face:?} references a vertex beyond {}",
                vertices.len()
            )));
        }
        Ok(Self { vertices, faces })
    }

    /// Read a Wavefront OBJ surface
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let piece = crate::export::obj::read_obj(path.as_ref())?;
        let vertices = piece.vertices.iter().map(|v| Point3::new(v[0], v[1], v[2])).collect();
        Self::new(vertices, piece.faces)
    }

    /// The boundary of a volume mesh as a surface (outward oriented)
    pub fn boundary_of(mesh: &VolumeMesh, adjacency: &super::TetAdjacency) -> Self {
        let mut remap = vec![usize::MAX; mesh.num_nodes()];
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(adjacency.boundary_faces().len());

        for face in adjacency.boundary_faces() {
            let tri = face.vertices.map(|v| {
                if remap[v] == usize::MAX {
                    remap[v] = vertices.len();
                    vertices.push(mesh.nodes()[v]);
                }
                remap[v]
            });
            faces.push(tri);
        }

        Self { vertices, faces }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}

/// A surface embedded in a volume mesh
///
/// Each surface vertex stores its enclosing (or nearest) tetrahedron and
/// barycentric weights into it.
#[derive(Debug, Clone)]
pub struct EmbeddedSurface {
    pub surface: SurfaceMesh,
    pub tet_index: Vec<usize>,
    pub weights: Vec<[f64; 4]>,
}

impl EmbeddedSurface {
    /// Embed every surface vertex into the volume mesh
    ///
    /// # Errors
    /// `Embedding` for the first vertex (lowest index) farther than
    /// `max_distance` from every tetrahedron.
    pub fn build(mesh: &VolumeMesh, grid: &SearchGrid, surface: SurfaceMesh, max_distance: f64) -> Result<Self> {
        let located: Vec<_> = surface
            .vertices
            .par_iter()
            .map(|p| grid.locate(mesh, p))
            .collect();

        let mut tet_index = Vec::with_capacity(located.len());
        let mut weights = Vec::with_capacity(located.len());

        for (vertex, loc) in located.into_iter().enumerate() {
            match loc {
                Some(loc) if loc.distance <= max_distance => {
                    tet_index.push(loc.tet);
                    weights.push(loc.weights);
                }
                Some(loc) => {
                    return Err(FractureError::Embedding {
                        vertex,
                        distance: loc.distance,
                    })
                }
                None => {
                    return Err(FractureError::Embedding {
                        vertex,
                        distance: f64::INFINITY,
                    })
                }
            }
        }

        Ok(Self {
            surface,
            tet_index,
            weights,
        })
    }

    /// Interpolate a nodal field of the volume mesh onto the surface vertices
    ///
    /// `nodal` holds `field_dim` interleaved components per volume vertex;
    /// the result has the same layout per surface vertex.
    pub fn interpolate(&self, mesh: &VolumeMesh, nodal: &[f64], field_dim: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.tet_index.len() * field_dim];
        for (vertex, (&tet, w)) in self.tet_index.iter().zip(&self.weights).enumerate() {
            let corners = &mesh.tets()[tet];
            for (corner, &wi) in corners.iter().zip(w) {
                for c in 0..field_dim {
                    out[vertex * field_dim + c] += wi * nodal[corner * field_dim + c];
                }
            }
        }
        out
    }

    /// Label of each surface face under a per-tetrahedron labeling
    ///
    /// A face takes the label shared by at least two of its vertices,
    /// otherwise the label of its first vertex.
    pub fn face_labels(&self, tet_labels: &[usize]) -> Vec<usize> {
        self.surface
            .faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|v| tet_labels[self.tet_index[v]]);
                if b == c && a != b {
                    b
                } else {
                    a
                }
            })
            .collect()
    }
}
