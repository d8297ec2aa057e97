use std::collections::HashMap;

use super::geometry::VolumeMesh;
use crate::error::{FractureError, Result};

/// Local faces of a positively oriented tetrahedron
///
/// Face `i` is opposite vertex `i`; the vertex order gives an outward normal.
pub const TET_FACES: [[usize; 3]; 4] = [
    [1, 2, 3], // face 0 (opposite vertex 0)
    [0, 3, 2], // face 1
    [0, 1, 3], // face 2
    [0, 2, 1], // face 3
];

/// Outward-oriented global vertex triple of a tetrahedron face
pub fn oriented_face(tet: &[usize; 4], local_face: usize) -> [usize; 3] {
    let f = TET_FACES[local_face];
    [tet[f[0]], tet[f[1]], tet[f[2]]]
}

/// A face shared by two tetrahedra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorFace {
    /// Incident tetrahedra, `tets[0] < tets[1]`
    pub tets: [usize; 2],
    /// Local face index in each incident tetrahedron
    pub local_faces: [usize; 2],
}

/// A face on the boundary of the volume mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFace {
    pub tet: usize,
    pub local_face: usize,
    /// Global vertex indices, outward oriented
    pub vertices: [usize; 3],
}

/// Face adjacency of a tetrahedral mesh
///
/// Built once per [`VolumeMesh`] and shared by every impact query.
#[derive(Debug, Clone)]
pub struct TetAdjacency {
    interior: Vec<InteriorFace>,
    boundary: Vec<BoundaryFace>,
    /// For each tet: (neighbor tet, interior face index)
    neighbors: Vec<Vec<(usize, usize)>>,
}

impl TetAdjacency {
    /// Build face adjacency
    ///
    /// # Errors
    /// `InvalidMesh` if a face is shared by more than two tetrahedra.
    pub fn build(mesh: &VolumeMesh) -> Result<Self> {
        // Sorted face key -> incident (tet, local face), in first-seen order
        let mut face_index: HashMap<[usize; 3], usize> = HashMap::with_capacity(mesh.num_tets() * 2);
        let mut incident: Vec<Vec<(usize, usize)>> = Vec::with_capacity(mesh.num_tets() * 2);

        for (tet_idx, tet) in mesh.tets().iter().enumerate() {
            for local in 0..4 {
                let mut key = oriented_face(tet, local);
                key.sort_unstable();
                let slot = *face_index.entry(key).or_insert_with(|| {
                    incident.push(Vec::with_capacity(2));
                    incident.len() - 1
                });
                incident[slot].push((tet_idx, local));
            }
        }

        let mut interior = Vec::new();
        let mut boundary = Vec::new();
        let mut neighbors = vec![Vec::new(); mesh.num_tets()];

        for entries in incident {
            match entries.as_slice() {
                [(tet, local)] => boundary.push(BoundaryFace {
                    tet: *tet,
                    local_face: *local,
                    vertices: oriented_face(&mesh.tets()[*tet], *local),
                }),
                [(t0, l0), (t1, l1)] => {
                    let face_idx = interior.len();
                    interior.push(InteriorFace {
                        tets: [*t0, *t1],
                        local_faces: [*l0, *l1],
                    });
                    neighbors[*t0].push((*t1, face_idx));
                    neighbors[*t1].push((*t0, face_idx));
                }
                _ => {
                    return Err(FractureError::invalid_mesh(format!(
                        "face shared by {} tetrahedra (first: {})",
                        entries.len(),
                        entries[0].0
                    )))
                }
            }
        }

        Ok(Self {
            interior,
            boundary,
            neighbors,
        })
    }

    pub fn interior_faces(&self) -> &[InteriorFace] {
        &self.interior
    }

    pub fn boundary_faces(&self) -> &[BoundaryFace] {
        &self.boundary
    }

    /// Neighbors of a tetrahedron as (neighbor tet, interior face index)
    pub fn neighbors(&self, tet: usize) -> &[(usize, usize)] {
        &self.neighbors[tet]
    }

    pub fn num_tets(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of connected components of the tetrahedron graph
    pub fn num_components(&self) -> usize {
        let mut visited = vec![false; self.num_tets()];
        let mut components = 0;
        let mut stack = Vec::new();

        for start in 0..self.num_tets() {
            if visited[start] {
                continue;
            }
            components += 1;
            visited[start] = true;
            stack.push(start);
            while let Some(tet) = stack.pop() {
                for &(nb, _) in &self.neighbors[tet] {
                    if !visited[nb] {
                        visited[nb] = true;
                        stack.push(nb);
                    }
                }
            }
        }

        components
    }
}
