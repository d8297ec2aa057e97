use nalgebra::{DMatrix, Vector3};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use tracing::debug;

use crate::error::{FractureError, Result};
use crate::fem::{DofManager, ElasticOperators, ElementMatrix};
use crate::mechanics::{ElasticityElement, IsotropicElasticity};
use crate::mesh::VolumeMesh;

/// Global matrix assembler
pub struct Assembler;

impl Assembler {
    /// Shape function gradients of every tetrahedron
    ///
    /// # Errors
    /// `InvalidMesh` if an element is singular.
    pub fn shape_gradients(mesh: &VolumeMesh) -> Result<Vec<[Vector3<f64>; 4]>> {
        (0..mesh.num_tets())
            .into_par_iter()
            .map(|tet| {
                ElementMatrix::shape_gradients(&mesh.tet_vertices(tet))
                    .ok_or_else(|| FractureError::invalid_mesh(format!("tetrahedron {tet} is singular")))
            })
            .collect()
    }

    /// Assemble the mass (M) and stiffness (K) operators of the fracture-mode
    /// eigenproblem
    ///
    /// * `field_dim == 1`: scalar Laplacian, K_e = V ∇N_i·∇N_j
    /// * `field_dim == 3`: linear elasticity, K_e = V Bᵀ D B
    ///
    /// M is the consistent P1 mass in both cases. Element matrices are
    /// computed in parallel and scattered through a triplet matrix.
    #[allow(non_snake_case)]
    pub fn assemble_operators(
        mesh: &VolumeMesh,
        field_dim: usize,
        material: &IsotropicElasticity,
    ) -> Result<ElasticOperators> {
        if field_dim != 1 && field_dim != 3 {
            return Err(FractureError::invalid_config(format!(
                "field dimension must be 1 or 3, got {field_dim}"
            )));
        }
        material.validate()?;

        let dof_mgr = DofManager::new(mesh.num_nodes(), field_dim);
        let gradients = Self::shape_gradients(mesh)?;

        // Parallel element matrices: each thread builds its own dense blocks
        let element_matrices: Vec<(DMatrix<f64>, DMatrix<f64>)> = gradients
            .par_iter()
            .zip(mesh.volumes().par_iter())
            .map(|(grads, &volume)| {
                if field_dim == 1 {
                    let K_e = ElementMatrix::laplacian_stiffness(grads, volume);
                    let M_e = ElementMatrix::scalar_mass(volume);
                    (DMatrix::from_column_slice(4, 4, K_e.as_slice()), DMatrix::from_column_slice(4, 4, M_e.as_slice()))
                } else {
                    let K_e = ElasticityElement::stiffness_matrix(grads, volume, material);
                    let M_e = ElasticityElement::mass_matrix(volume);
                    (DMatrix::from_column_slice(12, 12, K_e.as_slice()), DMatrix::from_column_slice(12, 12, M_e.as_slice()))
                }
            })
            .collect();

        let n_dofs = dof_mgr.total_dofs();
        let per_elem = (4 * field_dim) * (4 * field_dim);
        let mut K_tri = TriMat::with_capacity((n_dofs, n_dofs), per_elem * mesh.num_tets());
        let mut M_tri = TriMat::with_capacity((n_dofs, n_dofs), per_elem * mesh.num_tets());

        // Sequential scatter of element contributions
        for (tet, (K_e, M_e)) in mesh.tets().iter().zip(&element_matrices) {
            let dofs = dof_mgr.element_dofs(tet);
            for (i, &gi) in dofs.iter().enumerate() {
                for (j, &gj) in dofs.iter().enumerate() {
                    K_tri.add_triplet(gi, gj, K_e[(i, j)]);
                    M_tri.add_triplet(gi, gj, M_e[(i, j)]);
                }
            }
        }

        let stiffness: CsMat<f64> = K_tri.to_csr();
        let mass: CsMat<f64> = M_tri.to_csr();

        debug!(
            dofs = n_dofs,
            stiffness_nnz = stiffness.nnz(),
            mass_nnz = mass.nnz(),
            "assembled fracture operators"
        );

        Ok(ElasticOperators::new(mass, stiffness, field_dim))
    }
}
