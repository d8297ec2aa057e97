/// Strain-displacement relationship for linear tetrahedra
///
/// Implements the B-matrix that relates nodal displacements to element strains.

use nalgebra::{SMatrix, Vector3};

/// Strain-displacement matrix computations
pub struct StrainDisplacement;

impl StrainDisplacement {
    /// Compute 6×12 strain-displacement matrix B from shape function gradients
    ///
    /// Relates nodal displacements to element strains: ε = B · u_e
    ///
    /// - Rows: [ε_xx, ε_yy, ε_zz, γ_xy, γ_yz, γ_zx] (Voigt notation)
    /// - Columns: [u_0x, u_0y, u_0z, u_1x, ..., u_3z] (12 DOFs)
    ///
    /// For each node i, columns 3i, 3i+1, 3i+2 are:
    /// ```text
    ///     [∂N_i/∂x    0         0      ]
    ///     [  0      ∂N_i/∂y     0      ]
    ///     [  0        0      ∂N_i/∂z   ]
    ///     [∂N_i/∂y  ∂N_i/∂x     0      ]
    ///     [  0      ∂N_i/∂z  ∂N_i/∂y   ]
    ///     [∂N_i/∂z    0      ∂N_i/∂x   ]
    /// ```
    ///
    /// The gradients are constant on a linear tetrahedron, so B is too.
    #[allow(non_snake_case)]
    pub fn compute_b_matrix(gradients: &[Vector3<f64>; 4]) -> SMatrix<f64, 6, 12> {
        let mut B = SMatrix::<f64, 6, 12>::zeros();

        for (i, g) in gradients.iter().enumerate() {
            let c = 3 * i;
            let (dx, dy, dz) = (g.x, g.y, g.z);

            B[(0, c)] = dx;
            B[(1, c + 1)] = dy;
            B[(2, c + 2)] = dz;

            B[(3, c)] = dy;
            B[(3, c + 1)] = dx;

            B[(4, c + 1)] = dz;
            B[(4, c + 2)] = dy;

            B[(5, c + 2)] = dx;
            B[(5, c)] = dz;
        }

        B
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::ElementMatrix;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, SVector};

    fn vertices() -> [Point3<f64>; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.1, 0.0),
            Point3::new(0.2, 1.0, 0.0),
            Point3::new(0.1, 0.0, 0.9),
        ]
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_b_matrix_rigid_motions_are_strain_free() {
        let verts = vertices();
        let grads = ElementMatrix::shape_gradients(&verts).unwrap();
        let B = StrainDisplacement::compute_b_matrix(&grads);

        // Translation in y
        let mut u = SVector::<f64, 12>::zeros();
        for i in 0..4 {
            u[3 * i + 1] = 1.0;
        }
        assert_relative_eq!((B * u).norm(), 0.0, epsilon = 1e-12);

        // Infinitesimal rotation about z: u = (-y, x, 0)
        let mut u = SVector::<f64, 12>::zeros();
        for (i, p) in verts.iter().enumerate() {
            u[3 * i] = -p.y;
            u[3 * i + 1] = p.x;
        }
        assert_relative_eq!((B * u).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_b_matrix_uniform_stretch() {
        let verts = vertices();
        let grads = ElementMatrix::shape_gradients(&verts).unwrap();
        let B = StrainDisplacement::compute_b_matrix(&grads);

        // u_x = 0.01 x gives ε_xx = 0.01 and nothing else
        let mut u = SVector::<f64, 12>::zeros();
        for (i, p) in verts.iter().enumerate() {
            u[3 * i] = 0.01 * p.x;
        }
        let strain = B * u;
        assert_relative_eq!(strain[0], 0.01, epsilon = 1e-12);
        for k in 1..6 {
            assert_relative_eq!(strain[k], 0.0, epsilon = 1e-12);
        }
    }
}
