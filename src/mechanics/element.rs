/// Element matrices for linear elasticity on linear tetrahedra

use nalgebra::{SMatrix, Vector3};

use super::{IsotropicElasticity, StrainDisplacement};
use crate::fem::ElementMatrix;

/// Element matrix computations for linear elasticity
pub struct ElasticityElement;

impl ElasticityElement {
    /// Compute element stiffness matrix for linear elasticity
    ///
    /// K_e = V Bᵀ D B
    ///
    /// B is constant on a linear tetrahedron, so the one-point rule is exact.
    #[allow(non_snake_case)]
    pub fn stiffness_matrix(
        gradients: &[Vector3<f64>; 4],
        volume: f64,
        material: &IsotropicElasticity,
    ) -> SMatrix<f64, 12, 12> {
        let D = material.constitutive_matrix();
        let B = StrainDisplacement::compute_b_matrix(gradients);
        let DB = D * B;
        (B.transpose() * DB) * volume
    }

    /// Consistent mass matrix with unit density
    ///
    /// Scalar P1 mass on every displacement component:
    /// M_(3i+a)(3j+b) = V/20 (1 + δ_ij) δ_ab
    pub fn mass_matrix(volume: f64) -> SMatrix<f64, 12, 12> {
        let scalar = ElementMatrix::scalar_mass(volume);
        SMatrix::<f64, 12, 12>::from_fn(|r, c| if r % 3 == c % 3 { scalar[(r / 3, c / 3)] } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, SVector};

    #[test]
    #[allow(non_snake_case)]
    fn test_stiffness_is_symmetric_with_rigid_null_space() {
        let verts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let grads = ElementMatrix::shape_gradients(&verts).unwrap();
        let K = ElasticityElement::stiffness_matrix(&grads, 1.0 / 6.0, &IsotropicElasticity::default());
        assert_relative_eq!(K, K.transpose(), epsilon = 1e-12);

        // Rotation about x: u = (0, -z, y)
        let mut u = SVector::<f64, 12>::zeros();
        for (i, p) in verts.iter().enumerate() {
            u[3 * i + 1] = -p.z;
            u[3 * i + 2] = p.y;
        }
        assert_relative_eq!((K * u).norm(), 0.0, epsilon = 1e-12);

        let eig = K.symmetric_eigen();
        let zeros = eig.eigenvalues.iter().filter(|&&l| l.abs() < 1e-10).count();
        assert_eq!(zeros, 6);
        assert!(eig.eigenvalues.iter().all(|&l| l > -1e-10));
    }

    #[test]
    fn test_mass_total_per_component() {
        let m = ElasticityElement::mass_matrix(2.0);
        // Σ over one component block recovers the volume
        let mut total_x = 0.0;
        for r in (0..12).step_by(3) {
            for c in (0..12).step_by(3) {
                total_x += m[(r, c)];
            }
        }
        assert_relative_eq!(total_x, 2.0, epsilon = 1e-14);
        assert_eq!(m[(0, 1)], 0.0);
    }
}
