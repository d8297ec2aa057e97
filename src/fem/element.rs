use nalgebra::{Matrix3, Point3, SMatrix, Vector3};

/// Element matrix computation for linear (P1) tetrahedra
///
/// Shape functions are the barycentric coordinates, so their gradients are
/// constant over the element and every integral reduces to a closed form.
pub struct ElementMatrix;

impl ElementMatrix {
    /// Gradients of the four linear shape functions
    ///
    /// ∇N₁..₃ are the rows of J⁻¹ with J = [x1-x0  x2-x0  x3-x0], and
    /// ∇N₀ = -(∇N₁ + ∇N₂ + ∇N₃). Returns `None` for a singular element.
    #[allow(non_snake_case)]
    pub fn shape_gradients(vertices: &[Point3<f64>; 4]) -> Option<[Vector3<f64>; 4]> {
        let J = Matrix3::from_columns(&[
            vertices[1] - vertices[0],
            vertices[2] - vertices[0],
            vertices[3] - vertices[0],
        ]);
        let J_inv = J.try_inverse()?;

        let g1 = J_inv.row(0).transpose();
        let g2 = J_inv.row(1).transpose();
        let g3 = J_inv.row(2).transpose();
        Some([-(g1 + g2 + g3), g1, g2, g3])
    }

    /// Scalar Laplacian stiffness
    ///
    /// K_ij = V ∇N_i · ∇N_j
    pub fn laplacian_stiffness(gradients: &[Vector3<f64>; 4], volume: f64) -> SMatrix<f64, 4, 4> {
        SMatrix::<f64, 4, 4>::from_fn(|i, j| volume * gradients[i].dot(&gradients[j]))
    }

    /// Consistent scalar mass matrix
    ///
    /// M_ij = ∫ N_i N_j dV = V/20 (1 + δ_ij)
    pub fn scalar_mass(volume: f64) -> SMatrix<f64, 4, 4> {
        SMatrix::<f64, 4, 4>::from_fn(|i, j| if i == j { volume / 10.0 } else { volume / 20.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tet() -> [Point3<f64>; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_gradients_reproduce_linear_field() {
        let verts = [
            Point3::new(0.1, 0.0, 0.2),
            Point3::new(1.3, 0.1, 0.0),
            Point3::new(0.2, 0.9, 0.1),
            Point3::new(0.0, 0.3, 1.1),
        ];
        let grads = ElementMatrix::shape_gradients(&verts).unwrap();
        let f = |p: &Point3<f64>| 3.0 * p.x - 2.0 * p.y + 0.5 * p.z + 1.0;

        let mut grad = Vector3::zeros();
        for (g, p) in grads.iter().zip(&verts) {
            grad += g * f(p);
        }
        assert_relative_eq!(grad, Vector3::new(3.0, -2.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() {
        let grads = ElementMatrix::shape_gradients(&unit_tet()).unwrap();
        let k = ElementMatrix::laplacian_stiffness(&grads, 1.0 / 6.0);
        for i in 0..4 {
            let row_sum: f64 = (0..4).map(|j| k[(i, j)]).sum();
            assert_relative_eq!(row_sum, 0.0, epsilon = 1e-14);
        }
        assert_relative_eq!(k, k.transpose(), epsilon = 1e-14);
    }

    #[test]
    fn test_mass_sums_to_volume() {
        let m = ElementMatrix::scalar_mass(0.3);
        assert_relative_eq!(m.sum(), 0.3, epsilon = 1e-14);
    }

    #[test]
    fn test_singular_element() {
        let mut verts = unit_tet();
        verts[3] = Point3::new(0.5, 0.5, 0.0);
        assert!(ElementMatrix::shape_gradients(&verts).is_none());
    }
}
