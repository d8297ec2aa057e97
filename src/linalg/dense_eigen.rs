use nalgebra::DMatrix;
use sprs::CsMat;

use super::eigen::{normalize_sign, EigenPair, EigenProblem, GeneralizedEigenSolver};
use crate::error::{FractureError, Result};

/// Dense generalized eigensolver for small problems
///
/// Cholesky reduction M = LLᵀ, then the symmetric eigen-decomposition of
/// C = L⁻¹ K L⁻ᵀ. Eigenvectors are recovered as x = L⁻ᵀ y, which are
/// M-orthonormal because the y are orthonormal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseEigenSolver;

pub(crate) fn to_dense(a: &CsMat<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(a.rows(), a.cols());
    for (row, vec) in a.outer_iterator().enumerate() {
        for (col, &val) in vec.iter() {
            dense[(row, col)] += val;
        }
    }
    dense
}

impl GeneralizedEigenSolver for DenseEigenSolver {
    #[allow(non_snake_case)]
    fn smallest_eigenpairs(&self, problem: &EigenProblem<'_>, count: usize) -> Result<Vec<EigenPair>> {
        let K = to_dense(problem.stiffness);
        let M = to_dense(problem.mass);

        let L = M
            .cholesky()
            .ok_or_else(|| FractureError::convergence("mass matrix is not positive definite"))?
            .l();

        // C = L⁻¹ K L⁻ᵀ, built from two triangular solves
        let X = L
            .solve_lower_triangular(&K)
            .ok_or_else(|| FractureError::convergence("singular Cholesky factor"))?;
        let Y = L
            .solve_lower_triangular(&X.transpose())
            .ok_or_else(|| FractureError::convergence("singular Cholesky factor"))?;
        let C = (&Y + Y.transpose()) * 0.5;

        let eig = C.symmetric_eigen();
        let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

        let admissible: Vec<usize> = order
            .into_iter()
            .filter(|&i| eig.eigenvalues[i] > problem.zero_cutoff)
            .collect();
        if admissible.len() < count {
            return Err(FractureError::InsufficientModes {
                requested: count,
                available: admissible.len(),
            });
        }

        let Lt = L.transpose();
        admissible[..count]
            .iter()
            .map(|&i| {
                let y = eig.eigenvectors.column(i).into_owned();
                let x = Lt
                    .solve_upper_triangular(&y)
                    .ok_or_else(|| FractureError::convergence("singular Cholesky factor"))?;
                let mut vector: Vec<f64> = x.iter().copied().collect();
                normalize_sign(&mut vector);
                Ok(EigenPair {
                    value: eig.eigenvalues[i],
                    vector,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "dense"
    }
}
