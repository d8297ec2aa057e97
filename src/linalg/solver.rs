use sprs::CsMat;

/// Statistics from solver execution
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Number of iterations
    pub iterations: usize,

    /// Final residual norm ||r|| = ||b - Ax||
    pub residual_norm: f64,

    /// Relative residual ||r|| / ||b||
    pub relative_residual: f64,

    /// Whether solver converged
    pub converged: bool,

    /// Solve time in seconds
    pub solve_time: f64,
}

/// Trait for a linear operator A that can be applied to a vector x to get Ax
pub trait LinearOperator {
    /// Apply the operator to vector v: out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    /// Number of rows (output dimension)
    fn rows(&self) -> usize;

    /// Number of columns (input dimension)
    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; self.rows()];
        for (row_idx, row) in self.outer_iterator().enumerate() {
            let mut sum = 0.0;
            for (col_idx, &val) in row.iter() {
                sum += val * v[col_idx];
            }
            result[row_idx] = sum;
        }
        result
    }

    fn rows(&self) -> usize {
        self.rows()
    }

    fn cols(&self) -> usize {
        self.cols()
    }
}

/// Linear system solver trait
///
/// Solves Ax = b for x
pub trait Solver {
    /// Solve the linear system using a generic operator
    #[allow(non_snake_case)]
    fn solve_with_operator<O, P>(&self, A: &O, b: &[f64], precond: &P) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator,
        P: crate::linalg::preconditioner::Preconditioner;

    /// Get solver name
    fn name(&self) -> &str;
}

/// Helper functions for vector arithmetic
pub struct SolverUtils;

impl SolverUtils {
    /// Euclidean inner product
    pub fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    /// Compute L2 norm of a vector
    pub fn norm(v: &[f64]) -> f64 {
        v.iter().map(|&x| x * x).sum::<f64>().sqrt()
    }

    /// y += alpha * x
    pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += alpha * xi;
        }
    }
}
