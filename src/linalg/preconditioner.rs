/// Preconditioner trait for iterative solvers
///
/// Solves M z = r approximately (where M ≈ A)
pub trait Preconditioner {
    /// Apply preconditioner: solve M z = r
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// Jacobi (diagonal) preconditioner
///
/// M = diag(A)
pub struct JacobiPreconditioner {
    /// Inverse of diagonal entries: 1/A_ii
    diag_inv: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Create Jacobi preconditioner from an explicit diagonal
    ///
    /// Used for matrix-free operators such as K - σM.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let diag_inv = diag
            .iter()
            .map(|&val| if val.abs() > 1e-14 { 1.0 / val } else { 1.0 })
            .collect();
        Self { diag_inv }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        // z = D^{-1} r
        r.iter().zip(self.diag_inv.iter()).map(|(&ri, &di)| ri * di).collect()
    }
}
