use std::time::Instant;

use super::preconditioner::Preconditioner;
use super::solver::{LinearOperator, Solver, SolverStats, SolverUtils};

/// Conjugate Gradient solver for symmetric positive definite systems
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new()
    }
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-8,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn run<O, P>(&self, a: &O, b: &[f64], precond: &P) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm < 1e-300 {
            return (
                vec![0.0; n],
                SolverStats {
                    converged: true,
                    solve_time: start.elapsed().as_secs_f64(),
                    ..SolverStats::default()
                },
            );
        }

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();

        let mut z = precond.apply(&r);
        let mut p = z.clone();
        let mut rz = SolverUtils::dot(&r, &z);

        let mut iteration = 0;
        let mut converged = false;
        let mut final_res = b_norm;

        while iteration < self.max_iterations {
            let ap = a.apply(&p);
            let p_ap = SolverUtils::dot(&p, &ap);

            if p_ap.abs() < 1e-300 {
                break;
            }
            let alpha = rz / p_ap;

            SolverUtils::axpy(alpha, &p, &mut x);
            SolverUtils::axpy(-alpha, &ap, &mut r);
            iteration += 1;

            let r_norm = SolverUtils::norm(&r);
            final_res = r_norm;
            if r_norm < self.tolerance * b_norm {
                converged = true;
                break;
            }

            z = precond.apply(&r);
            let rz_new = SolverUtils::dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        (
            x,
            SolverStats {
                iterations: iteration,
                residual_norm: final_res,
                relative_residual: final_res / b_norm,
                converged,
                solve_time: start.elapsed().as_secs_f64(),
            },
        )
    }
}

impl Solver for ConjugateGradient {
    fn solve_with_operator<O: LinearOperator, P: Preconditioner>(
        &self,
        a: &O,
        b: &[f64],
        precond: &P,
    ) -> (Vec<f64>, SolverStats) {
        self.run(a, b, precond)
    }

    fn name(&self) -> &str {
        "ConjugateGradient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::JacobiPreconditioner;
    use approx::assert_relative_eq;
    use sprs::{CsMat, TriMat};

    fn laplacian_1d(n: usize) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, 2.0);
            if i > 0 {
                tri.add_triplet(i, i - 1, -1.0);
            }
            if i + 1 < n {
                tri.add_triplet(i, i + 1, -1.0);
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_cg_solves_spd_system() {
        let a = laplacian_1d(50);
        let x_true: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let b = a.apply(&x_true);

        let precond = JacobiPreconditioner::from_diagonal(&[2.0; 50]);
        let cg = ConjugateGradient::new().with_tolerance(1e-12).with_max_iterations(200);
        let (x, stats) = cg.solve_with_operator(&a, &b, &precond);

        assert!(stats.converged);
        for (xi, ti) in x.iter().zip(&x_true) {
            assert_relative_eq!(xi, ti, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_cg_reports_non_convergence() {
        let a = laplacian_1d(100);
        let b = vec![1.0; 100];
        let precond = JacobiPreconditioner::from_diagonal(&[2.0; 100]);
        let cg = ConjugateGradient::new().with_tolerance(1e-14).with_max_iterations(3);
        let (_, stats) = cg.solve_with_operator(&a, &b, &precond);
        assert!(!stats.converged);
        assert_eq!(stats.iterations, 3);
    }

    #[test]
    fn test_zero_rhs() {
        let a = laplacian_1d(5);
        let precond = JacobiPreconditioner::from_diagonal(&[2.0; 5]);
        let (x, stats) = ConjugateGradient::new().solve_with_operator(&a, &[0.0; 5], &precond);
        assert!(stats.converged);
        assert!(x.iter().all(|&v| v == 0.0));
    }
}
