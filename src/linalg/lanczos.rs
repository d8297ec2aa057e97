//! Shift-invert block Lanczos for the lowest generalized eigenpairs.
//!
//! Works with the operator A = (K - σM)⁻¹ M, σ < 0, which is self-adjoint
//! in the M-inner product. Its largest eigenvalues θ map to the smallest
//! generalized eigenvalues through λ = σ + 1/θ. The Krylov basis is kept
//! M-orthonormal by full reorthogonalization (classical Gram-Schmidt, twice),
//! and eigenpairs are extracted by Rayleigh-Ritz on the whole basis.

use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sprs::CsMat;
use tracing::{debug, trace};

use super::eigen::{normalize_sign, EigenPair, EigenProblem, GeneralizedEigenSolver};
use super::iterative::ConjugateGradient;
use super::preconditioner::JacobiPreconditioner;
use super::solver::{LinearOperator, Solver, SolverUtils};
use crate::config::SolverConfig;
use crate::error::{FractureError, Result};

/// Vectors whose M-norm shrinks below this fraction during
/// orthogonalization are linearly dependent on the basis.
const DEPENDENCE_RATIO: f64 = 1e-10;

/// K - σM applied without forming it
struct ShiftedOperator<'a> {
    stiffness: &'a CsMat<f64>,
    mass: &'a CsMat<f64>,
    sigma: f64,
}

impl LinearOperator for ShiftedOperator<'_> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut out = self.stiffness.apply(v);
        let mv = self.mass.apply(v);
        SolverUtils::axpy(-self.sigma, &mv, &mut out);
        out
    }

    fn rows(&self) -> usize {
        self.stiffness.rows()
    }

    fn cols(&self) -> usize {
        self.stiffness.cols()
    }
}

/// Shift-invert block Lanczos eigensolver
#[derive(Debug, Clone)]
pub struct ShiftInvertLanczos {
    pub tolerance: f64,
    /// Maximum basis size
    pub max_basis: usize,
    pub block_size: usize,
    pub shift_fraction: f64,
    pub linear_tolerance: f64,
    pub linear_max_iterations: usize,
    pub seed: u64,
}

impl Default for ShiftInvertLanczos {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

/// M-orthonormal Krylov basis with A applied to every vector
struct KrylovBasis {
    v: Vec<Vec<f64>>,
    mv: Vec<Vec<f64>>,
    w: Vec<Vec<f64>>,
    /// Projected operator H_ij = (M v_i)ᵀ w_j
    h: Vec<Vec<f64>>,
}

impl KrylovBasis {
    fn len(&self) -> usize {
        self.v.len()
    }
}

impl ShiftInvertLanczos {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            max_basis: config.max_iterations,
            block_size: config.block_size,
            shift_fraction: config.shift_fraction,
            linear_tolerance: config.linear_tolerance,
            linear_max_iterations: config.linear_max_iterations,
            seed: config.seed,
        }
    }

    /// Remove the components of `v` along an M-orthonormal set (CGS twice)
    /// and M-normalize it. Returns `None` when `v` is dependent on the set.
    fn orthonormalize(mass: &CsMat<f64>, v: &mut [f64], sets: &[&[Vec<f64>]; 2], msets: &[&[Vec<f64>]; 2]) -> Option<Vec<f64>> {
        let initial = SolverUtils::dot(v, &mass.apply(v)).sqrt();
        if !(initial > 0.0) {
            return None;
        }

        for _ in 0..2 {
            for (qs, mqs) in sets.iter().zip(msets) {
                let coefs: Vec<f64> = mqs.iter().map(|mq| SolverUtils::dot(mq, v)).collect();
                for (q, c) in qs.iter().zip(coefs) {
                    SolverUtils::axpy(-c, q, v);
                }
            }
        }

        let mut mv = mass.apply(v);
        let norm = SolverUtils::dot(v, &mv).sqrt();
        if !(norm > DEPENDENCE_RATIO * initial) {
            return None;
        }
        v.iter_mut().for_each(|x| *x /= norm);
        mv.iter_mut().for_each(|x| *x /= norm);
        Some(mv)
    }

    fn random_block(rng: &mut ChaCha8Rng, n: usize, size: usize) -> Vec<Vec<f64>> {
        (0..size)
            .map(|_| (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect()
    }
}

impl GeneralizedEigenSolver for ShiftInvertLanczos {
    fn smallest_eigenpairs(&self, problem: &EigenProblem<'_>, count: usize) -> Result<Vec<EigenPair>> {
        let n = problem.dim();
        if !(problem.scale > 0.0) {
            return Err(FractureError::convergence("stiffness operator has a zero diagonal"));
        }

        let sigma = -self.shift_fraction * problem.scale;
        let shifted = ShiftedOperator {
            stiffness: problem.stiffness,
            mass: problem.mass,
            sigma,
        };
        let diag: Vec<f64> = (0..n)
            .map(|i| {
                let k = problem.stiffness.get(i, i).copied().unwrap_or(0.0);
                let m = problem.mass.get(i, i).copied().unwrap_or(0.0);
                k - sigma * m
            })
            .collect();
        let precond = JacobiPreconditioner::from_diagonal(&diag);
        let cg = ConjugateGradient::new()
            .with_tolerance(self.linear_tolerance)
            .with_max_iterations(self.linear_max_iterations);

        // A v = (K - σM)⁻¹ M v
        let apply_operator = |v: &[f64]| -> Result<Vec<f64>> {
            let mv = problem.mass.apply(v);
            let (x, stats) = cg.solve_with_operator(&shifted, &mv, &precond);
            if !stats.converged {
                return Err(FractureError::convergence(format!(
                    "inner {} solve stalled at relative residual {:.3e} after {} iterations",
                    cg.name(),
                    stats.relative_residual,
                    stats.iterations
                )));
            }
            Ok(x)
        };

        // Deflate the known null space
        let mut deflation: Vec<Vec<f64>> = Vec::new();
        let mut deflation_m: Vec<Vec<f64>> = Vec::new();
        for z in problem.null_space {
            let mut z = z.clone();
            if let Some(mz) = Self::orthonormalize(problem.mass, &mut z, &[deflation.as_slice(), &[]], &[deflation_m.as_slice(), &[]]) {
                deflation.push(z);
                deflation_m.push(mz);
            }
        }

        let space = n.saturating_sub(deflation.len());
        let max_basis = self.max_basis.min(space);
        let mut basis = KrylovBasis {
            v: Vec::new(),
            mv: Vec::new(),
            w: Vec::new(),
            h: Vec::new(),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut block = Self::random_block(&mut rng, n, self.block_size);
        let mut fresh_block = true;

        loop {
            // Extend the basis with the current block
            let start = basis.len();
            for mut v in block.drain(..) {
                if basis.len() >= max_basis {
                    break;
                }
                let Some(mv) = Self::orthonormalize(
                    problem.mass,
                    &mut v,
                    &[deflation.as_slice(), basis.v.as_slice()],
                    &[deflation_m.as_slice(), basis.mv.as_slice()],
                ) else {
                    continue;
                };
                let w = apply_operator(&v)?;

                // New row/column of H, symmetrized
                let j = basis.len();
                let mut row = Vec::with_capacity(j + 1);
                for i in 0..j {
                    let hij = 0.5 * (SolverUtils::dot(&basis.mv[i], &w) + SolverUtils::dot(&mv, &basis.w[i]));
                    basis.h[i].push(hij);
                    row.push(hij);
                }
                row.push(SolverUtils::dot(&mv, &w));

                basis.v.push(v);
                basis.mv.push(mv);
                basis.w.push(w);
                basis.h.push(row);
            }
            let added = basis.len() - start;

            if added == 0 {
                if fresh_block || basis.len() >= max_basis {
                    break;
                }
                // Invariant subspace reached; restart with random directions
                block = Self::random_block(&mut rng, n, self.block_size);
                fresh_block = true;
                continue;
            }
            fresh_block = false;

            if basis.len() >= count {
                if let Some(pairs) = self.converged_pairs(problem, &basis, sigma, count)? {
                    debug!(basis = basis.len(), sigma, "block Lanczos converged");
                    return Ok(pairs);
                }
            }

            if basis.len() >= max_basis {
                break;
            }
            block = basis.w[start..].to_vec();
        }

        // Basis is exhausted or the budget is spent
        let admissible = self.admissible_ritz_count(problem, &basis, sigma);
        if basis.len() >= space || admissible < count && basis.len() < max_basis {
            Err(FractureError::InsufficientModes {
                requested: count,
                available: admissible,
            })
        } else {
            Err(FractureError::convergence(format!(
                "block Lanczos: {count} eigenpairs not converged with a basis of {}",
                basis.len()
            )))
        }
    }

    fn name(&self) -> &str {
        "shift-invert block Lanczos"
    }
}

impl ShiftInvertLanczos {
    fn ritz_decomposition(basis: &KrylovBasis) -> (Vec<f64>, DMatrix<f64>) {
        let m = basis.len();
        let h = DMatrix::from_fn(m, m, |i, j| basis.h[i][j]);
        let eig = h.symmetric_eigen();
        (eig.eigenvalues.iter().copied().collect(), eig.eigenvectors)
    }

    fn admissible_ritz_count(&self, problem: &EigenProblem<'_>, basis: &KrylovBasis, sigma: f64) -> usize {
        if basis.len() == 0 {
            return 0;
        }
        let (thetas, _) = Self::ritz_decomposition(basis);
        thetas
            .into_iter()
            .filter(|&theta| theta > 0.0 && sigma + 1.0 / theta > problem.zero_cutoff)
            .count()
    }

    /// Ritz pairs for the `count` smallest admissible eigenvalues, or `None`
    /// while one of them has not converged.
    fn converged_pairs(
        &self,
        problem: &EigenProblem<'_>,
        basis: &KrylovBasis,
        sigma: f64,
        count: usize,
    ) -> Result<Option<Vec<EigenPair>>> {
        let (thetas, s) = Self::ritz_decomposition(basis);
        let mut order: Vec<usize> = (0..thetas.len()).collect();
        order.sort_by(|&a, &b| thetas[b].total_cmp(&thetas[a]));

        let n = problem.dim();
        let mut pairs = Vec::with_capacity(count);

        for idx in order {
            let theta = thetas[idx];
            if !(theta > 0.0) {
                break;
            }
            let lambda = sigma + 1.0 / theta;

            // x = V s, r = W s - θ x
            let mut x = vec![0.0; n];
            let mut r = vec![0.0; n];
            for (k, coef) in s.column(idx).iter().enumerate() {
                SolverUtils::axpy(*coef, &basis.v[k], &mut x);
                SolverUtils::axpy(*coef, &basis.w[k], &mut r);
            }
            SolverUtils::axpy(-theta, &x, &mut r);
            let residual = SolverUtils::dot(&r, &problem.mass.apply(&r)).max(0.0).sqrt();

            if lambda <= problem.zero_cutoff {
                trace!(lambda, "skipping rigid Ritz value");
                continue;
            }
            if residual > self.tolerance * theta {
                trace!(lambda, residual, found = pairs.len(), "Ritz pair not converged yet");
                return Ok(None);
            }

            normalize_sign(&mut x);
            pairs.push(EigenPair { value: lambda, vector: x });
            if pairs.len() == count {
                return Ok(Some(pairs));
            }
        }

        Ok(None)
    }
}
