use sprs::CsMat;
use tracing::debug;

use super::dense_eigen::DenseEigenSolver;
use super::lanczos::ShiftInvertLanczos;
use crate::config::{EigenBackend, SolverConfig};
use crate::error::Result;
use crate::fem::ElasticOperators;

/// Generalized symmetric eigenproblem K x = λ M x
///
/// `null_space` spans the known kernel of K (rigid motions); `zero_cutoff`
/// separates rigid eigenvalues from admissible ones.
pub struct EigenProblem<'a> {
    pub stiffness: &'a CsMat<f64>,
    pub mass: &'a CsMat<f64>,
    pub null_space: &'a [Vec<f64>],
    /// tr(K) / tr(M)
    pub scale: f64,
    pub zero_cutoff: f64,
}

impl<'a> EigenProblem<'a> {
    pub fn new(operators: &'a ElasticOperators, null_space: &'a [Vec<f64>], zero_tolerance: f64) -> Self {
        let scale = operators.spectral_scale();
        Self {
            stiffness: &operators.stiffness,
            mass: &operators.mass,
            null_space,
            scale,
            zero_cutoff: zero_tolerance * scale,
        }
    }

    pub fn dim(&self) -> usize {
        self.mass.rows()
    }
}

/// One eigenpair, `vector` M-normalized
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Vec<f64>,
}

/// Solver for the smallest admissible generalized eigenpairs
pub trait GeneralizedEigenSolver: Sync {
    /// Smallest `count` eigenpairs above the zero cutoff, ascending
    ///
    /// # Errors
    /// `InsufficientModes` when fewer admissible pairs exist,
    /// `Convergence` when the iteration budget runs out.
    fn smallest_eigenpairs(&self, problem: &EigenProblem<'_>, count: usize) -> Result<Vec<EigenPair>>;

    fn name(&self) -> &str;
}

/// Flip `v` so its entry of largest magnitude is positive
pub fn normalize_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()).then(b.0.cmp(&a.0)))
        .map(|(_, x)| x)
        .unwrap_or(0.0);
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
}

/// Backend dispatcher driven by [`SolverConfig`]
#[derive(Debug, Clone)]
pub struct ModalEigenSolver {
    config: SolverConfig,
}

impl ModalEigenSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Backend used for a problem with `dofs` unknowns
    pub fn backend_for(&self, dofs: usize) -> EigenBackend {
        match self.config.backend {
            EigenBackend::Auto if dofs <= self.config.dense_threshold => EigenBackend::Dense,
            EigenBackend::Auto => EigenBackend::Lanczos,
            forced => forced,
        }
    }
}

impl GeneralizedEigenSolver for ModalEigenSolver {
    fn smallest_eigenpairs(&self, problem: &EigenProblem<'_>, count: usize) -> Result<Vec<EigenPair>> {
        let backend = self.backend_for(problem.dim());
        debug!(?backend, dofs = problem.dim(), count, "solving generalized eigenproblem");
        match backend {
            EigenBackend::Dense | EigenBackend::Auto => DenseEigenSolver.smallest_eigenpairs(problem, count),
            EigenBackend::Lanczos => ShiftInvertLanczos::from_config(&self.config).smallest_eigenpairs(problem, count),
        }
    }

    fn name(&self) -> &str {
        "modal"
    }
}
