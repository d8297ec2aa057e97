pub mod dense_eigen;
pub mod eigen;
pub mod iterative;
pub mod lanczos;
pub mod preconditioner;
pub mod solver;

pub use dense_eigen::DenseEigenSolver;
pub use eigen::{normalize_sign, EigenPair, EigenProblem, GeneralizedEigenSolver, ModalEigenSolver};
pub use iterative::ConjugateGradient;
pub use lanczos::ShiftInvertLanczos;
pub use preconditioner::{JacobiPreconditioner, Preconditioner};
pub use solver::{LinearOperator, Solver, SolverStats, SolverUtils};
