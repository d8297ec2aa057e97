pub mod error;
pub mod config;
pub mod mesh;
pub mod mesh_generator;
pub mod fem;
pub mod mechanics;
pub mod linalg;
pub mod modes;  // Eigen-solve, intrinsic partition
pub mod impact; // Per-impact segmentation
pub mod export;
pub mod batch;

pub use error::{BatchError, FractureError, Result};
pub use config::{BatchConfig, EigenBackend, FractureConfig, ImpactConfig, SolverConfig};
pub use mesh::{EmbeddedSurface, SearchGrid, SurfaceMesh, TetAdjacency, VolumeMesh, connected_labels, sample_boundary_points};
pub use mesh_generator::MeshGenerator;
pub use fem::{Assembler, DofManager, ElasticOperators, ElementMatrix};
pub use linalg::{ConjugateGradient, DenseEigenSolver, EigenPair, EigenProblem, GeneralizedEigenSolver, ModalEigenSolver, ShiftInvertLanczos, Solver};
pub use mechanics::{ElasticityElement, IsotropicElasticity, StrainDisplacement};
pub use modes::{FractureModes, IntrinsicPartition, ModeParameters, ModeSet};
pub use impact::{Impact, ImpactState};
pub use export::{extract_pieces, read_generic, read_piece, read_pieces_dir, write_generic, write_pieces, write_segmented_modes, GenericRecord, PieceMesh};
pub use batch::{run_objects, BatchDriver, BatchReport, DirectorySink, FractureSink, MeshExtractor, ObjectInput, PieceExtractor};
