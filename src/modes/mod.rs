//! The per-object fracture-mode aggregate.
//!
//! [`FractureModes::compute_modes`] runs the expensive part once: adjacency,
//! operator assembly, the eigen-solve, per-tet mode values and the intrinsic
//! partition. Everything afterwards (impact projection, piece extraction)
//! borrows the aggregate immutably.

pub mod partition;

use nalgebra::Point3;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{FractureConfig, SolverConfig};
use crate::error::{FractureError, Result};
use crate::fem::{Assembler, ElasticOperators};
use crate::linalg::{EigenProblem, GeneralizedEigenSolver, ModalEigenSolver};
use crate::mechanics::IsotropicElasticity;
use crate::mesh::{EmbeddedSurface, SearchGrid, SurfaceMesh, TetAdjacency, VolumeMesh};

pub use partition::IntrinsicPartition;

/// Parameters of the mode computation
#[derive(Debug, Clone, PartialEq)]
pub struct ModeParameters {
    pub num_modes: usize,
    /// Field dimension, 1 or 3
    pub d: usize,
    pub verbose: bool,
    pub material: IsotropicElasticity,
    pub solver: SolverConfig,
    /// Relative to the bounding-box diagonal
    pub contact_tolerance: f64,
}

impl ModeParameters {
    pub fn new(num_modes: usize) -> Self {
        Self {
            num_modes,
            ..Self::from_config(&FractureConfig::default())
        }
    }

    pub fn with_field_dim(mut self, d: usize) -> Self {
        self.d = d;
        self
    }

    pub fn from_config(config: &FractureConfig) -> Self {
        Self {
            num_modes: config.num_modes,
            d: config.d,
            verbose: config.verbose,
            material: config.material,
            solver: config.solver.clone(),
            contact_tolerance: config.impact.contact_tolerance,
        }
    }
}

/// Low-frequency generalized eigenpairs of (K, M)
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSet {
    /// Ascending, all above the rigid cutoff
    pub eigenvalues: Vec<f64>,
    /// Each of length N·d, M-normalized, largest-magnitude entry positive
    pub eigenvectors: Vec<Vec<f64>>,
    pub field_dim: usize,
}

impl ModeSet {
    pub fn num_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Components of mode `k` at vertex `node`
    pub fn value_at(&self, k: usize, node: usize) -> &[f64] {
        let d = self.field_dim;
        &self.eigenvectors[k][node * d..(node + 1) * d]
    }
}

/// Display surface (and optional interior surface) embedded in the volume
#[derive(Debug, Clone)]
pub struct SurfaceEmbedding {
    pub display: EmbeddedSurface,
    pub interior: Option<EmbeddedSurface>,
}

/// Immutable per-object aggregate
#[derive(Debug, Clone)]
pub struct FractureModes {
    mesh: VolumeMesh,
    adjacency: TetAdjacency,
    grid: SearchGrid,
    operators: ElasticOperators,
    modes: ModeSet,
    /// Per mode: mean of the tet's vertex values, d components per tet
    tet_values: Vec<Vec<f64>>,
    /// Per mode: norm of the (constant) mode gradient in each tet
    gradient_norms: Vec<Vec<f64>>,
    max_gradient: Vec<f64>,
    partition: IntrinsicPartition,
    embedding: Option<SurfaceEmbedding>,
    parameters: ModeParameters,
}

impl FractureModes {
    /// Compute the fracture modes of a volume mesh with the configured solver
    pub fn compute_modes(mesh: VolumeMesh, parameters: ModeParameters) -> Result<Self> {
        let solver = ModalEigenSolver::new(parameters.solver.clone());
        Self::compute_modes_with(mesh, parameters, &solver)
    }

    /// Compute the fracture modes with an explicit eigensolver
    ///
    /// # Errors
    /// `InvalidMesh` for non-manifold or disconnected meshes, `InvalidConfig` for bad
    /// parameters, and whatever the eigensolver reports.
    pub fn compute_modes_with(
        mesh: VolumeMesh,
        parameters: ModeParameters,
        solver: &dyn GeneralizedEigenSolver,
    ) -> Result<Self> {
        if parameters.num_modes == 0 {
            return Err(FractureError::invalid_config("num_modes must be at least 1"));
        }
        let start = Instant::now();
        let d = parameters.d;

        let adjacency = TetAdjacency::build(&mesh)?;
        let components = adjacency.num_components();
        if components != 1 {
            return Err(FractureError::invalid_mesh(format!(
                "volume mesh has {components} face-connected components, expected one"
            )));
        }
        let grid = SearchGrid::for_mesh(&mesh);
        let operators = Assembler::assemble_operators(&mesh, d, &parameters.material)?;

        let null_space = operators.rigid_modes(&mesh);
        let problem = EigenProblem::new(&operators, &null_space, parameters.solver.zero_tolerance);
        let pairs = solver.smallest_eigenpairs(&problem, parameters.num_modes)?;

        let modes = ModeSet {
            eigenvalues: pairs.iter().map(|p| p.value).collect(),
            eigenvectors: pairs.into_iter().map(|p| p.vector).collect(),
            field_dim: d,
        };

        let gradients = Assembler::shape_gradients(&mesh)?;
        let mut tet_values = Vec::with_capacity(modes.num_modes());
        let mut gradient_norms = Vec::with_capacity(modes.num_modes());
        for k in 0..modes.num_modes() {
            let mut values = vec![0.0; mesh.num_tets() * d];
            let mut norms = Vec::with_capacity(mesh.num_tets());
            for (t, (tet, grads)) in mesh.tets().iter().zip(&gradients).enumerate() {
                let mut frobenius = 0.0;
                for c in 0..d {
                    let mut grad = nalgebra::Vector3::zeros();
                    let mut mean = 0.0;
                    for (&node, g) in tet.iter().zip(grads) {
                        let v = modes.value_at(k, node)[c];
                        mean += 0.25 * v;
                        grad += g * v;
                    }
                    values[t * d + c] = mean;
                    frobenius += grad.norm_squared();
                }
                norms.push(frobenius.sqrt());
            }
            tet_values.push(values);
            gradient_norms.push(norms);
        }
        let max_gradient = gradient_norms
            .iter()
            .map(|norms| norms.iter().copied().fold(0.0, f64::max))
            .collect();

        let partition = IntrinsicPartition::build(&adjacency, mesh.volumes(), &tet_values, d);

        let elapsed = start.elapsed().as_secs_f64();
        if parameters.verbose {
            info!(
                modes = modes.num_modes(),
                dofs = operators.num_dofs(),
                pieces = partition.num_pieces,
                elapsed,
                "computed fracture modes"
            );
        } else {
            debug!(modes = modes.num_modes(), pieces = partition.num_pieces, elapsed, "computed fracture modes");
        }

        Ok(Self {
            mesh,
            adjacency,
            grid,
            operators,
            modes,
            tet_values,
            gradient_norms,
            max_gradient,
            partition,
            embedding: None,
            parameters,
        })
    }

    /// Embed the fine display surface (and optional interior surface)
    ///
    /// # Errors
    /// `Embedding` if a vertex lies farther than
    /// `contact_tolerance · diagonal` from the volume mesh.
    pub fn impact_precomputation(mut self, display: SurfaceMesh, interior: Option<SurfaceMesh>) -> Result<Self> {
        let max_distance = self.parameters.contact_tolerance * self.mesh.diagonal();
        let embedded = EmbeddedSurface::build(&self.mesh, &self.grid, display, max_distance)?;
        let interior = interior
            .map(|surface| EmbeddedSurface::build(&self.mesh, &self.grid, surface, max_distance))
            .transpose()?;

        let display_vertices = embedded.surface.num_vertices();
        let interior_vertices = interior.as_ref().map_or(0, |s| s.surface.num_vertices());
        debug!(display_vertices, interior_vertices, "embedded surfaces");
        self.embedding = Some(SurfaceEmbedding {
            display: embedded,
            interior,
        });
        Ok(self)
    }

    pub fn mesh(&self) -> &VolumeMesh {
        &self.mesh
    }

    pub fn adjacency(&self) -> &TetAdjacency {
        &self.adjacency
    }

    pub fn grid(&self) -> &SearchGrid {
        &self.grid
    }

    pub fn operators(&self) -> &ElasticOperators {
        &self.operators
    }

    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    pub fn partition(&self) -> &IntrinsicPartition {
        &self.partition
    }

    pub fn embedding(&self) -> Option<&SurfaceEmbedding> {
        self.embedding.as_ref()
    }

    pub fn parameters(&self) -> &ModeParameters {
        &self.parameters
    }

    pub fn field_dim(&self) -> usize {
        self.modes.field_dim
    }

    /// Per-tet values of mode `k` (d components per tet)
    pub fn tet_values(&self, k: usize) -> &[f64] {
        &self.tet_values[k]
    }

    /// Gradient norm of mode `k` in `tet`, relative to its maximum over tets
    pub fn relative_excitation(&self, k: usize, tet: usize) -> f64 {
        let max = self.max_gradient[k];
        if max > 0.0 {
            self.gradient_norms[k][tet] / max
        } else {
            0.0
        }
    }

    /// Value of mode `k` at a point given by barycentric weights in `tet`
    pub fn mode_at(&self, k: usize, tet: usize, weights: &[f64; 4]) -> Vec<f64> {
        let d = self.field_dim();
        let mut out = vec![0.0; d];
        for (&node, &w) in self.mesh.tets()[tet].iter().zip(weights) {
            for (o, v) in out.iter_mut().zip(self.modes.value_at(k, node)) {
                *o += w * v;
            }
        }
        out
    }

    /// Mode `k` interpolated on the display surface vertices, if embedded
    pub fn surface_mode(&self, k: usize) -> Option<Vec<f64>> {
        self.embedding
            .as_ref()
            .map(|e| e.display.interpolate(&self.mesh, &self.modes.eigenvectors[k], self.field_dim()))
    }

    pub fn centroid(&self) -> Point3<f64> {
        self.mesh.centroid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_modes_of_box() {
        let mesh = MeshGenerator::generate_box(5, 3, 2, 2.0, 1.0, 0.7).unwrap();
        let modes = FractureModes::compute_modes(mesh, ModeParameters::new(3)).unwrap();

        let values = &modes.modes().eigenvalues;
        assert_eq!(values.len(), 3);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        // Lowest Neumann mode of a 2 x 1 x 0.7 box is cos(πx/2): λ = π²/4
        let expected = std::f64::consts::PI.powi(2) / 4.0;
        assert!((values[0] - expected).abs() / expected < 0.1);
        assert!(modes.partition().num_pieces >= 2);
    }

    #[test]
    fn test_mode_at_vertex_matches_vector() {
        let mesh = MeshGenerator::generate_box(3, 2, 2, 1.5, 1.0, 1.0).unwrap();
        let modes = FractureModes::compute_modes(mesh, ModeParameters::new(2)).unwrap();
        let tet = 5;
        let node = modes.mesh().tets()[tet][2];
        let v = modes.mode_at(1, tet, &[0.0, 0.0, 1.0, 0.0]);
        assert_relative_eq!(v[0], modes.modes().value_at(1, node)[0], epsilon = 1e-14);
    }

    #[test]
    fn test_precomputation_caches_embedding() {
        let mesh = MeshGenerator::generate_box(3, 2, 2, 1.5, 1.0, 1.0).unwrap();
        let modes = FractureModes::compute_modes(mesh, ModeParameters::new(2)).unwrap();
        let surface = SurfaceMesh::boundary_of(modes.mesh(), modes.adjacency());
        let n = surface.num_vertices();

        let modes = modes.impact_precomputation(surface, None).unwrap();
        assert!(modes.embedding().is_some());
        assert_eq!(modes.surface_mode(0).unwrap().len(), n);
    }

    #[test]
    fn test_disconnected_mesh_rejected() {
        let block = MeshGenerator::generate_box(2, 2, 2, 1.0, 1.0, 1.0).unwrap();
        let offset = block.num_nodes();
        let mut nodes = block.nodes().to_vec();
        nodes.extend(block.nodes().iter().map(|p| p + nalgebra::Vector3::new(3.0, 0.0, 0.0)));
        let mut tets = block.tets().to_vec();
        tets.extend(block.tets().iter().map(|t| t.map(|v| v + offset)));
        let mesh = VolumeMesh::new(nodes, tets).unwrap();

        let err = FractureModes::compute_modes(mesh, ModeParameters::new(2)).unwrap_err();
        assert!(matches!(err, FractureError::InvalidMesh(_)));
    }

    #[test]
    fn test_zero_modes_rejected() {
        let mesh = MeshGenerator::generate_box(2, 2, 2, 1.0, 1.0, 1.0).unwrap();
        assert!(FractureModes::compute_modes(mesh, ModeParameters::new(0)).is_err());
    }
}
