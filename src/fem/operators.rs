use sprs::CsMat;

use crate::linalg::LinearOperator;
use crate::mesh::VolumeMesh;

/// Sparse mass and stiffness operators of the fracture-mode eigenproblem
///
/// `mass` is symmetric positive definite. `stiffness` is symmetric positive
/// semi-definite; its null space is the constants (d = 1) or the six rigid
/// motions (d = 3).
#[derive(Debug, Clone)]
pub struct ElasticOperators {
    pub mass: CsMat<f64>,
    pub stiffness: CsMat<f64>,
    pub field_dim: usize,
}

impl ElasticOperators {
    pub fn new(mass: CsMat<f64>, stiffness: CsMat<f64>, field_dim: usize) -> Self {
        Self {
            mass,
            stiffness,
            field_dim,
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.mass.rows()
    }

    /// tr(K) / tr(M), the scale used for the spectral shift and the
    /// zero-eigenvalue cutoff
    pub fn spectral_scale(&self) -> f64 {
        let trace = |m: &CsMat<f64>| (0..m.rows()).filter_map(|i| m.get(i, i)).sum::<f64>();
        let mass_trace = trace(&self.mass);
        if mass_trace > 0.0 {
            trace(&self.stiffness) / mass_trace
        } else {
            0.0
        }
    }

    /// M-inner product ⟨a, b⟩_M
    pub fn mass_dot(&self, a: &[f64], b: &[f64]) -> f64 {
        let mb = self.mass.apply(b);
        a.iter().zip(&mb).map(|(x, y)| x * y).sum()
    }

    /// Analytic basis of the stiffness null space
    ///
    /// One constant vector for d = 1; three translations and three
    /// infinitesimal rotations about the mesh centroid for d = 3. The vectors
    /// are not orthonormalized.
    pub fn rigid_modes(&self, mesh: &VolumeMesh) -> Vec<Vec<f64>> {
        let n = mesh.num_nodes();
        if self.field_dim == 1 {
            return vec![vec![1.0; n]];
        }

        let center = mesh.centroid();
        let mut modes = vec![vec![0.0; 3 * n]; 6];
        for (node, p) in mesh.nodes().iter().enumerate() {
            let r = p - center;
            let base = 3 * node;
            for axis in 0..3 {
                modes[axis][base + axis] = 1.0;
            }
            // ω × r for ω = e_x, e_y, e_z
            modes[3][base + 1] = -r.z;
            modes[3][base + 2] = r.y;
            modes[4][base] = r.z;
            modes[4][base + 2] = -r.x;
            modes[5][base] = -r.y;
            modes[5][base + 1] = r.x;
        }
        modes
    }
}
