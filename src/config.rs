//! Configuration management for fracture-mode generation
//!
//! Reads TOML configuration files. Every key has a default, so an empty file
//! (or no file) gives the standard setup: 20 scalar modes, unit material,
//! 80 impacts per object.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{FractureError, Result};
use crate::mechanics::IsotropicElasticity;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FractureConfig {
    /// Number of fracture modes to compute
    pub num_modes: usize,
    /// Field dimension: 1 (scalar) or 3 (vector)
    pub d: usize,
    pub verbose: bool,
    pub material: IsotropicElasticity,
    pub solver: SolverConfig,
    pub impact: ImpactConfig,
    pub batch: BatchConfig,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            num_modes: 20,
            d: 1,
            verbose: false,
            material: IsotropicElasticity::default(),
            solver: SolverConfig::default(),
            impact: ImpactConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Eigensolver backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EigenBackend {
    /// Dense below `dense_threshold` DOFs, Lanczos above
    Auto,
    Dense,
    Lanczos,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: EigenBackend,
    /// Relative Ritz residual accepted as converged
    pub tolerance: f64,
    /// Maximum Krylov basis size
    pub max_iterations: usize,
    pub block_size: usize,
    pub dense_threshold: usize,
    /// Shift σ = -shift_fraction · tr(K)/tr(M)
    pub shift_fraction: f64,
    /// Eigenvalues below zero_tolerance · tr(K)/tr(M) count as rigid
    pub zero_tolerance: f64,
    pub linear_tolerance: f64,
    pub linear_max_iterations: usize,
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: EigenBackend::Auto,
            tolerance: 1e-8,
            max_iterations: 600,
            block_size: 4,
            dense_threshold: 1500,
            shift_fraction: 1e-4,
            zero_tolerance: 1e-6,
            linear_tolerance: 1e-11,
            linear_max_iterations: 5000,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Fracture sensitivity; 0 never separates anything
    pub threshold: f64,
    /// Impact direction in field space; `[1.0]` is the isotropic default
    pub direction: Vec<f64>,
    /// Largest accepted distance from the mesh, relative to the bbox diagonal
    pub contact_tolerance: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            direction: vec![1.0],
            contact_tolerance: 1e-2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Fractures to write per object
    pub num_impacts: usize,
    /// Candidate contact points drawn per requested impact
    pub candidates_per_impact: usize,
    /// Binary encoding when true, TOML/OBJ otherwise
    pub compressed: bool,
    /// Worker threads (0 = one per core)
    pub workers: usize,
    pub seed: u64,
    /// Candidates evaluated per parallel wave
    pub wave_size: usize,
    pub min_pieces: usize,
    pub max_pieces: Option<usize>,
    /// Smallest accepted piece volume as a fraction of the total
    pub min_volume_fraction: f64,
    /// Skip labelings identical to one already written
    pub unique: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            num_impacts: 80,
            candidates_per_impact: 1000,
            compressed: true,
            workers: 0,
            seed: 0,
            wave_size: 64,
            min_pieces: 1,
            max_pieces: None,
            min_volume_fraction: 0.0,
            unique: false,
        }
    }
}

impl FractureConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: FractureConfig =
            toml::from_str(contents).map_err(|e| FractureError::invalid_config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.num_modes == 0 {
            return Err(FractureError::invalid_config("num_modes must be at least 1"));
        }
        if self.d != 1 && self.d != 3 {
            return Err(FractureError::invalid_config(format!("d must be 1 or 3, got {}", self.d)));
        }
        self.material.validate()?;

        let s = &self.solver;
        if !(s.tolerance > 0.0) || !(s.linear_tolerance > 0.0) {
            return Err(FractureError::invalid_config("solver tolerances must be positive"));
        }
        if s.block_size == 0 || s.max_iterations == 0 || s.linear_max_iterations == 0 {
            return Err(FractureError::invalid_config("solver sizes must be at least 1"));
        }
        if !(s.shift_fraction > 0.0) || !(s.zero_tolerance > 0.0) {
            return Err(FractureError::invalid_config("shift_fraction and zero_tolerance must be positive"));
        }

        if !self.impact.threshold.is_finite() || self.impact.direction.iter().any(|c| !c.is_finite()) {
            return Err(FractureError::invalid_config("impact threshold and direction must be finite"));
        }
        if !(self.impact.contact_tolerance >= 0.0) {
            return Err(FractureError::invalid_config("contact_tolerance must be non-negative"));
        }

        let b = &self.batch;
        if b.wave_size == 0 || b.candidates_per_impact == 0 {
            return Err(FractureError::invalid_config("wave_size and candidates_per_impact must be at least 1"));
        }
        if let Some(max) = b.max_pieces {
            if max < b.min_pieces {
                return Err(FractureError::invalid_config(format!(
                    "max_pieces ({max}) is below min_pieces ({})",
                    b.min_pieces
                )));
            }
        }
        if !(0.0..1.0).contains(&b.min_volume_fraction) {
            return Err(FractureError::invalid_config("min_volume_fraction must be in [0, 1)"));
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        info!(
            num_modes = self.num_modes,
            d = self.d,
            youngs_modulus = self.material.youngs_modulus,
            poisson_ratio = self.material.poisson_ratio,
            "fracture modes"
        );
        info!(
            backend = ?self.solver.backend,
            tolerance = self.solver.tolerance,
            block_size = self.solver.block_size,
            seed = self.solver.seed,
            "eigensolver"
        );
        info!(
            threshold = self.impact.threshold,
            direction = ?self.impact.direction,
            num_impacts = self.batch.num_impacts,
            candidates = self.batch.num_impacts * self.batch.candidates_per_impact,
            compressed = self.batch.compressed,
            workers = self.batch.workers,
            "impacts"
        );
    }
}
