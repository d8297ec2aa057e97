/// Constitutive model for the elastic (d = 3) fracture operator
///
/// Implements the material stiffness matrix (D) that relates stress to strain.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{FractureError, Result};

/// Isotropic linear elastic material
///
/// Characterized by Young's modulus E and Poisson's ratio ν.
/// Fracture modes are scale invariant in E, so the default is E = 1.
///
/// # References
/// - Zienkiewicz & Taylor, "The Finite Element Method", Vol. 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsotropicElasticity {
    pub youngs_modulus: f64, // E
    pub poisson_ratio: f64,  // ν (dimensionless)
}

impl Default for IsotropicElasticity {
    fn default() -> Self {
        Self {
            youngs_modulus: 1.0,
            poisson_ratio: 0.3,
        }
    }
}

impl IsotropicElasticity {
    /// Create new isotropic elastic material
    ///
    /// # Errors
    /// `InvalidConfig` if E ≤ 0 or ν is outside (-1, 0.5)
    pub fn new(youngs_modulus: f64, poisson_ratio: f64) -> Result<Self> {
        let material = Self {
            youngs_modulus,
            poisson_ratio,
        };
        material.validate()?;
        Ok(material)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.youngs_modulus > 0.0) {
            return Err(FractureError::invalid_config(format!(
                "Young's modulus must be positive, got {}",
                self.youngs_modulus
            )));
        }
        if !(self.poisson_ratio > -1.0 && self.poisson_ratio < 0.5) {
            return Err(FractureError::invalid_config(format!(
                "Poisson's ratio must be in (-1, 0.5), got {}",
                self.poisson_ratio
            )));
        }
        Ok(())
    }

    /// Compute 6×6 constitutive matrix D for 3D elasticity
    ///
    /// Relates stress to strain in Voigt notation: σ = D ε
    ///
    /// Voigt ordering: [σ_xx, σ_yy, σ_zz, σ_xy, σ_yz, σ_zx]^T
    ///
    /// ```text
    /// D = (E / ((1+ν)(1-2ν))) ×
    ///     [1-ν    ν    ν    0      0      0   ]
    ///     [ ν   1-ν    ν    0      0      0   ]
    ///     [ ν    ν   1-ν    0      0      0   ]
    ///     [ 0    0    0  (1-2ν)/2  0      0   ]
    ///     [ 0    0    0    0   (1-2ν)/2   0   ]
    ///     [ 0    0    0    0      0   (1-2ν)/2]
    /// ```
    #[allow(non_snake_case)]
    pub fn constitutive_matrix(&self) -> SMatrix<f64, 6, 6> {
        let E = self.youngs_modulus;
        let nu = self.poisson_ratio;

        let factor = E / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let shear = (1.0 - 2.0 * nu) / 2.0;

        let mut D = SMatrix::<f64, 6, 6>::zeros();
        for i in 0..3 {
            for j in 0..3 {
                D[(i, j)] = if i == j { 1.0 - nu } else { nu };
            }
            D[(i + 3, i + 3)] = shear;
        }

        D * factor
    }

    /// Compute Lamé parameters (λ, μ)
    #[allow(non_snake_case)]
    pub fn lame_parameters(&self) -> (f64, f64) {
        let E = self.youngs_modulus;
        let nu = self.poisson_ratio;

        let lambda = (E * nu) / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = E / (2.0 * (1.0 + nu));

        (lambda, mu)
    }
}
