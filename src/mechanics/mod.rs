/// Solid mechanics for the elastic (d = 3) fracture operator
///
/// This module provides:
/// - Linear elastic constitutive model
/// - Strain-displacement relationship
/// - Element stiffness and mass matrices for linear tetrahedra

pub mod constitutive;
pub mod element;
pub mod strain;

pub use constitutive::IsotropicElasticity;
pub use element::ElasticityElement;
pub use strain::StrainDisplacement;
