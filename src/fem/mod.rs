pub mod assembly;
pub mod dof;
pub mod element;
pub mod operators;

pub use assembly::Assembler;
pub use dof::DofManager;
pub use element::ElementMatrix;
pub use operators::ElasticOperators;
