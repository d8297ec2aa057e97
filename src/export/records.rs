use serde::{Deserialize, Serialize};

use crate::error::{FractureError, Result};
use crate::modes::FractureModes;

/// Impact-independent data of one object, written once per object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericRecord {
    pub field_dim: usize,
    pub num_vertices: usize,
    pub num_tets: usize,
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Vec<Vec<f64>>,
    pub mass_nnz: usize,
    pub stiffness_nnz: usize,
    pub intrinsic_piece_count: usize,
    pub tet_piece_ids: Vec<usize>,
}

impl GenericRecord {
    pub fn from_modes(modes: &FractureModes) -> Self {
        let operators = modes.operators();
        let partition = modes.partition();
        Self {
            field_dim: modes.field_dim(),
            num_vertices: modes.mesh().num_nodes(),
            num_tets: modes.mesh().num_tets(),
            eigenvalues: modes.modes().eigenvalues.clone(),
            eigenvectors: modes.modes().eigenvectors.clone(),
            mass_nnz: operators.mass.nnz(),
            stiffness_nnz: operators.stiffness.nnz(),
            intrinsic_piece_count: partition.num_pieces,
            tet_piece_ids: partition.tet_piece.clone(),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| FractureError::Serialize(e.to_string()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FractureError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip() {
        let record = GenericRecord {
            field_dim: 1,
            num_vertices: 3,
            num_tets: 2,
            eigenvalues: vec![2.4674011002723395, 9.869604401089358],
            eigenvectors: vec![vec![0.1, -0.7071067811865476, 1e-300], vec![1.0 / 3.0, 0.0, -2.5]],
            mass_nnz: 9,
            stiffness_nnz: 9,
            intrinsic_piece_count: 2,
            tet_piece_ids: vec![0, 1],
        };
        let text = record.to_toml().unwrap();
        assert!(text.contains("intrinsic_piece_count = 2"));
        assert_eq!(GenericRecord::from_toml(&text).unwrap(), record);
    }
}
