//! Error types for fracture mode computation and export.

use std::path::{Path, PathBuf};

use nalgebra::Point3;
use thiserror::Error;

/// Errors raised while building the fracture-mode aggregate, projecting
/// impacts or writing pieces.
#[derive(Debug, Error)]
pub enum FractureError {
    /// Malformed or degenerate volume mesh (or surface) input.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// The operator has fewer admissible nonzero modes than requested.
    #[error("insufficient modes: requested {requested}, only {available} admissible")]
    InsufficientModes {
        /// Number of modes asked for.
        requested: usize,
        /// Number of nonzero modes the operator actually admits.
        available: usize,
    },

    /// The contact point is not within tolerance of any tetrahedron.
    #[error(
        "contact point ({:.6}, {:.6}, {:.6}) is {distance:.3e} away from the mesh (tolerance {tolerance:.3e})",
        .point.x, .point.y, .point.z
    )]
    UnlocatableContact {
        /// Requested contact point.
        point: Point3<f64>,
        /// Distance to the nearest tetrahedron.
        distance: f64,
        /// Largest accepted distance.
        tolerance: f64,
    },

    /// A labeled piece could not be turned into an exportable mesh.
    #[error("cannot extract piece {piece}: {reason}")]
    Extraction {
        /// Piece label.
        piece: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A display-surface vertex lies too far from the volume mesh.
    #[error("surface vertex {vertex} is {distance:.3e} away from the volume mesh")]
    Embedding {
        /// Index of the offending surface vertex.
        vertex: usize,
        /// Distance to the nearest tetrahedron.
        distance: f64,
    },

    /// The eigensolver or one of its inner linear solves did not converge.
    #[error("solver did not converge: {0}")]
    Convergence(String),

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed input file.
    #[error("{}:{line}: {message}", .path.display())]
    Format {
        /// File being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Binary or TOML encoding failure.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FractureError {
    /// Create an invalid mesh error.
    pub fn invalid_mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Create an extraction error for a piece.
    pub fn extraction(piece: usize, reason: impl Into<String>) -> Self {
        Self::Extraction {
            piece,
            reason: reason.into(),
        }
    }

    /// Create a convergence error.
    pub fn convergence(msg: impl Into<String>) -> Self {
        Self::Convergence(msg.into())
    }

    /// Create a parse error at a 1-based line of a file.
    pub fn format(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this error only invalidates one impact and the surrounding
    /// batch may continue with the next candidate.
    pub fn is_per_impact(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. } | Self::UnlocatableContact { .. } | Self::Io(_) | Self::Serialize(_)
        )
    }
}

/// Result type for fracture operations.
pub type Result<T> = std::result::Result<T, FractureError>;

/// A [`FractureError`] annotated with the object (and impact) it came from,
/// so a batch driver can log it and move on.
#[derive(Debug, Error)]
#[error("object '{object}'{}: {source}", .impact.map(|i| format!(", impact {i}")).unwrap_or_default())]
pub struct BatchError {
    /// Identifier of the object being processed.
    pub object: String,
    /// Candidate impact index, if the failure is per impact.
    pub impact: Option<usize>,
    /// Underlying error.
    #[source]
    pub source: FractureError,
}

impl BatchError {
    /// Wrap an object-level failure.
    pub fn object(object: impl Into<String>, source: FractureError) -> Self {
        Self {
            object: object.into(),
            impact: None,
            source,
        }
    }

    /// Wrap a per-impact failure.
    pub fn impact(object: impl Into<String>, impact: usize, source: FractureError) -> Self {
        Self {
            object: object.into(),
            impact: Some(impact),
            source,
        }
    }
}
