pub mod geometry;
pub mod labeling;
pub mod sampling;
pub mod search;
pub mod surface;
pub mod tetgen;
pub mod topology;

pub use geometry::{compute_tet_jacobian, VolumeMesh};
pub use labeling::{connected_labels, UnionFind};
pub use sampling::sample_boundary_points;
pub use search::{Location, SearchGrid};
pub use surface::{EmbeddedSurface, SurfaceMesh};
pub use topology::{oriented_face, BoundaryFace, InteriorFace, TetAdjacency, TET_FACES};
