use nalgebra::Point3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::geometry::VolumeMesh;
use super::topology::TetAdjacency;

/// Draw `count` uniformly distributed points on the boundary of the mesh
///
/// Faces are picked with probability proportional to their area, then a
/// point is drawn uniformly inside the triangle. The same seed always gives
/// the same points.
pub fn sample_boundary_points(mesh: &VolumeMesh, adjacency: &TetAdjacency, count: usize, seed: u64) -> Vec<Point3<f64>> {
    let faces = adjacency.boundary_faces();
    if faces.is_empty() || count == 0 {
        return Vec::new();
    }

    // Cumulative face areas for inverse-CDF sampling
    let mut cumulative = Vec::with_capacity(faces.len());
    let mut total = 0.0;
    for face in faces {
        let [a, b, c] = face.vertices.map(|v| mesh.nodes()[v]);
        total += 0.5 * (b - a).cross(&(c - a)).norm();
        cumulative.push(total);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let target = rng.gen::<f64>() * total;
            let idx = cumulative.partition_point(|&c| c < target).min(faces.len() - 1);
            let [a, b, c] = faces[idx].vertices.map(|v| mesh.nodes()[v]);

            let (mut u, mut v) = (rng.gen::<f64>(), rng.gen::<f64>());
            if u + v > 1.0 {
                u = 1.0 - u;
                v = 1.0 - v;
            }
            a + (b - a) * u + (c - a) * v
        })
        .collect()
}
