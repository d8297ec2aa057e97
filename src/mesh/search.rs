use nalgebra::{Matrix3, Point3, Vector3};
use rayon::prelude::*;

use super::geometry::VolumeMesh;
use super::topology::TET_FACES;

/// Barycentric slack accepted when testing point containment.
pub const CONTAINMENT_EPS: f64 = 1e-9;

/// Result of locating a point in a volume mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub tet: usize,
    /// Barycentric weights, clamped to [0, 1] and renormalized
    pub weights: [f64; 4],
    /// 0 when the point lies inside `tet`
    pub distance: f64,
}

/// A spatial grid to speed up point-in-tetrahedron searches.
#[derive(Debug, Clone)]
pub struct SearchGrid {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub cell_size: Vector3<f64>,
    /// Maps grid cell to the tetrahedra whose bounding box overlaps it.
    pub cells: Vec<Vec<usize>>,
}

impl SearchGrid {
    /// Build a search grid sized for the mesh (a few tetrahedra per cell)
    pub fn for_mesh(mesh: &VolumeMesh) -> Self {
        let cells = (mesh.num_tets() as f64 / 4.0).cbrt().ceil().max(1.0) as usize;
        Self::build(mesh, [cells.min(64); 3])
    }

    /// Build a search grid for a given mesh.
    pub fn build(mesh: &VolumeMesh, resolution: [usize; 3]) -> Self {
        let (mut min, mut max) = mesh.bounding_box();

        // Small padding to avoid boundary issues
        let extent = max - min;
        let padding = 1e-4 * extent.x.max(extent.y).max(extent.z);
        min -= Vector3::repeat(padding);
        max += Vector3::repeat(padding);

        let cell_size = Vector3::new(
            (max.x - min.x) / resolution[0] as f64,
            (max.y - min.y) / resolution[1] as f64,
            (max.z - min.z) / resolution[2] as f64,
        );

        let n_cells = resolution[0] * resolution[1] * resolution[2];
        let mut cells = vec![Vec::new(); n_cells];

        for tet in 0..mesh.num_tets() {
            let corners = mesh.tet_vertices(tet);
            let mut e_min = corners[0];
            let mut e_max = corners[0];
            for p in &corners[1..] {
                e_min = e_min.inf(p);
                e_max = e_max.sup(p);
            }

            let lo = Self::cell_coords(&min, &cell_size, resolution, &e_min);
            let hi = Self::cell_coords(&min, &cell_size, resolution, &e_max);

            for iz in lo[2]..=hi[2] {
                for iy in lo[1]..=hi[1] {
                    for ix in lo[0]..=hi[0] {
                        cells[ix + iy * resolution[0] + iz * resolution[0] * resolution[1]].push(tet);
                    }
                }
            }
        }

        Self {
            min,
            max,
            nx: resolution[0],
            ny: resolution[1],
            nz: resolution[2],
            cell_size,
            cells,
        }
    }

    fn cell_coords(min: &Point3<f64>, cell_size: &Vector3<f64>, resolution: [usize; 3], p: &Point3<f64>) -> [usize; 3] {
        let mut out = [0; 3];
        for axis in 0..3 {
            let f = ((p[axis] - min[axis]) / cell_size[axis]).floor().max(0.0) as usize;
            out[axis] = f.min(resolution[axis] - 1);
        }
        out
    }

    /// Get potential tetrahedra containing the point.
    pub fn get_potential_elements(&self, p: &Point3<f64>) -> &[usize] {
        if p.x < self.min.x || p.x > self.max.x || p.y < self.min.y || p.y > self.max.y || p.z < self.min.z || p.z > self.max.z {
            return &[];
        }
        let [ix, iy, iz] = Self::cell_coords(&self.min, &self.cell_size, [self.nx, self.ny, self.nz], p);
        &self.cells[ix + iy * self.nx + iz * self.nx * self.ny]
    }

    /// Locate the tetrahedron containing `p`, or else the nearest one.
    ///
    /// Containment is tested through the grid first; the nearest-tet fallback
    /// scans every tetrahedron. The distance is returned so callers can apply
    /// their own tolerance and report it.
    pub fn locate(&self, mesh: &VolumeMesh, p: &Point3<f64>) -> Option<Location> {
        for &tet in self.get_potential_elements(p) {
            let corners = mesh.tet_vertices(tet);
            if let Some(l) = cartesian_to_barycentric(p, &corners) {
                if l.iter().all(|&w| w >= -CONTAINMENT_EPS) {
                    return Some(Location {
                        tet,
                        weights: clamp_weights(l),
                        distance: 0.0,
                    });
                }
            }
        }

        (0..mesh.num_tets())
            .into_par_iter()
            .map(|tet| (tet, point_tet_distance(p, &mesh.tet_vertices(tet))))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(tet, distance)| {
                let corners = mesh.tet_vertices(tet);
                let weights = cartesian_to_barycentric(p, &corners)
                    .map(clamp_weights)
                    .unwrap_or([0.25; 4]);
                Location { tet, weights, distance }
            })
    }
}

/// Barycentric coordinates of `p` with respect to a tetrahedron
///
/// Returns `None` for a singular tetrahedron.
pub fn cartesian_to_barycentric(p: &Point3<f64>, vertices: &[Point3<f64>; 4]) -> Option<[f64; 4]> {
    let j = Matrix3::from_columns(&[
        vertices[1] - vertices[0],
        vertices[2] - vertices[0],
        vertices[3] - vertices[0],
    ]);
    let l = j.lu().solve(&(p - vertices[0]))?;
    Some([1.0 - l.x - l.y - l.z, l.x, l.y, l.z])
}

fn clamp_weights(l: [f64; 4]) -> [f64; 4] {
    let clamped = l.map(|w| w.clamp(0.0, 1.0));
    let sum: f64 = clamped.iter().sum();
    if sum > 0.0 {
        clamped.map(|w| w / sum)
    } else {
        [0.25; 4]
    }
}

/// Euclidean distance from a point to a (solid) tetrahedron
pub fn point_tet_distance(p: &Point3<f64>, vertices: &[Point3<f64>; 4]) -> f64 {
    if let Some(l) = cartesian_to_barycentric(p, vertices) {
        if l.iter().all(|&w| w >= -CONTAINMENT_EPS) {
            return 0.0;
        }
    }
    TET_FACES
        .iter()
        .map(|f| {
            let q = closest_point_on_triangle(p, &vertices[f[0]], &vertices[f[1]], &vertices[f[2]]);
            (p - q).norm()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Closest point on triangle `abc` to `p` (Voronoi-region walk)
pub fn closest_point_on_triangle(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
