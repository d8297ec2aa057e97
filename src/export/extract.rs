use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FractureError, Result};
use crate::mesh::{oriented_face, EmbeddedSurface};
use crate::modes::{FractureModes, SurfaceEmbedding};

/// Smallest piece volume accepted for extraction, relative to the total
const MIN_RELATIVE_VOLUME: f64 = 1e-12;

/// Closed triangle mesh of one piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceMesh {
    pub label: usize,
    pub vertices: Vec<[f64; 3]>,
    /// Outward oriented, 0-based
    pub faces: Vec<[usize; 3]>,
    pub volume: f64,
}

impl PieceMesh {
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Volume enclosed by the triangles (divergence theorem)
    pub fn enclosed_volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.map(|i| self.vertices[i]);
                let cross = [
                    b[1] * c[2] - b[2] * c[1],
                    b[2] * c[0] - b[0] * c[2],
                    b[0] * c[1] - b[1] * c[0],
                ];
                (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]) / 6.0
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Source {
    Volume,
    Display,
    Interior,
}

type SourcedFace = (Source, [usize; 3]);

/// Turn a per-tet labeling into one closed surface per label
///
/// Fracture faces (between differently labeled tets) come from the volume
/// mesh. Faces on the object boundary come from the volume mesh too, unless
/// `use_embedding` is set and a display surface has been embedded, in which
/// case the display (and interior) triangles assigned to each label replace
/// them.
///
/// # Errors
/// `Extraction` for a labeling that does not match the mesh, a label outside
/// `0..piece_count`, or a label whose volume vanishes or that ends up with
/// no triangles.
pub fn extract_pieces(
    modes: &FractureModes,
    labels: &[usize],
    piece_count: usize,
    use_embedding: bool,
) -> Result<Vec<PieceMesh>> {
    let mesh = modes.mesh();
    let adjacency = modes.adjacency();
    let tets = mesh.tets();
    let embedding = modes.embedding().filter(|_| use_embedding);

    if labels.len() != mesh.num_tets() {
        return Err(FractureError::extraction(
            0,
            format!("{} labels for {} tetrahedra", labels.len(), mesh.num_tets()),
        ));
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= piece_count) {
        return Err(FractureError::extraction(
            label,
            format!("label out of range for {piece_count} pieces"),
        ));
    }

    let mut volumes = vec![0.0; piece_count];
    for (&label, &vol) in labels.iter().zip(mesh.volumes()) {
        volumes[label] += vol;
    }

    let mut faces: Vec<Vec<SourcedFace>> = vec![Vec::new(); piece_count];
    for face in adjacency.interior_faces() {
        let [a, b] = face.tets;
        if labels[a] != labels[b] {
            faces[labels[a]].push((Source::Volume, oriented_face(&tets[a], face.local_faces[0])));
            faces[labels[b]].push((Source::Volume, oriented_face(&tets[b], face.local_faces[1])));
        }
    }

    match embedding {
        Some(embedding) => {
            assign_surface(&embedding.display, Source::Display, labels, &mut faces);
            if let Some(interior) = &embedding.interior {
                assign_surface(interior, Source::Interior, labels, &mut faces);
            }
        }
        None => {
            for face in adjacency.boundary_faces() {
                faces[labels[face.tet]].push((Source::Volume, face.vertices));
            }
        }
    }

    let total = mesh.total_volume();
    faces
        .into_par_iter()
        .zip(volumes)
        .enumerate()
        .map(|(label, (faces, volume))| {
            if volume < MIN_RELATIVE_VOLUME * total {
                return Err(FractureError::extraction(label, format!("volume {volume:.3e} vanishes")));
            }
            if faces.is_empty() {
                return Err(FractureError::extraction(label, "no boundary triangles"));
            }
            Ok(compact(modes, embedding, label, &faces, volume))
        })
        .collect()
}

fn assign_surface(surface: &EmbeddedSurface, source: Source, labels: &[usize], faces: &mut [Vec<SourcedFace>]) {
    for (tri, label) in surface.surface.faces.iter().zip(surface.face_labels(labels)) {
        faces[label].push((source, *tri));
    }
}

fn compact(
    modes: &FractureModes,
    embedding: Option<&SurfaceEmbedding>,
    label: usize,
    faces: &[SourcedFace],
    volume: f64,
) -> PieceMesh {
    let position = |source: Source, v: usize| -> [f64; 3] {
        let p = match (source, embedding) {
            (Source::Display, Some(e)) => e.display.surface.vertices[v],
            (Source::Interior, Some(e)) => match &e.interior {
                Some(interior) => interior.surface.vertices[v],
                None => modes.mesh().nodes()[v],
            },
            _ => modes.mesh().nodes()[v],
        };
        [p.x, p.y, p.z]
    };

    let mut remap: HashMap<(Source, usize), usize> = HashMap::new();
    let mut vertices = Vec::new();
    let faces = faces
        .iter()
        .map(|&(source, tri)| {
            tri.map(|v| {
                *remap.entry((source, v)).or_insert_with(|| {
                    vertices.push(position(source, v));
                    vertices.len() - 1
                })
            })
        })
        .collect();

    PieceMesh {
        label,
        vertices,
        faces,
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SurfaceMesh;
    use crate::mesh_generator::MeshGenerator;
    use crate::modes::ModeParameters;
    use approx::assert_relative_eq;

    fn modes() -> FractureModes {
        let mesh = MeshGenerator::generate_box(4, 2, 2, 2.0, 1.0, 1.0).unwrap();
        FractureModes::compute_modes(mesh, ModeParameters::new(2)).unwrap()
    }

    #[test]
    fn test_single_piece_is_the_boundary() {
        let modes = modes();
        let labels = vec![0; modes.mesh().num_tets()];
        let pieces = extract_pieces(&modes, &labels, 1, false).unwrap();

        assert_eq!(pieces.len(), 1);
        // 2 * (4*2 + 4*2 + 2*2) quads, two triangles each
        assert_eq!(pieces[0].num_faces(), 80);
        assert_eq!(pieces[0].num_vertices(), 5 * 3 * 3 - 3);
        assert_relative_eq!(pieces[0].enclosed_volume(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(pieces[0].volume, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_split_pieces_are_closed() {
        let modes = modes();
        let mesh = modes.mesh();
        let labels: Vec<usize> = (0..mesh.num_tets())
            .map(|t| usize::from(mesh.tet_centroid(t).x > 1.0))
            .collect();
        let pieces = extract_pieces(&modes, &labels, 2, false).unwrap();

        for piece in &pieces {
            assert_relative_eq!(piece.enclosed_volume(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(piece.volume, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_label_fails() {
        let modes = modes();
        let labels = vec![0; modes.mesh().num_tets()];
        let err = extract_pieces(&modes, &labels, 2, false).unwrap_err();
        assert!(matches!(err, FractureError::Extraction { piece: 1, .. }));
    }

    #[test]
    fn test_out_of_range_label_fails() {
        let modes = modes();
        let mut labels = vec![0; modes.mesh().num_tets()];
        labels[3] = 5;
        let err = extract_pieces(&modes, &labels, 2, false).unwrap_err();
        assert!(matches!(err, FractureError::Extraction { piece: 5, .. }));

        let short = vec![0; 3];
        let err = extract_pieces(&modes, &short, 1, false).unwrap_err();
        assert!(matches!(err, FractureError::Extraction { .. }));
    }

    #[test]
    fn test_embedded_display_surface_replaces_boundary() {
        let modes = modes();
        let surface = SurfaceMesh::boundary_of(modes.mesh(), modes.adjacency());
        let modes = modes.impact_precomputation(surface, None).unwrap();
        let mesh = modes.mesh();
        let labels: Vec<usize> = (0..mesh.num_tets())
            .map(|t| usize::from(mesh.tet_centroid(t).x > 1.0))
            .collect();

        let pieces = extract_pieces(&modes, &labels, 2, true).unwrap();
        let total_faces: usize = pieces.iter().map(|p| p.num_faces()).sum();
        // 80 display triangles plus both sides of the 8-triangle cut
        assert_eq!(total_faces, 96);
        let enclosed: f64 = pieces.iter().map(|p| p.enclosed_volume()).sum();
        assert_relative_eq!(enclosed, 2.0, epsilon = 1e-9);
    }
}
