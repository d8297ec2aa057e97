//! Wavefront OBJ encoding of piece meshes.
//!
//! Written files carry the piece label and volume as `# label <n>` and
//! `# volume <v>` comments ahead of the `v`/`f` records. Coordinates use the
//! shortest decimal representation that parses back to the same `f64`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::extract::PieceMesh;
use crate::error::{FractureError, Result};

pub fn to_obj_string(piece: &PieceMesh) -> String {
    let mut out = String::with_capacity(32 * (piece.vertices.len() + piece.faces.len()) + 64);
    // Writing into a String cannot fail
    let _ = writeln!(out, "# label {}", piece.label);
    let _ = writeln!(out, "# volume {}", piece.volume);
    for [x, y, z] in &piece.vertices {
        let _ = writeln!(out, "v {x} {y} {z}");
    }
    for [a, b, c] in &piece.faces {
        let _ = writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1);
    }
    out
}

pub fn write_obj(piece: &PieceMesh, path: &Path) -> Result<()> {
    fs::write(path, to_obj_string(piece))?;
    Ok(())
}

pub fn read_obj(path: &Path) -> Result<PieceMesh> {
    let text = fs::read_to_string(path)?;
    parse_obj(path, &text)
}

/// Parse OBJ text
///
/// Accepts `v`, `f` and comment records and ignores everything else
/// (normals, texture coordinates, groups). Face corners may be written as
/// `i`, `i/t`, `i//n` or `i/t/n`, with negative indices counted from the
/// latest vertex. Polygons are fan-triangulated.
pub fn parse_obj(path: &Path, text: &str) -> Result<PieceMesh> {
    let mut piece = PieceMesh {
        label: 0,
        vertices: Vec::new(),
        faces: Vec::new(),
        volume: 0.0,
    };

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let mut tokens = raw.split_whitespace();
        match tokens.next() {
            Some("#") => match (tokens.next(), tokens.next()) {
                (Some("label"), Some(value)) => {
                    piece.label = value
                        .parse()
                        .map_err(|_| FractureError::format(path, line, format!("bad label '{value}'")))?;
                }
                (Some("volume"), Some(value)) => {
                    piece.volume = value
                        .parse()
                        .map_err(|_| FractureError::format(path, line, format!("bad volume '{value}'")))?;
                }
                _ => {}
            },
            Some("v") => {
                let mut coords = [0.0; 3];
                for c in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| FractureError::format(path, line, "vertex needs three coordinates"))?;
                    *c = token
                        .parse()
                        .map_err(|_| FractureError::format(path, line, format!("bad coordinate '{token}'")))?;
                }
                piece.vertices.push(coords);
            }
            Some("f") => {
                let corners = tokens
                    .map(|token| resolve_index(token, piece.vertices.len()))
                    .collect::<Option<Vec<usize>>>()
                    .ok_or_else(|| FractureError::format(path, line, "face index out of range"))?;
                if corners.len() < 3 {
                    return Err(FractureError::format(path, line, "face needs at least three corners"));
                }
                for i in 1..corners.len() - 1 {
                    piece.faces.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    Ok(piece)
}

fn resolve_index(token: &str, num_vertices: usize) -> Option<usize> {
    let index: i64 = token.split('/').next()?.parse().ok()?;
    let resolved = if index > 0 {
        index - 1
    } else {
        num_vertices as i64 + index
    };
    (0..num_vertices as i64).contains(&resolved).then_some(resolved as usize)
}
