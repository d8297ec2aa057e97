//! Reader for TetGen `.node` / `.ele` files.
//!
//! `.node`: `<#points> <dim=3> <#attributes> <boundary marker 0|1>`, then one
//! line per point `<index> <x> <y> <z> [attributes] [marker]`.
//! `.ele`: `<#tets> <nodes per tet=4|10> <#attributes>`, then one line per
//! tetrahedron `<index> <n0> <n1> <n2> <n3> [...]`. Only the four corner
//! vertices of quadratic tetrahedra are used.
//!
//! The index of the first point decides whether indices are 0- or 1-based.
//! `#` starts a comment.

use nalgebra::Point3;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{FractureError, Result};

struct Lines<'a> {
    path: &'a Path,
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(path: &'a Path, text: &'a str) -> Self {
        Self {
            path,
            inner: text.lines().enumerate(),
        }
    }

    /// Next non-empty line with comments stripped, as (1-based line, tokens)
    fn next_tokens(&mut self) -> Option<(usize, Vec<&'a str>)> {
        for (idx, raw) in self.inner.by_ref() {
            let content = raw.split('#').next().unwrap_or("");
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if !tokens.is_empty() {
                return Some((idx + 1, tokens));
            }
        }
        None
    }

    fn expect_tokens(&mut self, what: &str, last_line: usize) -> Result<(usize, Vec<&'a str>)> {
        self.next_tokens()
            .ok_or_else(|| format_error(self.path, last_line, format!("unexpected end of file, expected {what}")))
    }
}

fn format_error(path: &Path, line: usize, message: impl Into<String>) -> FractureError {
    FractureError::format(path, line, message)
}

fn parse<T: FromStr>(path: &Path, line: usize, token: Option<&&str>, what: &str) -> Result<T> {
    let token = token.ok_or_else(|| format_error(path, line, format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| format_error(path, line, format!("cannot parse {what} from '{token}'")))
}

/// Parse a `.node` file body; returns the points and the first index used
pub fn parse_nodes(path: &Path, text: &str) -> Result<(Vec<Point3<f64>>, usize)> {
    let mut lines = Lines::new(path, text);
    let (header_line, header) = lines.expect_tokens("node header", 0)?;
    let count: usize = parse(path, header_line, header.first(), "point count")?;
    let dim: usize = parse(path, header_line, header.get(1), "dimension")?;
    if dim != 3 {
        return Err(format_error(path, header_line, format!("expected dimension 3, got {dim}")));
    }

    let mut points = Vec::with_capacity(count);
    let mut base = 0;
    let mut last_line = header_line;

    for i in 0..count {
        let (line, tokens) = lines.expect_tokens("point", last_line)?;
        last_line = line;
        let index: usize = parse(path, line, tokens.first(), "point index")?;
        if i == 0 {
            base = index;
            if base > 1 {
                return Err(format_error(path, line, format!("first point index must be 0 or 1, got {base}")));
            }
        }
        if index != i + base {
            return Err(format_error(path, line, format!("expected point {}, got {index}", i + base)));
        }
        let x = parse(path, line, tokens.get(1), "x")?;
        let y = parse(path, line, tokens.get(2), "y")?;
        let z = parse(path, line, tokens.get(3), "z")?;
        points.push(Point3::new(x, y, z));
    }

    Ok((points, base))
}

/// Parse an `.ele` file body, shifting indices by `base`
pub fn parse_elements(path: &Path, text: &str, base: usize, num_points: usize) -> Result<Vec<[usize; 4]>> {
    let mut lines = Lines::new(path, text);
    let (header_line, header) = lines.expect_tokens("element header", 0)?;
    let count: usize = parse(path, header_line, header.first(), "tetrahedron count")?;
    let per_tet: usize = parse(path, header_line, header.get(1), "nodes per tetrahedron")?;
    if per_tet != 4 && per_tet != 10 {
        return Err(format_error(path, header_line, format!("expected 4 or 10 nodes per tetrahedron, got {per_tet}")));
    }

    let mut tets = Vec::with_capacity(count);
    let mut last_line = header_line;

    for _ in 0..count {
        let (line, tokens) = lines.expect_tokens("tetrahedron", last_line)?;
        last_line = line;
        let mut tet = [0usize; 4];
        for (k, slot) in tet.iter_mut().enumerate() {
            let raw: usize = parse(path, line, tokens.get(k + 1), "vertex index")?;
            if raw < base || raw - base >= num_points {
                return Err(format_error(path, line, format!("vertex index {raw} out of range")));
            }
            *slot = raw - base;
        }
        tets.push(tet);
    }

    Ok(tets)
}

/// Read a TetGen mesh from its `.node` and `.ele` files
pub fn read_tetgen(node_path: &Path, ele_path: &Path) -> Result<(Vec<Point3<f64>>, Vec<[usize; 4]>)> {
    let node_text = fs::read_to_string(node_path)?;
    let (points, base) = parse_nodes(node_path, &node_text)?;
    let ele_text = fs::read_to_string(ele_path)?;
    let tets = parse_elements(ele_path, &ele_text, base, points.len())?;
    Ok((points, tets))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES_1: &str = "# unit tet\n4 3 0 1\n1 0.0 0.0 0.0 1\n2 1.0 0.0 0.0 1\n3 0.0 1.0 0.0 0\n4 0.0 0.0 1.0 1\n";
    const ELE_1: &str = "1 4 0\n  1   1 2 3 4   # only tet\n";

    #[test]
    fn test_one_based_indices() {
        let path = Path::new("mesh.node");
        let (points, base) = parse_nodes(path, NODES_1).unwrap();
        assert_eq!(base, 1);
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], Point3::new(1.0, 0.0, 0.0));

        let tets = parse_elements(Path::new("mesh.ele"), ELE_1, base, points.len()).unwrap();
        assert_eq!(tets, vec![[0, 1, 2, 3]]);
    }

    #[test]
    fn test_zero_based_indices() {
        let nodes = "4 3 0 0\n0 0 0 0\n1 1 0 0\n2 0 1 0\n3 0 0 1\n";
        let (points, base) = parse_nodes(Path::new("m.node"), nodes).unwrap();
        assert_eq!(base, 0);
        let tets = parse_elements(Path::new("m.ele"), "1 4 0\n0 3 2 1 0\n", base, points.len()).unwrap();
        assert_eq!(tets, vec![[3, 2, 1, 0]]);
    }

    #[test]
    fn test_bad_coordinate_reports_line() {
        let nodes = "2 3 0 0\n0 0 0 0\n1 1 abc 0\n";
        let err = parse_nodes(Path::new("bad.node"), nodes).unwrap_err();
        match err {
            FractureError::Format { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_truncated_element_file() {
        let err = parse_elements(Path::new("m.ele"), "2 4 0\n0 0 1 2 3\n", 0, 4).unwrap_err();
        assert!(matches!(err, FractureError::Format { .. }));
    }

    #[test]
    fn test_index_out_of_range() {
        let err = parse_elements(Path::new("m.ele"), "1 4 0\n1 1 2 3 5\n", 1, 4).unwrap_err();
        assert!(matches!(err, FractureError::Format { line: 2, .. }));
    }
}
