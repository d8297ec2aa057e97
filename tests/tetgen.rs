use fracture_modes::{FractureError, FractureModes, ModeParameters, VolumeMesh};
use approx::assert_relative_eq;
use std::fs;
use tempfile::tempdir;

/// Unit cube as five tetrahedra, written with 1-based indices
const CUBE_NODE: &str = "\
# cube corners
8 3 0 0
1 0 0 0
2 1 0 0
3 1 1 0
4 0 1 0
5 0 0 1
6 1 0 1
7 1 1 1
8 0 1 1
";

const CUBE_ELE: &str = "\
5 4 0
1 1 2 4 5
2 2 3 4 7
3 2 5 6 7
4 4 5 7 8
5 2 4 5 7
";

#[test]
fn test_reads_one_based_cube() {
    let dir = tempdir().unwrap();
    let node = dir.path().join("cube.node");
    let ele = dir.path().join("cube.ele");
    fs::write(&node, CUBE_NODE).unwrap();
    fs::write(&ele, CUBE_ELE).unwrap();

    let mesh = VolumeMesh::from_tetgen(&node, &ele).unwrap();
    assert_eq!(mesh.num_nodes(), 8);
    assert_eq!(mesh.num_tets(), 5);
    assert_relative_eq!(mesh.total_volume(), 1.0, epsilon = 1e-14);
    assert!(mesh.volumes().iter().all(|&v| v > 0.0));

    let modes = FractureModes::compute_modes(mesh, ModeParameters::new(2)).unwrap();
    assert_eq!(modes.modes().num_modes(), 2);
}

#[test]
fn test_reads_zero_based_files() {
    let dir = tempdir().unwrap();
    let node = dir.path().join("tet.node");
    let ele = dir.path().join("tet.ele");
    fs::write(&node, "4 3 0 0\n0 0 0 0\n1 1 0 0\n2 0 1 0\n3 0 0 1\n").unwrap();
    fs::write(&ele, "1 4 0\n0 0 1 2 3\n").unwrap();

    let mesh = VolumeMesh::from_tetgen(&node, &ele).unwrap();
    assert_relative_eq!(mesh.total_volume(), 1.0 / 6.0, epsilon = 1e-15);
}

#[test]
fn test_malformed_element_reports_line() {
    let dir = tempdir().unwrap();
    let node = dir.path().join("cube.node");
    let ele = dir.path().join("cube.ele");
    fs::write(&node, CUBE_NODE).unwrap();
    fs::write(&ele, "2 4 0\n1 1 2 4 5\n2 2 3 4 9\n").unwrap();

    let err = VolumeMesh::from_tetgen(&node, &ele).unwrap_err();
    assert!(matches!(err, FractureError::Format { line: 3, .. }));

    let missing = VolumeMesh::from_tetgen(dir.path().join("none.node"), &ele).unwrap_err();
    assert!(matches!(missing, FractureError::Io(_)));
}
