use fracture_modes::batch::ObjectInput;
use fracture_modes::{
    sample_boundary_points, BatchConfig, BatchDriver, FractureConfig, FractureError, FractureModes, FractureSink,
    ImpactState, MeshExtractor, MeshGenerator, ModeParameters, PieceExtractor, PieceMesh, Result,
};
use nalgebra::Point3;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::tempdir;

/// Records written slots and fails the write calls listed in `fail`
struct FlakySink {
    fail: Vec<usize>,
    calls: AtomicUsize,
    written: Mutex<Vec<usize>>,
}

impl FlakySink {
    fn failing(fail: Vec<usize>) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
        }
    }
}

impl FractureSink for FlakySink {
    fn write_fracture(&self, slot: usize, _pieces: &[PieceMesh]) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.contains(&call) {
            return Err(FractureError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        self.written.lock().unwrap().push(slot);
        Ok(())
    }
}

/// Fails extraction for impacts at the listed contact points
struct RejectingExtractor {
    reject: Vec<Point3<f64>>,
}

impl PieceExtractor for RejectingExtractor {
    fn extract(&self, modes: &FractureModes, state: &ImpactState) -> Result<Vec<PieceMesh>> {
        if self.reject.contains(&state.contact_point) {
            return Err(FractureError::extraction(0, "no boundary triangles"));
        }
        MeshExtractor.extract(modes, state)
    }
}

fn config(batch: BatchConfig) -> FractureConfig {
    FractureConfig {
        num_modes: 4,
        batch,
        ..FractureConfig::default()
    }
}

fn slab_modes(config: &FractureConfig) -> FractureModes {
    let mesh = MeshGenerator::generate_box(4, 3, 2, 1.3, 1.0, 0.6).unwrap();
    FractureModes::compute_modes(mesh, ModeParameters::from_config(config)).unwrap()
}

#[test]
fn test_write_failures_are_counted_and_batch_continues() {
    let config = config(BatchConfig {
        num_impacts: 10,
        wave_size: 5,
        ..BatchConfig::default()
    });
    let modes = slab_modes(&config);
    let points = sample_boundary_points(modes.mesh(), modes.adjacency(), 5, 11);

    let sink = FlakySink::failing(vec![1, 3]);
    let driver = BatchDriver::new(&config).unwrap();
    let report = driver.run_candidates("box", &modes, &points, &sink);

    assert_eq!(report.attempted, 5);
    assert_eq!(report.written, 3);
    assert_eq!(report.failed, 2);
    assert!(report.failures.iter().all(|e| e.object == "box" && e.impact.is_some()));
    // Failed slots are handed to the next success
    assert_eq!(sink.written.into_inner().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_failed_write_does_not_cost_a_fracture() {
    let config = config(BatchConfig {
        num_impacts: 3,
        wave_size: 5,
        ..BatchConfig::default()
    });
    let modes = slab_modes(&config);
    let points = sample_boundary_points(modes.mesh(), modes.adjacency(), 5, 11);

    let sink = FlakySink::failing(vec![1]);
    let report = BatchDriver::new(&config)
        .unwrap()
        .run_candidates("box", &modes, &points, &sink);

    assert_eq!(report.written, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(sink.written.into_inner().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_extraction_failures_leave_consecutive_slots() {
    let config = config(BatchConfig {
        num_impacts: 5,
        wave_size: 5,
        ..BatchConfig::default()
    });
    let modes = slab_modes(&config);
    let points = sample_boundary_points(modes.mesh(), modes.adjacency(), 5, 11);
    let extractor = RejectingExtractor {
        reject: vec![points[1], points[3]],
    };

    let sink = FlakySink::failing(Vec::new());
    let report = BatchDriver::new(&config)
        .unwrap()
        .run_candidates_with("box", &modes, &points, &extractor, &sink);

    assert_eq!(report.attempted, 5);
    assert_eq!(report.written, 3);
    assert_eq!(report.failed, 2);
    let mut impacts: Vec<usize> = report.failures.iter().filter_map(|e| e.impact).collect();
    impacts.sort_unstable();
    assert_eq!(impacts, vec![1, 3]);
    assert!(report
        .failures
        .iter()
        .all(|e| matches!(e.source, FractureError::Extraction { .. })));
    assert_eq!(sink.written.into_inner().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_unique_filter_skips_repeated_labelings() {
    let config = config(BatchConfig {
        num_impacts: 10,
        unique: true,
        ..BatchConfig::default()
    });
    let modes = slab_modes(&config);
    let point = sample_boundary_points(modes.mesh(), modes.adjacency(), 1, 5)[0];

    let sink = FlakySink::failing(Vec::new());
    let report = BatchDriver::new(&config)
        .unwrap()
        .run_candidates("box", &modes, &[point; 4], &sink);
    assert_eq!(report.written, 1);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.failed, 0);
}

#[test]
fn test_run_objects_continues_past_a_failing_object() {
    let dir = tempdir().unwrap();
    let mut config = config(BatchConfig {
        num_impacts: 2,
        candidates_per_impact: 2,
        ..BatchConfig::default()
    });
    config.num_modes = 8;

    let objects = vec![
        // One cell has 8 vertices and so only 7 non-constant modes
        ObjectInput {
            name: "small".into(),
            mesh: MeshGenerator::generate_box(1, 1, 1, 1.0, 1.0, 1.0).unwrap(),
            display: None,
            interior: None,
        },
        ObjectInput {
            name: "slab".into(),
            mesh: MeshGenerator::generate_box(4, 3, 2, 1.3, 1.0, 0.6).unwrap(),
            display: None,
            interior: None,
        },
    ];

    let results = fracture_modes::run_objects(&config, objects, dir.path()).unwrap();
    assert_eq!(results.len(), 2);
    match &results[0] {
        Err(err) => {
            assert_eq!(err.object, "small");
            assert!(err.impact.is_none());
            assert!(matches!(err.source, FractureError::InsufficientModes { requested: 8, available: 7 }));
        }
        Ok(_) => panic!("expected InsufficientModes for the single cell"),
    }
    let report = results[1].as_ref().unwrap();
    assert_eq!(report.written, 2);
    assert!(dir.path().join("slab").join("generic.bin").exists());
    assert!(dir.path().join("slab").join("fractured_1").exists());
}
