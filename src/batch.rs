//! Batch fracture generation.
//!
//! For one object: write the generic record and the intrinsic pieces, then
//! evaluate random boundary impacts in waves until `num_impacts` fractures
//! have been written or the candidates run out. Each wave projects and
//! extracts in parallel on a dedicated rayon pool. The accepted candidates
//! are then written in candidate order; the success counter is the output
//! slot, so a failed write leaves no gap and the next success takes its slot.

use nalgebra::Point3;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, FractureConfig, ImpactConfig};
use crate::error::{BatchError, FractureError, Result};
use crate::export::{self, extract_pieces, GenericRecord, PieceMesh};
use crate::impact::{Impact, ImpactState};
use crate::mesh::{sample_boundary_points, SurfaceMesh, VolumeMesh};
use crate::modes::{FractureModes, ModeParameters};

/// Turns an impact's labeling into piece meshes
pub trait PieceExtractor: Sync {
    fn extract(&self, modes: &FractureModes, state: &ImpactState) -> Result<Vec<PieceMesh>>;
}

/// [`extract_pieces`], using the display surface whenever one is embedded
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshExtractor;

impl PieceExtractor for MeshExtractor {
    fn extract(&self, modes: &FractureModes, state: &ImpactState) -> Result<Vec<PieceMesh>> {
        extract_pieces(modes, &state.tet_labels, state.n_pieces, modes.embedding().is_some())
    }
}

/// Destination of accepted fractures
///
/// A failed write must not leave anything behind at `slot`; the slot is
/// offered again to the next accepted fracture.
pub trait FractureSink: Sync {
    fn write_fracture(&self, slot: usize, pieces: &[PieceMesh]) -> Result<()>;
}

/// Writes each fracture to `<root>/fractured_{slot}/`
///
/// Pieces go to a hidden staging directory first, which is renamed into
/// place once every piece is on disk. Whatever already sits at the slot
/// path (a previous run's output) is replaced.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    compressed: bool,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>, compressed: bool) -> Self {
        Self {
            root: root.into(),
            compressed,
        }
    }

    pub fn slot_dir(&self, slot: usize) -> PathBuf {
        self.root.join(format!("fractured_{slot}"))
    }

    fn staging_dir(&self, slot: usize) -> PathBuf {
        self.root.join(format!(".fractured_{slot}.partial"))
    }

    fn commit(&self, staging: &Path, target: &Path, pieces: &[PieceMesh]) -> Result<()> {
        export::write_pieces(staging, pieces, self.compressed)?;
        remove_entry(target)?;
        fs::rename(staging, target)?;
        Ok(())
    }
}

impl FractureSink for DirectorySink {
    fn write_fracture(&self, slot: usize, pieces: &[PieceMesh]) -> Result<()> {
        let staging = self.staging_dir(slot);
        remove_entry(&staging)?;

        let result = self.commit(&staging, &self.slot_dir(slot), pieces);
        if result.is_err() {
            if let Err(e) = remove_entry(&staging) {
                warn!(path = %staging.display(), error = %e, "could not remove staging directory");
            }
        }
        result
    }
}

/// Remove a file or directory tree; a missing path is fine
fn remove_entry(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Counters of one object's batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Candidates evaluated
    pub attempted: usize,
    pub written: usize,
    pub failed: usize,
    /// Rejected by a filter, or left over once enough fractures were written
    pub skipped: usize,
    pub failures: Vec<BatchError>,
}

/// One object handed to [`run_objects`]
#[derive(Debug, Clone)]
pub struct ObjectInput {
    pub name: String,
    pub mesh: VolumeMesh,
    pub display: Option<SurfaceMesh>,
    pub interior: Option<SurfaceMesh>,
}

enum Outcome {
    Accepted { index: usize, piece_labels: Vec<usize>, pieces: Vec<PieceMesh> },
    Skipped,
    Failed(BatchError),
}

pub struct BatchDriver {
    pool: ThreadPool,
    batch: BatchConfig,
    impact: ImpactConfig,
}

impl BatchDriver {
    /// Create a driver with its own worker pool (`workers == 0` lets rayon
    /// pick the thread count)
    pub fn new(config: &FractureConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.batch.workers)
            .build()
            .map_err(|e| FractureError::invalid_config(format!("cannot start worker pool: {e}")))?;
        Ok(Self {
            pool,
            batch: config.batch.clone(),
            impact: config.impact.clone(),
        })
    }

    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Write everything for one object into `output`
    ///
    /// # Errors
    /// Object-level failures only (generic record, intrinsic pieces).
    /// Per-impact failures are collected in the report.
    pub fn generate_fractures(&self, object: &str, modes: &FractureModes, output: &Path) -> Result<BatchReport> {
        let compressed = self.batch.compressed;
        export::write_generic(output, &GenericRecord::from_modes(modes), compressed)?;
        let intrinsic = export::write_segmented_modes(output, modes, compressed)?;
        debug!(object, pieces = intrinsic.len(), "wrote segmented modes");

        let count = self.batch.num_impacts * self.batch.candidates_per_impact;
        let candidates = sample_boundary_points(modes.mesh(), modes.adjacency(), count, self.batch.seed);
        let sink = DirectorySink::new(output, compressed);
        Ok(self.run_candidates(object, modes, &candidates, &sink))
    }

    /// Evaluate candidate contact points until `num_impacts` fractures are written
    pub fn run_candidates(
        &self,
        object: &str,
        modes: &FractureModes,
        candidates: &[Point3<f64>],
        sink: &dyn FractureSink,
    ) -> BatchReport {
        self.run_candidates_with(object, modes, candidates, &MeshExtractor, sink)
    }

    /// [`run_candidates`](Self::run_candidates) with an explicit piece extractor
    pub fn run_candidates_with(
        &self,
        object: &str,
        modes: &FractureModes,
        candidates: &[Point3<f64>],
        extractor: &dyn PieceExtractor,
        sink: &dyn FractureSink,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let target = self.batch.num_impacts;
        let wave_size = self.batch.wave_size.max(1);

        for (wave, points) in candidates.chunks(wave_size).enumerate() {
            if report.written >= target {
                break;
            }
            let offset = wave * wave_size;
            report.attempted += points.len();

            let outcomes: Vec<Outcome> = self.pool.install(|| {
                points
                    .par_iter()
                    .enumerate()
                    .map(|(i, p)| self.evaluate(object, modes, extractor, offset + i, p))
                    .collect()
            });

            for outcome in outcomes {
                match outcome {
                    Outcome::Accepted {
                        index,
                        piece_labels,
                        pieces,
                    } => {
                        if report.written >= target || (self.batch.unique && seen.contains(&piece_labels)) {
                            report.skipped += 1;
                            continue;
                        }
                        let slot = report.written;
                        match sink.write_fracture(slot, &pieces) {
                            Ok(()) => {
                                report.written += 1;
                                if self.batch.unique {
                                    seen.insert(piece_labels);
                                }
                            }
                            Err(e) => {
                                let err = BatchError::impact(object, index, e);
                                warn!(%err, slot, "writing fracture failed");
                                report.failed += 1;
                                report.failures.push(err);
                            }
                        }
                    }
                    Outcome::Skipped => report.skipped += 1,
                    Outcome::Failed(err) => {
                        warn!(%err, "impact failed");
                        report.failed += 1;
                        report.failures.push(err);
                    }
                }
            }
            debug!(object, wave, written = report.written, "wave done");
        }

        info!(
            object,
            attempted = report.attempted,
            written = report.written,
            failed = report.failed,
            skipped = report.skipped,
            "fracture batch finished"
        );
        report
    }

    fn evaluate(
        &self,
        object: &str,
        modes: &FractureModes,
        extractor: &dyn PieceExtractor,
        index: usize,
        point: &Point3<f64>,
    ) -> Outcome {
        let impact = Impact::from_config(*point, &self.impact);
        let state = match modes.impact_projection(&impact) {
            Ok(state) => state,
            Err(e) => return Outcome::Failed(BatchError::impact(object, index, e)),
        };

        if state.n_pieces < self.batch.min_pieces || self.batch.max_pieces.is_some_and(|max| state.n_pieces > max) {
            return Outcome::Skipped;
        }

        let pieces = match extractor.extract(modes, &state) {
            Ok(pieces) => pieces,
            Err(e) => return Outcome::Failed(BatchError::impact(object, index, e)),
        };

        let min_volume = self.batch.min_volume_fraction * modes.mesh().total_volume();
        if pieces.iter().any(|p| p.volume < min_volume) {
            return Outcome::Skipped;
        }

        Outcome::Accepted {
            index,
            piece_labels: state.piece_labels,
            pieces,
        }
    }
}

/// Compute modes and fractures for several objects, each into
/// `output_root/<name>`
///
/// A failing object is logged and reported; the remaining objects still run.
pub fn run_objects(
    config: &FractureConfig,
    objects: Vec<ObjectInput>,
    output_root: &Path,
) -> Result<Vec<std::result::Result<BatchReport, BatchError>>> {
    let driver = BatchDriver::new(config)?;
    let parameters = ModeParameters::from_config(config);

    let results = objects
        .into_iter()
        .map(|object| {
            let name = object.name.clone();
            let result = process_object(&driver, &parameters, object, output_root)
                .map_err(|e| BatchError::object(name.as_str(), e));
            if let Err(err) = &result {
                warn!(%err, "object failed");
            }
            result
        })
        .collect();
    Ok(results)
}

fn process_object(
    driver: &BatchDriver,
    parameters: &ModeParameters,
    object: ObjectInput,
    output_root: &Path,
) -> Result<BatchReport> {
    let mut modes = FractureModes::compute_modes(object.mesh, parameters.clone())?;
    if let Some(display) = object.display {
        modes = modes.impact_precomputation(display, object.interior)?;
    }
    driver.generate_fractures(&object.name, &modes, &output_root.join(&object.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use std::sync::Mutex;

    struct MemorySink(Mutex<Vec<usize>>);

    impl FractureSink for MemorySink {
        fn write_fracture(&self, slot: usize, _pieces: &[PieceMesh]) -> Result<()> {
            self.0.lock().unwrap().push(slot);
            Ok(())
        }
    }

    fn setup(batch: BatchConfig) -> (BatchDriver, FractureModes) {
        let config = FractureConfig {
            num_modes: 4,
            batch,
            ..FractureConfig::default()
        };
        let mesh = MeshGenerator::generate_box(4, 3, 2, 1.3, 1.0, 0.6).unwrap();
        let modes = FractureModes::compute_modes(mesh, ModeParameters::from_config(&config)).unwrap();
        (BatchDriver::new(&config).unwrap(), modes)
    }

    #[test]
    fn test_stops_at_target_with_consecutive_slots() {
        let (driver, modes) = setup(BatchConfig {
            num_impacts: 3,
            wave_size: 2,
            workers: 2,
            ..BatchConfig::default()
        });
        let points = sample_boundary_points(modes.mesh(), modes.adjacency(), 10, 7);
        let sink = MemorySink(Mutex::new(Vec::new()));

        let report = driver.run_candidates("box", &modes, &points, &sink);
        assert_eq!(report.written, 3);
        assert_eq!(report.failed, 0);
        // Two waves of two; the fourth candidate is left over
        assert_eq!(report.attempted, 4);
        assert_eq!(report.skipped, 1);

        let mut slots = sink.0.into_inner().unwrap();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn test_min_pieces_filter_skips_without_failing() {
        let (driver, modes) = setup(BatchConfig {
            num_impacts: 5,
            min_pieces: 10_000,
            ..BatchConfig::default()
        });
        let points = sample_boundary_points(modes.mesh(), modes.adjacency(), 6, 1);
        let sink = MemorySink(Mutex::new(Vec::new()));

        let report = driver.run_candidates("box", &modes, &points, &sink);
        assert_eq!(report.written, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 6);
    }

    #[test]
    fn test_directory_sink_replaces_stale_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (_, modes) = setup(BatchConfig::default());
        let labels = vec![0; modes.mesh().num_tets()];
        let pieces = extract_pieces(&modes, &labels, 1, false).unwrap();

        let sink = DirectorySink::new(dir.path(), true);
        fs::write(sink.slot_dir(0), "stale").unwrap();
        sink.write_fracture(0, &pieces).unwrap();
        sink.write_fracture(1, &pieces).unwrap();
        sink.write_fracture(1, &pieces).unwrap();

        assert_eq!(export::read_pieces_dir(&sink.slot_dir(0)).unwrap(), pieces);
        assert_eq!(export::read_pieces_dir(&sink.slot_dir(1)).unwrap(), pieces);
        let mut entries: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["fractured_0", "fractured_1"]);
    }

    #[test]
    fn test_unlocatable_candidate_is_a_failure() {
        let (driver, modes) = setup(BatchConfig {
            num_impacts: 5,
            ..BatchConfig::default()
        });
        let mut points = sample_boundary_points(modes.mesh(), modes.adjacency(), 2, 3);
        points.insert(1, Point3::new(50.0, 0.0, 0.0));
        let sink = MemorySink(Mutex::new(Vec::new()));

        let report = driver.run_candidates("box", &modes, &points, &sink);
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].impact, Some(1));
        assert!(matches!(report.failures[0].source, FractureError::UnlocatableContact { .. }));
    }
}
