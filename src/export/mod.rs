//! Piece extraction and the on-disk layout of one object's output.
//!
//! ```text
//! <dir>/generic.{bin|toml}
//! <dir>/segmented_modes/piece_{i}.{bin|obj}
//! <dir>/fractured_{n}/piece_{i}.{bin|obj}
//! ```

pub mod binary;
pub mod extract;
pub mod obj;
pub mod records;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FractureError, Result};
use crate::modes::FractureModes;

pub use binary::RecordKind;
pub use extract::{extract_pieces, PieceMesh};
pub use records::GenericRecord;

pub const SEGMENTED_MODES_DIR: &str = "segmented_modes";

fn extension(compressed: bool, text_ext: &'static str) -> &'static str {
    if compressed {
        "bin"
    } else {
        text_ext
    }
}

/// Write `generic.bin` or `generic.toml` into `dir`
pub fn write_generic(dir: &Path, record: &GenericRecord, compressed: bool) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("generic.{}", extension(compressed, "toml")));
    if compressed {
        binary::write_file(record, RecordKind::Generic, &path)?;
    } else {
        fs::write(&path, record.to_toml()?)?;
    }
    Ok(path)
}

/// Read a generic record, choosing the decoder by file extension
pub fn read_generic(path: &Path) -> Result<GenericRecord> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => binary::read_file(RecordKind::Generic, path),
        Some("toml") => GenericRecord::from_toml(&fs::read_to_string(path)?),
        _ => Err(unknown_extension(path)),
    }
}

/// Write `piece_{i}` files into `dir`, one per piece in order
pub fn write_pieces(dir: &Path, pieces: &[PieceMesh], compressed: bool) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (i, piece) in pieces.iter().enumerate() {
        let path = dir.join(format!("piece_{i}.{}", extension(compressed, "obj")));
        if compressed {
            binary::write_file(piece, RecordKind::Piece, &path)?;
        } else {
            obj::write_obj(piece, &path)?;
        }
    }
    debug!(dir = %dir.display(), pieces = pieces.len(), "wrote pieces");
    Ok(())
}

pub fn read_piece(path: &Path) -> Result<PieceMesh> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => binary::read_file(RecordKind::Piece, path),
        Some("obj") => obj::read_obj(path),
        _ => Err(unknown_extension(path)),
    }
}

/// Read every `piece_{i}.{bin|obj}` in `dir`, ordered by `i`
pub fn read_pieces_dir(dir: &Path) -> Result<Vec<PieceMesh>> {
    let mut indexed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let index = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("piece_"))
            .and_then(|s| s.parse::<usize>().ok());
        let known = matches!(path.extension().and_then(|e| e.to_str()), Some("bin" | "obj"));
        if let (Some(index), true) = (index, known) {
            indexed.push((index, path));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.iter().map(|(_, path)| read_piece(path)).collect()
}

/// Extract the intrinsic pieces and write them under `dir/segmented_modes`
pub fn write_segmented_modes(dir: &Path, modes: &FractureModes, compressed: bool) -> Result<Vec<PieceMesh>> {
    let partition = modes.partition();
    let pieces = extract_pieces(modes, &partition.tet_piece, partition.num_pieces, modes.embedding().is_some())?;
    write_pieces(&dir.join(SEGMENTED_MODES_DIR), &pieces, compressed)?;
    Ok(pieces)
}

fn unknown_extension(path: &Path) -> FractureError {
    FractureError::Serialize(format!("unrecognized record file {}", path.display()))
}
