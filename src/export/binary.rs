//! Compact binary encoding of exported records.
//!
//! Layout:
//! 1. magic `FRM1` (4 bytes)
//! 2. format version, `u32` little-endian
//! 3. record kind, `u32` little-endian
//! 4. bincode payload

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FractureError, Result};

pub const MAGIC: [u8; 4] = *b"FRM1";
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 12;

/// Which record a binary file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RecordKind {
    Generic = 1,
    Piece = 2,
}

impl RecordKind {
    fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Generic),
            2 => Some(Self::Piece),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    magic: [u8; 4],
    version: u32,
    kind: u32,
}

impl Header {
    fn new(kind: RecordKind) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            kind: kind as u32,
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.kind.to_le_bytes())
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Ok(Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: word(4),
            kind: word(8),
        })
    }

    fn validate(&self, expected: RecordKind) -> Result<()> {
        if self.magic != MAGIC {
            return Err(FractureError::Serialize(format!("bad magic {:?}", self.magic)));
        }
        if self.version != VERSION {
            return Err(FractureError::Serialize(format!("unsupported version {}", self.version)));
        }
        match RecordKind::from_u32(self.kind) {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => Err(FractureError::Serialize(format!("expected {expected:?} record, found {kind:?}"))),
            None => Err(FractureError::Serialize(format!("unknown record kind {}", self.kind))),
        }
    }
}

pub fn encode_writer<T: Serialize, W: Write>(value: &T, kind: RecordKind, writer: &mut W) -> Result<()> {
    Header::new(kind).write_to(writer)?;
    bincode::serialize_into(writer, value).map_err(|e| FractureError::Serialize(e.to_string()))
}

pub fn decode_reader<T: DeserializeOwned, R: Read>(kind: RecordKind, reader: &mut R) -> Result<T> {
    Header::read_from(reader)?.validate(kind)?;
    bincode::deserialize_from(reader).map_err(|e| FractureError::Serialize(e.to_string()))
}

pub fn encode_bytes<T: Serialize>(value: &T, kind: RecordKind) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_writer(value, kind, &mut out)?;
    Ok(out)
}

pub fn decode_bytes<T: DeserializeOwned>(kind: RecordKind, bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_SIZE {
        return Err(FractureError::Serialize(format!(
            "{} bytes is shorter than the header",
            bytes.len()
        )));
    }
    decode_reader(kind, &mut &bytes[..])
}

pub fn write_file<T: Serialize>(value: &T, kind: RecordKind, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    encode_writer(value, kind, &mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn read_file<T: DeserializeOwned>(kind: RecordKind, path: &Path) -> Result<T> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_reader(kind, &mut reader)
}
