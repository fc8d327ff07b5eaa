// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Native checkpoint format (.mpmckpt)
//!
//! # Format Overview
//!
//! ```text
//! +---------------------------------------------------------+
//! |                    File Header (32 bytes)                |
//! |  Magic (8) | Version (4) | PackedSize (4)               |
//! |  Signature (8) | RecordCount (8)                        |
//! +---------------------------------------------------------+
//! |                    Body                                  |
//! |  RecordCount x packed record (PackedSize bytes each)    |
//! +---------------------------------------------------------+
//! |                    CRC32 of body (4)                     |
//! +---------------------------------------------------------+
//! ```
//!
//! Records are stored in the same packed form the transport sends, so a
//! checkpoint written on one rank restores on any rank built with the same
//! record layout. The signature pins that layout.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use mpm_exchange::core::ser::SerError;
use mpm_exchange::datatype::{Datatype, DatatypeRegistry, RecordLayout};
use mpm_exchange::material::MaterialSource;
use mpm_exchange::particle::{EncodeError, ParticleCodec, ReconstructError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Magic bytes: "MPMCKPT\0"
pub const MAGIC: [u8; 8] = *b"MPMCKPT\0";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// File header (32 bytes, fixed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 8],
    pub version: u32,
    /// Bytes per packed record.
    pub packed_size: u32,
    /// Type map signature of the stored record kind.
    pub signature: u64,
    pub record_count: u64,
}

impl FileHeader {
    pub const SIZE: usize = 32;

    pub fn new(packed_size: u32, signature: u64) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            packed_size,
            signature,
            record_count: 0,
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.magic)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.packed_size)?;
        w.write_u64::<LittleEndian>(self.signature)?;
        w.write_u64::<LittleEndian>(self.record_count)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, CheckpointError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(CheckpointError::BadMagic(magic));
        }

        Ok(Self {
            magic,
            version: r.read_u32::<LittleEndian>()?,
            packed_size: r.read_u32::<LittleEndian>()?,
            signature: r.read_u64::<LittleEndian>()?,
            record_count: r.read_u64::<LittleEndian>()?,
        })
    }

    /// Bytes between the header and the CRC trailer, `None` if the count
    /// does not fit a file.
    pub fn body_len(&self) -> Option<u64> {
        self.record_count.checked_mul(u64::from(self.packed_size))
    }

    /// Total file length implied by this header.
    pub fn file_len(&self) -> Option<u64> {
        self.body_len()?.checked_add(Self::SIZE as u64 + 4)
    }
}

/// Checkpoint format errors.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a checkpoint file (magic {0:02x?})")]
    BadMagic([u8; 8]),

    #[error("Version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("Record layout mismatch: expected signature {expected:#018x} ({expected_size} bytes), got {got:#018x} ({got_size} bytes)")]
    SignatureMismatch {
        expected: u64,
        expected_size: u32,
        got: u64,
        got_size: u32,
    },

    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },

    #[error("Corrupt header: {record_count} records of {packed_size} bytes overflow the file length")]
    CorruptHeader { record_count: u64, packed_size: u32 },

    #[error("Truncated checkpoint: expected {expected} bytes, found {found}")]
    Truncated { expected: u64, found: u64 },

    #[error("Packing error: {0}")]
    Ser(#[from] SerError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Appends packed records of kind `R` to a checkpoint file.
///
/// The header is rewritten with the final count by [`CheckpointWriter::finalize`].
/// A writer dropped without finalizing leaves a file that fails to open.
pub struct CheckpointWriter<R: RecordLayout> {
    writer: BufWriter<File>,
    header: FileHeader,
    datatype: Option<Datatype<R>>,
    hasher: crc32fast::Hasher,
    buf: Vec<u8>,
}

impl<R: RecordLayout> CheckpointWriter<R> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let datatype = commit::<R>();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Placeholder, rewritten on finalize
        let header = FileHeader::new(datatype.packed_size() as u32, datatype.signature());
        header.write(&mut writer)?;

        Ok(Self {
            writer,
            header,
            buf: vec![0u8; datatype.packed_size()],
            datatype: Some(datatype),
            hasher: crc32fast::Hasher::new(),
        })
    }

    pub fn write_record(&mut self, record: &R) -> Result<(), CheckpointError> {
        if let Some(datatype) = &self.datatype {
            datatype.pack_into(record, &mut self.buf)?;
        }
        self.writer.write_all(&self.buf)?;
        self.hasher.update(&self.buf);
        self.header.record_count += 1;
        Ok(())
    }

    /// Encode `particle` and append its record.
    pub fn write_particle<P>(&mut self, particle: &P) -> Result<(), CheckpointError>
    where
        P: ParticleCodec<Record = R>,
    {
        let record = particle.to_record()?;
        self.write_record(&record)
    }

    pub fn record_count(&self) -> u64 {
        self.header.record_count
    }

    /// Write the CRC trailer and the final header.
    pub fn finalize(mut self) -> Result<u64, CheckpointError> {
        let crc = std::mem::take(&mut self.hasher).finalize();
        self.writer.write_u32::<LittleEndian>(crc)?;

        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.writer)?;
        self.writer.flush()?;

        if let Some(datatype) = self.datatype.take() {
            datatype.release();
        }
        log::debug!(
            "[CHECKPOINT] wrote {} {} records (crc {:#010x})",
            self.header.record_count,
            R::TYPE_NAME,
            crc
        );
        Ok(self.header.record_count)
    }
}

impl<R: RecordLayout> Drop for CheckpointWriter<R> {
    fn drop(&mut self) {
        if let Some(datatype) = self.datatype.take() {
            log::warn!("[CHECKPOINT] writer for {} dropped without finalize", R::TYPE_NAME);
            datatype.release();
        }
    }
}

/// Reads packed records of kind `R` back from a checkpoint file.
///
/// Opening verifies the header, the record layout and the body CRC before
/// any record is handed out.
pub struct CheckpointReader<R: RecordLayout> {
    reader: BufReader<File>,
    header: FileHeader,
    datatype: Option<Datatype<R>>,
    remaining: u64,
    buf: Vec<u8>,
}

impl<R: RecordLayout> CheckpointReader<R> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let header = FileHeader::read(&mut reader)?;
        if header.version != FORMAT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: header.version,
            });
        }

        let datatype = commit::<R>();
        let packed_size = datatype.packed_size() as u32;
        if header.signature != datatype.signature() || header.packed_size != packed_size {
            let err = CheckpointError::SignatureMismatch {
                expected: datatype.signature(),
                expected_size: packed_size,
                got: header.signature,
                got_size: header.packed_size,
            };
            datatype.release();
            return Err(err);
        }

        let Some(expected) = header.file_len() else {
            datatype.release();
            return Err(CheckpointError::CorruptHeader {
                record_count: header.record_count,
                packed_size: header.packed_size,
            });
        };
        if file_len < expected {
            datatype.release();
            return Err(CheckpointError::Truncated {
                expected,
                found: file_len,
            });
        }

        if let Err(e) = verify_crc(&mut reader, expected - FileHeader::SIZE as u64 - 4) {
            datatype.release();
            return Err(e);
        }
        reader.seek(SeekFrom::Start(FileHeader::SIZE as u64))?;

        Ok(Self {
            reader,
            remaining: header.record_count,
            header,
            buf: vec![0u8; packed_size as usize],
            datatype: Some(datatype),
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn record_count(&self) -> u64 {
        self.header.record_count
    }

    /// Next record, or `None` once all records have been read.
    pub fn read_record(&mut self) -> Result<Option<R>, CheckpointError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.reader.read_exact(&mut self.buf)?;
        self.remaining -= 1;

        let mut record = R::default();
        if let Some(datatype) = &self.datatype {
            datatype.unpack(&self.buf, &mut record)?;
        }
        Ok(Some(record))
    }

    pub fn records(self) -> RecordIterator<R> {
        RecordIterator { reader: self }
    }

    /// Rebuild every stored particle against `materials`.
    ///
    /// Records that fail reconstruction are reported with their index and
    /// skipped; the rest are restored.
    pub fn restore<P, S>(mut self, materials: &S) -> Result<Restored<P>, CheckpointError>
    where
        P: ParticleCodec<Record = R>,
        S: MaterialSource + ?Sized,
    {
        let mut restored = Restored {
            particles: Vec::with_capacity(self.remaining as usize),
            failures: Vec::new(),
        };
        let mut index = 0u64;
        while let Some(record) = self.read_record()? {
            match P::from_record(&record, materials) {
                Ok(particle) => restored.particles.push(particle),
                Err(e) => {
                    log::warn!("[CHECKPOINT] record {} not restored: {}", index, e);
                    restored.failures.push((index, e));
                }
            }
            index += 1;
        }
        Ok(restored)
    }
}

impl<R: RecordLayout> Drop for CheckpointReader<R> {
    fn drop(&mut self) {
        if let Some(datatype) = self.datatype.take() {
            datatype.release();
        }
    }
}

/// Iterator over the records of a checkpoint.
pub struct RecordIterator<R: RecordLayout> {
    reader: CheckpointReader<R>,
}

impl<R: RecordLayout> Iterator for RecordIterator<R> {
    type Item = Result<R, CheckpointError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Outcome of [`CheckpointReader::restore`].
#[derive(Debug)]
pub struct Restored<P> {
    pub particles: Vec<P>,
    /// Record index and reason for every record that was skipped.
    pub failures: Vec<(u64, ReconstructError)>,
}

/// Checkpoints own a private registry: their datatypes never meet a transport.
fn commit<R: RecordLayout>() -> Datatype<R> {
    let registry = Arc::new(DatatypeRegistry::new());
    Datatype::commit(&registry, &R::default())
}

fn verify_crc<Rd: Read>(reader: &mut Rd, body_len: u64) -> Result<(), CheckpointError> {
    let mut hasher = crc32fast::Hasher::new();
    let mut chunk = [0u8; 8192];
    let mut left = body_len;
    while left > 0 {
        let n = left.min(chunk.len() as u64) as usize;
        reader.read_exact(&mut chunk[..n])?;
        hasher.update(&chunk[..n]);
        left -= n as u64;
    }
    let stored = reader.read_u32::<LittleEndian>()?;
    let computed = hasher.finalize();
    if stored != computed {
        return Err(CheckpointError::CrcMismatch { stored, computed });
    }
    Ok(())
}
