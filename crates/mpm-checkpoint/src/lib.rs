// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! # mpm-checkpoint
//!
//! Flat checkpoint files holding a sequence of particle records of one kind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mpm_checkpoint::{CheckpointReader, CheckpointWriter};
//! use mpm_exchange::record::ParticleRecord;
//!
//! # fn main() -> Result<(), mpm_checkpoint::CheckpointError> {
//! let mut writer = CheckpointWriter::<ParticleRecord>::create("step-100.mpmckpt")?;
//! writer.write_record(&ParticleRecord::default())?;
//! writer.finalize()?;
//!
//! let reader = CheckpointReader::<ParticleRecord>::open("step-100.mpmckpt")?;
//! for record in reader.records() {
//!     println!("particle {}", record?.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod format;

pub use format::{
    CheckpointError, CheckpointReader, CheckpointWriter, FileHeader, RecordIterator, Restored,
    FORMAT_VERSION, MAGIC,
};
