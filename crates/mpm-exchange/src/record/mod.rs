// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Fixed-layout particle records.
//!
//! A record is the flat value a particle is flattened into for one transfer
//! or one checkpoint write. It is never the long-lived representation of a
//! particle; see [`crate::particle`] for that.
//!
//! Field order is the contract between the transport, checkpoint files and
//! every rank of a run. Stress and strain are always in Voigt order
//! `xx, yy, zz, xy, yz, xz`.
//!
//! ```text
//! ParticleRecord
//! +-----+------------------------------------------+--------+---------+
//! | u64 | f64 x 28 (mass .. epsilon_v)             | bool   | u64     |
//! | id  |                                          | status | cell_id |
//! +-----+------------------------------------------+--------+---------+
//! | u32 material_id | u32 nstate_vars | f64 x 20 svars               |
//! +-----------------+-----------------+------------------------------+
//!
//! TwoPhaseParticleRecord
//! +----------------+-----------------------------+-----+-----+---------+
//! | ParticleRecord | f64 x 6 (liquid_mass .. sat)| u32 | u32 | f64 x 5 |
//! +----------------+-----------------------------+-----+-----+---------+
//! ```

mod particle;
mod twophase;

pub use particle::ParticleRecord;
pub use twophase::TwoPhaseParticleRecord;
