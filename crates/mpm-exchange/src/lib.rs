// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! # mpm-exchange - particle state records for distributed MPM
//!
//! Moves material-point particles between the ranks of a distributed
//! Material Point Method solver. A live particle is flattened into a
//! fixed-layout record, the record is described to the transport as a list
//! of `(offset, count, kind)` blocks, shipped point-to-point, and rebuilt on
//! the far side against that rank's material registry.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use mpm_exchange::datatype::register_particle_type;
//! use mpm_exchange::exchange::exchange_particle;
//! use mpm_exchange::material::{LinearElastic, Material, Newtonian};
//! use mpm_exchange::particle::{ParticleCodec, TwoPhaseParticle};
//! use mpm_exchange::record::TwoPhaseParticleRecord;
//! use mpm_exchange::transport::LocalGroup;
//!
//! fn main() -> mpm_exchange::Result<()> {
//!     let materials: Vec<Arc<dyn Material>> = vec![
//!         Arc::new(LinearElastic::new(1, 1000.0, 1.0e7, 0.3)),
//!         Arc::new(Newtonian::new(2, 1000.0, 2.0e9, 8.9e-4)),
//!     ];
//!
//!     let mut particle = TwoPhaseParticle::new(13, [1.0, 2.0, 3.0]);
//!     particle.solid_mut().assign_material(Arc::clone(&materials[0]));
//!     particle.solid_mut().assign_mass(501.5);
//!     particle.solid_mut().assign_volume(2.0);
//!     particle.assign_liquid_material(Arc::clone(&materials[1]));
//!
//!     // A one-rank group: the particle travels to itself.
//!     let rank = LocalGroup::new(1).remove(0);
//!     let datatype = register_particle_type(&rank, &TwoPhaseParticleRecord::default())?;
//!     exchange_particle(&rank, &datatype, 0, 0, 0, &mut particle, &materials)?;
//!     datatype.release();
//!
//!     assert_eq!(particle.solid().mass_density(), 250.75);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  particle   Particle / TwoPhaseParticle  <-> ParticleCodec           |
//! |             (materials bound by id through a MaterialSource)         |
//! +---------------------------------------------------------------------+
//! |  record     ParticleRecord / TwoPhaseParticleRecord (repr(C))        |
//! +---------------------------------------------------------------------+
//! |  datatype   TypeMap blocks | signature | pack / unpack               |
//! +---------------------------------------------------------------------+
//! |  exchange   send_record / recv_record / exchange_particle            |
//! +---------------------------------------------------------------------+
//! |  transport  LocalGroup (channels) | TcpGroup (framed TCP mesh)       |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`record`] - fixed-layout record types
//! - [`datatype`] - descriptor builder and packing
//! - [`material`] - material trait, factory and registry
//! - [`particle`] - live particles and the record codec
//! - [`exchange`] - single-record point-to-point transfer
//! - [`transport`] - rank groups
//! - [`config`] - shared constants and the YAML run file

pub mod config;
pub mod core;
pub mod datatype;
mod error;
pub mod exchange;
pub mod material;
pub mod particle;
pub mod record;
pub mod transport;

pub use datatype::{Datatype, RecordLayout};
pub use error::{Error, Result};
pub use particle::{Particle, ParticleCodec, ParticlePhase, TwoPhaseParticle};
pub use record::{ParticleRecord, TwoPhaseParticleRecord};
pub use transport::Transport;
