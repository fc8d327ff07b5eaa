// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Live particles and their record codec.
//!
//! A particle owns its kinematic and mechanical state and holds shared,
//! non-owning handles to the materials it is bound to. [`ParticleCodec`]
//! flattens it into its record kind and rebuilds it from one, re-binding
//! materials by id against a [`MaterialSource`].
//!
//! Reconstruction is all-or-nothing: on any error no particle is produced,
//! and [`ParticleCodec::initialise_from_record`] leaves the target untouched.

mod single;
mod twophase;

pub use single::Particle;
pub use twophase::TwoPhaseParticle;

use crate::datatype::RecordLayout;
use crate::material::{MaterialId, MaterialSource};
use std::fmt;

/// Phase a material binding or state-variable set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticlePhase {
    Solid,
    Liquid,
}

impl fmt::Display for ParticlePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticlePhase::Solid => f.write_str("solid"),
            ParticlePhase::Liquid => f.write_str("liquid"),
        }
    }
}

/// Conversion between a live particle and its fixed-layout record.
pub trait ParticleCodec: Sized {
    type Record: RecordLayout;

    /// Flatten the particle into a fully populated record.
    fn to_record(&self) -> Result<Self::Record, EncodeError>;

    /// Rebuild a particle from `record`, binding materials from `materials`.
    fn from_record<S: MaterialSource + ?Sized>(
        record: &Self::Record,
        materials: &S,
    ) -> Result<Self, ReconstructError>;

    /// Re-populate `self` from `record`. On error `self` is unchanged.
    fn initialise_from_record<S: MaterialSource + ?Sized>(
        &mut self,
        record: &Self::Record,
        materials: &S,
    ) -> Result<(), ReconstructError> {
        *self = Self::from_record(record, materials)?;
        Ok(())
    }
}

/// Precondition violations detected while flattening a particle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The phase is present but no material is bound to it.
    UnboundMaterial(ParticlePhase),
    /// More active state variables than the record can carry.
    CapacityExceeded {
        phase: ParticlePhase,
        count: usize,
        capacity: usize,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnboundMaterial(phase) => {
                write!(f, "no {} material bound to particle", phase)
            }
            EncodeError::CapacityExceeded {
                phase,
                count,
                capacity,
            } => write!(
                f,
                "{} {} state variables exceed record capacity {}",
                count, phase, capacity
            ),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Reasons a record cannot be turned back into a particle.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconstructError {
    MaterialNotFound {
        phase: ParticlePhase,
        id: MaterialId,
    },
    CapacityExceeded {
        phase: ParticlePhase,
        count: usize,
        capacity: usize,
    },
    /// The record's state-variable count differs from what the resolved
    /// material defines.
    StateVariableMismatch {
        phase: ParticlePhase,
        material_id: MaterialId,
        expected: usize,
        found: usize,
    },
    InvalidField {
        name: &'static str,
        value: f64,
    },
}

impl fmt::Display for ReconstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructError::MaterialNotFound { phase, id } => {
                write!(f, "{} material id {} not found in registry", phase, id)
            }
            ReconstructError::CapacityExceeded {
                phase,
                count,
                capacity,
            } => write!(
                f,
                "record claims {} {} state variables, capacity is {}",
                count, phase, capacity
            ),
            ReconstructError::StateVariableMismatch {
                phase,
                material_id,
                expected,
                found,
            } => write!(
                f,
                "{} material {} defines {} state variables, record carries {}",
                phase, material_id, expected, found
            ),
            ReconstructError::InvalidField { name, value } => {
                write!(f, "invalid value {} for field '{}'", value, name)
            }
        }
    }
}

impl std::error::Error for ReconstructError {}

/// Check a count field against its capacity and the bound material.
pub(crate) fn check_state_count(
    phase: ParticlePhase,
    material_id: MaterialId,
    expected: usize,
    found: u32,
    capacity: usize,
) -> Result<usize, ReconstructError> {
    let found = found as usize;
    if found > capacity {
        return Err(ReconstructError::CapacityExceeded {
            phase,
            count: found,
            capacity,
        });
    }
    if found != expected {
        return Err(ReconstructError::StateVariableMismatch {
            phase,
            material_id,
            expected,
            found,
        });
    }
    Ok(found)
}

/// `value` must be a finite number in `[0, upper]`.
pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    upper: f64,
) -> Result<(), ReconstructError> {
    if value.is_finite() && (0.0..=upper).contains(&value) {
        Ok(())
    } else {
        Err(ReconstructError::InvalidField { name, value })
    }
}
