// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Two-phase (solid skeleton + pore liquid) particle record.

use super::ParticleRecord;
use crate::config::{DIM, MAX_LIQUID_STATE_VARS};
use crate::datatype::{RecordLayout, TypeMapBuilder};

/// Flat state of one two-phase particle: the solid record followed by the
/// liquid section.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPhaseParticleRecord {
    pub solid: ParticleRecord,

    pub liquid_mass: f64,
    pub liquid_velocity_x: f64,
    pub liquid_velocity_y: f64,
    pub liquid_velocity_z: f64,
    /// Volume fraction of pores, in [0, 1].
    pub porosity: f64,
    /// Fraction of pore volume filled with liquid, in [0, 1].
    pub liquid_saturation: f64,

    /// Independent of `solid.material_id`.
    pub liquid_material_id: u32,

    /// Active entries of `liquid_svars`; at most [`MAX_LIQUID_STATE_VARS`].
    pub nliquid_state_vars: u32,
    pub liquid_svars: [f64; MAX_LIQUID_STATE_VARS],
}

impl Default for TwoPhaseParticleRecord {
    fn default() -> Self {
        Self {
            solid: ParticleRecord::default(),
            liquid_mass: 0.,
            liquid_velocity_x: 0.,
            liquid_velocity_y: 0.,
            liquid_velocity_z: 0.,
            porosity: 0.,
            liquid_saturation: 1.,
            liquid_material_id: 0,
            nliquid_state_vars: 0,
            liquid_svars: [0.; MAX_LIQUID_STATE_VARS],
        }
    }
}

impl TwoPhaseParticleRecord {
    pub fn liquid_velocity(&self) -> [f64; DIM] {
        [
            self.liquid_velocity_x,
            self.liquid_velocity_y,
            self.liquid_velocity_z,
        ]
    }

    pub fn set_liquid_velocity(&mut self, [x, y, z]: [f64; DIM]) {
        self.liquid_velocity_x = x;
        self.liquid_velocity_y = y;
        self.liquid_velocity_z = z;
    }

    pub fn liquid_state_vars(&self) -> &[f64] {
        let n = (self.nliquid_state_vars as usize).min(MAX_LIQUID_STATE_VARS);
        &self.liquid_svars[..n]
    }
}

// SAFETY: `describe` only names plain fields and arrays of this `repr(C)`
// struct, which has no enum or pointer members.
unsafe impl RecordLayout for TwoPhaseParticleRecord {
    const TYPE_NAME: &'static str = "TwoPhaseParticleRecord";

    fn describe<'r>(&'r self, map: &mut TypeMapBuilder<'r>) {
        self.solid.describe(map);
        map.scalar(&self.liquid_mass)
            .scalar(&self.liquid_velocity_x)
            .scalar(&self.liquid_velocity_y)
            .scalar(&self.liquid_velocity_z)
            .scalar(&self.porosity)
            .scalar(&self.liquid_saturation)
            .scalar(&self.liquid_material_id)
            .scalar(&self.nliquid_state_vars)
            .array(&self.liquid_svars);
    }
}
