// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Single-phase particle record.

use crate::config::{DIM, MAX_STATE_VARS, UNASSIGNED_CELL, VOIGT};
use crate::datatype::{RecordLayout, TypeMapBuilder};

/// Flat state of one single-phase particle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub id: u64,
    pub mass: f64,
    pub volume: f64,
    pub pressure: f64,

    pub coord_x: f64,
    pub coord_y: f64,
    pub coord_z: f64,

    pub displacement_x: f64,
    pub displacement_y: f64,
    pub displacement_z: f64,

    pub nsize_x: f64,
    pub nsize_y: f64,
    pub nsize_z: f64,

    pub velocity_x: f64,
    pub velocity_y: f64,
    pub velocity_z: f64,

    pub stress_xx: f64,
    pub stress_yy: f64,
    pub stress_zz: f64,
    pub tau_xy: f64,
    pub tau_yz: f64,
    pub tau_xz: f64,

    pub strain_xx: f64,
    pub strain_yy: f64,
    pub strain_zz: f64,
    pub gamma_xy: f64,
    pub gamma_yz: f64,
    pub gamma_xz: f64,

    /// Volumetric strain at the cell centroid.
    pub epsilon_v: f64,

    pub status: bool,

    /// [`UNASSIGNED_CELL`] until the particle has been located in the mesh.
    pub cell_id: u64,

    pub material_id: u32,

    /// Active entries of `svars`; at most [`MAX_STATE_VARS`].
    pub nstate_vars: u32,
    pub svars: [f64; MAX_STATE_VARS],
}

impl Default for ParticleRecord {
    fn default() -> Self {
        Self {
            id: 0,
            mass: 0.,
            volume: 0.,
            pressure: 0.,
            coord_x: 0.,
            coord_y: 0.,
            coord_z: 0.,
            displacement_x: 0.,
            displacement_y: 0.,
            displacement_z: 0.,
            nsize_x: 0.,
            nsize_y: 0.,
            nsize_z: 0.,
            velocity_x: 0.,
            velocity_y: 0.,
            velocity_z: 0.,
            stress_xx: 0.,
            stress_yy: 0.,
            stress_zz: 0.,
            tau_xy: 0.,
            tau_yz: 0.,
            tau_xz: 0.,
            strain_xx: 0.,
            strain_yy: 0.,
            strain_zz: 0.,
            gamma_xy: 0.,
            gamma_yz: 0.,
            gamma_xz: 0.,
            epsilon_v: 0.,
            status: true,
            cell_id: UNASSIGNED_CELL,
            material_id: 0,
            nstate_vars: 0,
            svars: [0.; MAX_STATE_VARS],
        }
    }
}

impl ParticleRecord {
    pub fn coordinates(&self) -> [f64; DIM] {
        [self.coord_x, self.coord_y, self.coord_z]
    }

    pub fn set_coordinates(&mut self, [x, y, z]: [f64; DIM]) {
        self.coord_x = x;
        self.coord_y = y;
        self.coord_z = z;
    }

    pub fn displacement(&self) -> [f64; DIM] {
        [self.displacement_x, self.displacement_y, self.displacement_z]
    }

    pub fn set_displacement(&mut self, [x, y, z]: [f64; DIM]) {
        self.displacement_x = x;
        self.displacement_y = y;
        self.displacement_z = z;
    }

    pub fn natural_size(&self) -> [f64; DIM] {
        [self.nsize_x, self.nsize_y, self.nsize_z]
    }

    pub fn set_natural_size(&mut self, [x, y, z]: [f64; DIM]) {
        self.nsize_x = x;
        self.nsize_y = y;
        self.nsize_z = z;
    }

    pub fn velocity(&self) -> [f64; DIM] {
        [self.velocity_x, self.velocity_y, self.velocity_z]
    }

    pub fn set_velocity(&mut self, [x, y, z]: [f64; DIM]) {
        self.velocity_x = x;
        self.velocity_y = y;
        self.velocity_z = z;
    }

    /// Stress in Voigt order (xx, yy, zz, xy, yz, xz).
    pub fn stress(&self) -> [f64; VOIGT] {
        [
            self.stress_xx,
            self.stress_yy,
            self.stress_zz,
            self.tau_xy,
            self.tau_yz,
            self.tau_xz,
        ]
    }

    pub fn set_stress(&mut self, [xx, yy, zz, xy, yz, xz]: [f64; VOIGT]) {
        self.stress_xx = xx;
        self.stress_yy = yy;
        self.stress_zz = zz;
        self.tau_xy = xy;
        self.tau_yz = yz;
        self.tau_xz = xz;
    }

    /// Strain in Voigt order (xx, yy, zz, xy, yz, xz).
    pub fn strain(&self) -> [f64; VOIGT] {
        [
            self.strain_xx,
            self.strain_yy,
            self.strain_zz,
            self.gamma_xy,
            self.gamma_yz,
            self.gamma_xz,
        ]
    }

    pub fn set_strain(&mut self, [xx, yy, zz, xy, yz, xz]: [f64; VOIGT]) {
        self.strain_xx = xx;
        self.strain_yy = yy;
        self.strain_zz = zz;
        self.gamma_xy = xy;
        self.gamma_yz = yz;
        self.gamma_xz = xz;
    }

    pub fn cell(&self) -> Option<u64> {
        (self.cell_id != UNASSIGNED_CELL).then_some(self.cell_id)
    }

    /// Active state variables; entries past `nstate_vars` are filler.
    pub fn state_vars(&self) -> &[f64] {
        let n = (self.nstate_vars as usize).min(MAX_STATE_VARS);
        &self.svars[..n]
    }
}

// SAFETY: `describe` only names plain fields and arrays of this `repr(C)`
// struct, which has no enum or pointer members.
unsafe impl RecordLayout for ParticleRecord {
    const TYPE_NAME: &'static str = "ParticleRecord";

    fn describe<'r>(&'r self, map: &mut TypeMapBuilder<'r>) {
        map.scalar(&self.id)
            .scalar(&self.mass)
            .scalar(&self.volume)
            .scalar(&self.pressure)
            .scalar(&self.coord_x)
            .scalar(&self.coord_y)
            .scalar(&self.coord_z)
            .scalar(&self.displacement_x)
            .scalar(&self.displacement_y)
            .scalar(&self.displacement_z)
            .scalar(&self.nsize_x)
            .scalar(&self.nsize_y)
            .scalar(&self.nsize_z)
            .scalar(&self.velocity_x)
            .scalar(&self.velocity_y)
            .scalar(&self.velocity_z)
            .scalar(&self.stress_xx)
            .scalar(&self.stress_yy)
            .scalar(&self.stress_zz)
            .scalar(&self.tau_xy)
            .scalar(&self.tau_yz)
            .scalar(&self.tau_xz)
            .scalar(&self.strain_xx)
            .scalar(&self.strain_yy)
            .scalar(&self.strain_zz)
            .scalar(&self.gamma_xy)
            .scalar(&self.gamma_yz)
            .scalar(&self.gamma_xz)
            .scalar(&self.epsilon_v)
            .scalar(&self.status)
            .scalar(&self.cell_id)
            .scalar(&self.material_id)
            .scalar(&self.nstate_vars)
            .array(&self.svars);
    }
}
