// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Saturated two-phase particle: a solid skeleton plus pore liquid.

use super::{
    check_range, check_state_count, EncodeError, Particle, ParticleCodec, ParticlePhase,
    ReconstructError,
};
use crate::config::{DIM, MAX_LIQUID_STATE_VARS};
use crate::material::{resolve_material, Material, MaterialId, MaterialSource};
use crate::record::TwoPhaseParticleRecord;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TwoPhaseParticle {
    solid: Particle,
    liquid_mass: f64,
    liquid_velocity: [f64; DIM],
    porosity: f64,
    liquid_saturation: f64,
    liquid_material: Option<Arc<dyn Material>>,
    liquid_state_variables: Vec<f64>,
}

impl TwoPhaseParticle {
    /// Fully saturated, with no liquid material bound yet.
    pub fn new(id: u64, coordinates: [f64; DIM]) -> Self {
        Self {
            solid: Particle::new(id, coordinates),
            liquid_mass: 0.,
            liquid_velocity: [0.; DIM],
            porosity: 0.,
            liquid_saturation: 1.,
            liquid_material: None,
            liquid_state_variables: Vec::new(),
        }
    }

    pub fn solid(&self) -> &Particle {
        &self.solid
    }

    pub fn solid_mut(&mut self) -> &mut Particle {
        &mut self.solid
    }

    pub fn liquid_mass(&self) -> f64 {
        self.liquid_mass
    }

    pub fn liquid_velocity(&self) -> [f64; DIM] {
        self.liquid_velocity
    }

    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    pub fn liquid_saturation(&self) -> f64 {
        self.liquid_saturation
    }

    pub fn liquid_material(&self) -> Option<&Arc<dyn Material>> {
        self.liquid_material.as_ref()
    }

    pub fn material_id(&self, phase: ParticlePhase) -> Option<MaterialId> {
        match phase {
            ParticlePhase::Solid => self.solid.material_id(),
            ParticlePhase::Liquid => self.liquid_material.as_ref().map(|m| m.id()),
        }
    }

    pub fn liquid_state_variables(&self) -> &[f64] {
        &self.liquid_state_variables
    }

    pub fn liquid_state_variable(&self, name: &str) -> Option<f64> {
        let index = self
            .liquid_material
            .as_ref()?
            .state_variable_names()
            .iter()
            .position(|n| *n == name)?;
        self.liquid_state_variables.get(index).copied()
    }

    pub fn assign_liquid_state_variable(&mut self, name: &str, value: f64) -> bool {
        let Some(index) = self
            .liquid_material
            .as_ref()
            .and_then(|m| m.state_variable_names().iter().position(|n| *n == name))
        else {
            return false;
        };
        self.liquid_state_variables[index] = value;
        true
    }

    pub fn assign_liquid_material(&mut self, material: Arc<dyn Material>) {
        self.liquid_state_variables = material.initial_state_variables();
        self.liquid_material = Some(material);
    }

    pub fn assign_liquid_mass(&mut self, liquid_mass: f64) {
        self.liquid_mass = liquid_mass;
    }

    pub fn assign_liquid_velocity(&mut self, velocity: [f64; DIM]) {
        self.liquid_velocity = velocity;
    }

    pub fn assign_porosity(&mut self, porosity: f64) {
        self.porosity = porosity;
    }

    pub fn assign_liquid_saturation(&mut self, saturation: f64) {
        self.liquid_saturation = saturation;
    }
}

impl ParticleCodec for TwoPhaseParticle {
    type Record = TwoPhaseParticleRecord;

    fn to_record(&self) -> Result<TwoPhaseParticleRecord, EncodeError> {
        let liquid = self
            .liquid_material
            .as_ref()
            .ok_or(EncodeError::UnboundMaterial(ParticlePhase::Liquid))?;
        let nliquid = self.liquid_state_variables.len();
        if nliquid > MAX_LIQUID_STATE_VARS {
            return Err(EncodeError::CapacityExceeded {
                phase: ParticlePhase::Liquid,
                count: nliquid,
                capacity: MAX_LIQUID_STATE_VARS,
            });
        }

        let mut record = TwoPhaseParticleRecord::default();
        self.solid.write_record(&mut record.solid)?;
        record.liquid_mass = self.liquid_mass;
        record.set_liquid_velocity(self.liquid_velocity);
        record.porosity = self.porosity;
        record.liquid_saturation = self.liquid_saturation;
        record.liquid_material_id = liquid.id();
        record.nliquid_state_vars = nliquid as u32;
        record.liquid_svars[..nliquid].copy_from_slice(&self.liquid_state_variables);
        Ok(record)
    }

    fn from_record<S: MaterialSource + ?Sized>(
        record: &TwoPhaseParticleRecord,
        materials: &S,
    ) -> Result<Self, ReconstructError> {
        let solid = Particle::from_record(&record.solid, materials)?;

        check_range("liquid_mass", record.liquid_mass, f64::INFINITY)?;
        check_range("porosity", record.porosity, 1.)?;
        check_range("liquid_saturation", record.liquid_saturation, 1.)?;

        let liquid = resolve_material(
            materials,
            ParticlePhase::Liquid,
            record.liquid_material_id,
        )?;
        let nliquid = check_state_count(
            ParticlePhase::Liquid,
            liquid.id(),
            liquid.state_variable_names().len(),
            record.nliquid_state_vars,
            MAX_LIQUID_STATE_VARS,
        )?;

        Ok(Self {
            solid,
            liquid_mass: record.liquid_mass,
            liquid_velocity: record.liquid_velocity(),
            porosity: record.porosity,
            liquid_saturation: record.liquid_saturation,
            liquid_material: Some(liquid),
            liquid_state_variables: record.liquid_svars[..nliquid].to_vec(),
        })
    }
}
