// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Single-phase particle.

use super::{check_range, check_state_count, EncodeError, ParticleCodec, ParticlePhase, ReconstructError};
use crate::config::{DIM, MAX_STATE_VARS, UNASSIGNED_CELL, VOIGT};
use crate::material::{resolve_material, Material, MaterialId, MaterialSource};
use crate::record::ParticleRecord;
use std::sync::Arc;

/// A material point carrying solid-phase state.
#[derive(Debug, Clone)]
pub struct Particle {
    id: u64,
    coordinates: [f64; DIM],
    displacement: [f64; DIM],
    natural_size: [f64; DIM],
    velocity: [f64; DIM],
    mass: f64,
    volume: f64,
    mass_density: f64,
    pressure: f64,
    stress: [f64; VOIGT],
    strain: [f64; VOIGT],
    volumetric_strain_centroid: f64,
    status: bool,
    cell_id: Option<u64>,
    material: Option<Arc<dyn Material>>,
    state_variables: Vec<f64>,
}

impl Particle {
    pub fn new(id: u64, coordinates: [f64; DIM]) -> Self {
        Self {
            id,
            coordinates,
            displacement: [0.; DIM],
            natural_size: [0.; DIM],
            velocity: [0.; DIM],
            mass: 0.,
            volume: 0.,
            mass_density: 0.,
            pressure: 0.,
            stress: [0.; VOIGT],
            strain: [0.; VOIGT],
            volumetric_strain_centroid: 0.,
            status: true,
            cell_id: None,
            material: None,
            state_variables: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn coordinates(&self) -> [f64; DIM] {
        self.coordinates
    }

    pub fn displacement(&self) -> [f64; DIM] {
        self.displacement
    }

    pub fn natural_size(&self) -> [f64; DIM] {
        self.natural_size
    }

    pub fn velocity(&self) -> [f64; DIM] {
        self.velocity
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Derived from mass and volume, never stored independently.
    pub fn mass_density(&self) -> f64 {
        self.mass_density
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Voigt order: xx, yy, zz, xy, yz, xz.
    pub fn stress(&self) -> [f64; VOIGT] {
        self.stress
    }

    /// Voigt order: xx, yy, zz, xy, yz, xz.
    pub fn strain(&self) -> [f64; VOIGT] {
        self.strain
    }

    pub fn volumetric_strain_centroid(&self) -> f64 {
        self.volumetric_strain_centroid
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn cell_id(&self) -> Option<u64> {
        self.cell_id
    }

    pub fn material(&self) -> Option<&Arc<dyn Material>> {
        self.material.as_ref()
    }

    pub fn material_id(&self) -> Option<MaterialId> {
        self.material.as_ref().map(|m| m.id())
    }

    pub fn state_variables(&self) -> &[f64] {
        &self.state_variables
    }

    /// Value of a named state variable of the bound material.
    pub fn state_variable(&self, name: &str) -> Option<f64> {
        let index = self
            .material
            .as_ref()?
            .state_variable_names()
            .iter()
            .position(|n| *n == name)?;
        self.state_variables.get(index).copied()
    }

    /// Returns `false` if the bound material has no such variable.
    pub fn assign_state_variable(&mut self, name: &str, value: f64) -> bool {
        let Some(index) = self
            .material
            .as_ref()
            .and_then(|m| m.state_variable_names().iter().position(|n| *n == name))
        else {
            return false;
        };
        self.state_variables[index] = value;
        true
    }

    /// Bind a material and reset state variables to its initial values.
    pub fn assign_material(&mut self, material: Arc<dyn Material>) {
        self.state_variables = material.initial_state_variables();
        self.material = Some(material);
    }

    pub fn assign_cell_id(&mut self, cell_id: Option<u64>) {
        self.cell_id = cell_id;
    }

    pub fn assign_coordinates(&mut self, coordinates: [f64; DIM]) {
        self.coordinates = coordinates;
    }

    pub fn assign_displacement(&mut self, displacement: [f64; DIM]) {
        self.displacement = displacement;
    }

    pub fn assign_natural_size(&mut self, natural_size: [f64; DIM]) {
        self.natural_size = natural_size;
    }

    pub fn assign_velocity(&mut self, velocity: [f64; DIM]) {
        self.velocity = velocity;
    }

    pub fn assign_mass(&mut self, mass: f64) {
        self.mass = mass;
        self.update_mass_density();
    }

    pub fn assign_volume(&mut self, volume: f64) {
        self.volume = volume;
        self.update_mass_density();
    }

    pub fn assign_pressure(&mut self, pressure: f64) {
        self.pressure = pressure;
    }

    pub fn assign_stress(&mut self, stress: [f64; VOIGT]) {
        self.stress = stress;
    }

    pub fn assign_strain(&mut self, strain: [f64; VOIGT]) {
        self.strain = strain;
    }

    pub fn assign_volumetric_strain_centroid(&mut self, epsilon_v: f64) {
        self.volumetric_strain_centroid = epsilon_v;
    }

    pub fn assign_status(&mut self, status: bool) {
        self.status = status;
    }

    fn update_mass_density(&mut self) {
        self.mass_density = if self.volume > 0. {
            self.mass / self.volume
        } else {
            0.
        };
    }

    /// Write the solid state into `record`. Filler past the active state
    /// variables is left as it was.
    pub(crate) fn write_record(&self, record: &mut ParticleRecord) -> Result<(), EncodeError> {
        let material = self
            .material
            .as_ref()
            .ok_or(EncodeError::UnboundMaterial(ParticlePhase::Solid))?;
        let nstate_vars = self.state_variables.len();
        if nstate_vars > MAX_STATE_VARS {
            return Err(EncodeError::CapacityExceeded {
                phase: ParticlePhase::Solid,
                count: nstate_vars,
                capacity: MAX_STATE_VARS,
            });
        }

        record.id = self.id;
        record.mass = self.mass;
        record.volume = self.volume;
        record.pressure = self.pressure;
        record.set_coordinates(self.coordinates);
        record.set_displacement(self.displacement);
        record.set_natural_size(self.natural_size);
        record.set_velocity(self.velocity);
        record.set_stress(self.stress);
        record.set_strain(self.strain);
        record.epsilon_v = self.volumetric_strain_centroid;
        record.status = self.status;
        record.cell_id = self.cell_id.unwrap_or(UNASSIGNED_CELL);
        record.material_id = material.id();
        record.nstate_vars = nstate_vars as u32;
        record.svars[..nstate_vars].copy_from_slice(&self.state_variables);
        Ok(())
    }
}

impl ParticleCodec for Particle {
    type Record = ParticleRecord;

    fn to_record(&self) -> Result<ParticleRecord, EncodeError> {
        let mut record = ParticleRecord::default();
        self.write_record(&mut record)?;
        Ok(record)
    }

    fn from_record<S: MaterialSource + ?Sized>(
        record: &ParticleRecord,
        materials: &S,
    ) -> Result<Self, ReconstructError> {
        check_range("mass", record.mass, f64::INFINITY)?;
        check_range("volume", record.volume, f64::INFINITY)?;
        let cell_id = record.cell();
        if cell_id.is_some() && record.volume <= 0. {
            return Err(ReconstructError::InvalidField {
                name: "volume",
                value: record.volume,
            });
        }

        let material = resolve_material(materials, ParticlePhase::Solid, record.material_id)?;
        let nstate_vars = check_state_count(
            ParticlePhase::Solid,
            material.id(),
            material.state_variable_names().len(),
            record.nstate_vars,
            MAX_STATE_VARS,
        )?;

        let mut particle = Particle {
            id: record.id,
            coordinates: record.coordinates(),
            displacement: record.displacement(),
            natural_size: record.natural_size(),
            velocity: record.velocity(),
            mass: record.mass,
            volume: record.volume,
            mass_density: 0.,
            pressure: record.pressure,
            stress: record.stress(),
            strain: record.strain(),
            volumetric_strain_centroid: record.epsilon_v,
            status: record.status,
            cell_id,
            material: Some(material),
            state_variables: record.svars[..nstate_vars].to_vec(),
        };
        particle.update_mass_density();
        Ok(particle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{LinearElastic, Newtonian};

    fn materials() -> Vec<Arc<dyn Material>> {
        vec![
            Arc::new(LinearElastic::new(1, 1000., 1.0e7, 0.3)),
            Arc::new(Newtonian::new(2, 1000., 2.0e9, 8.9e-4)),
        ]
    }

    fn sample(materials: &[Arc<dyn Material>]) -> Particle {
        let mut particle = Particle::new(13, [1., 2., 3.]);
        particle.assign_material(Arc::clone(&materials[0]));
        particle.assign_mass(501.5);
        particle.assign_volume(2.);
        particle.assign_pressure(125.75);
        particle.assign_displacement([0.01, 0.02, 0.03]);
        particle.assign_natural_size([0.25, 0.5, 0.75]);
        particle.assign_velocity([1.5, 2.5, 3.5]);
        particle.assign_stress([11.5, -12.5, 13.5, 14.5, -15.5, 16.5]);
        particle.assign_strain([0.115, -0.125, 0.135, 0.145, -0.155, 0.165]);
        particle.assign_volumetric_strain_centroid(0.125);
        particle.assign_cell_id(Some(1));
        particle
    }

    /// Carries one history variable more than a record can hold.
    #[derive(Debug)]
    struct OverfullHistory;

    const OVERFULL_NAMES: [&str; MAX_STATE_VARS + 1] = ["history"; MAX_STATE_VARS + 1];

    impl Material for OverfullHistory {
        fn id(&self) -> MaterialId {
            9
        }

        fn kind(&self) -> &'static str {
            "OverfullHistory"
        }

        fn state_variable_names(&self) -> &[&'static str] {
            &OVERFULL_NAMES
        }

        fn property(&self, _name: &str) -> Option<f64> {
            None
        }
    }

    #[test]
    fn test_mass_density_follows_mass_and_volume() {
        let materials = materials();
        let particle = sample(&materials);
        assert_eq!(particle.mass_density(), 250.75);
    }

    #[test]
    fn test_to_record_copies_fields_verbatim() {
        let materials = materials();
        let record = sample(&materials).to_record().expect("encode");
        assert_eq!(record.id, 13);
        assert_eq!(record.mass, 501.5);
        assert_eq!(record.pressure, 125.75);
        assert_eq!(record.stress(), [11.5, -12.5, 13.5, 14.5, -15.5, 16.5]);
        assert_eq!(record.cell_id, 1);
        assert_eq!(record.material_id, 1);
        assert_eq!(record.nstate_vars, 0);
    }

    #[test]
    fn test_unbound_material_is_a_precondition_violation() {
        let particle = Particle::new(1, [0.; DIM]);
        assert_eq!(
            particle.to_record().unwrap_err(),
            EncodeError::UnboundMaterial(ParticlePhase::Solid)
        );
    }

    #[test]
    fn test_too_many_state_variables_refuse_to_encode() {
        let mut particle = Particle::new(3, [0.; DIM]);
        particle.assign_material(Arc::new(OverfullHistory));
        assert_eq!(
            particle.to_record().unwrap_err(),
            EncodeError::CapacityExceeded {
                phase: ParticlePhase::Solid,
                count: MAX_STATE_VARS + 1,
                capacity: MAX_STATE_VARS
            }
        );
    }

    #[test]
    fn test_round_trip_with_state_variables() {
        let materials = materials();
        let mut particle = Particle::new(5, [0.5, 0.5, 0.5]);
        particle.assign_material(Arc::clone(&materials[1]));
        particle.assign_mass(10.);
        particle.assign_volume(4.);
        assert!(particle.assign_state_variable("pressure", -3.25));
        assert!(!particle.assign_state_variable("plastic_strain", 1.0));

        let record = particle.to_record().expect("encode");
        assert_eq!(record.state_vars(), &[-3.25]);

        let rebuilt = Particle::from_record(&record, &materials).expect("decode");
        assert_eq!(rebuilt.state_variable("pressure"), Some(-3.25));
        assert_eq!(rebuilt.mass_density(), 2.5);
        assert!(Arc::ptr_eq(
            rebuilt.material().expect("bound"),
            &materials[1]
        ));
    }

    #[test]
    fn test_unassigned_cell_round_trips() {
        let materials = materials();
        let mut particle = sample(&materials);
        particle.assign_cell_id(None);
        let record = particle.to_record().expect("encode");
        assert_eq!(record.cell_id, UNASSIGNED_CELL);
        let rebuilt = Particle::from_record(&record, &materials).expect("decode");
        assert_eq!(rebuilt.cell_id(), None);
    }

    #[test]
    fn test_located_particle_needs_positive_volume() {
        let materials = materials();
        let mut record = sample(&materials).to_record().expect("encode");
        record.volume = 0.;
        assert_eq!(
            Particle::from_record(&record, &materials).unwrap_err(),
            ReconstructError::InvalidField {
                name: "volume",
                value: 0.
            }
        );

        record.cell_id = UNASSIGNED_CELL;
        let rebuilt = Particle::from_record(&record, &materials).expect("unlocated");
        assert_eq!(rebuilt.mass_density(), 0.);
    }

    #[test]
    fn test_initialise_keeps_state_on_failure() {
        let materials = materials();
        let mut particle = sample(&materials);
        let mut record = particle.to_record().expect("encode");
        record.id = 99;
        record.material_id = 42;

        let err = particle
            .initialise_from_record(&record, &materials)
            .unwrap_err();
        assert_eq!(
            err,
            ReconstructError::MaterialNotFound {
                phase: ParticlePhase::Solid,
                id: 42
            }
        );
        assert_eq!(particle.id(), 13);
        assert_eq!(particle.material_id(), Some(1));
    }
}
