// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Randomized encode / pack / unpack / decode round trips.

use mpm_exchange::config::{MAX_STATE_VARS, UNASSIGNED_CELL};
use mpm_exchange::datatype::{Datatype, DatatypeRegistry};
use mpm_exchange::material::{Material, MaterialId};
use mpm_exchange::particle::{Particle, ParticleCodec};
use mpm_exchange::record::ParticleRecord;
use std::sync::Arc;

/// Test material with a configurable number of history variables.
#[derive(Debug)]
struct History {
    id: MaterialId,
    names: Vec<&'static str>,
}

const NAMES: [&str; MAX_STATE_VARS] = [
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "s12", "s13",
    "s14", "s15", "s16", "s17", "s18", "s19",
];

impl Material for History {
    fn id(&self) -> MaterialId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "History"
    }

    fn state_variable_names(&self) -> &[&'static str] {
        &self.names
    }

    fn property(&self, _name: &str) -> Option<f64> {
        None
    }
}

fn random_f64(rng: &mut fastrand::Rng) -> f64 {
    (rng.f64() - 0.5) * 1.0e6
}

fn random_vec<const N: usize>(rng: &mut fastrand::Rng) -> [f64; N] {
    std::array::from_fn(|_| random_f64(rng))
}

fn random_particle(rng: &mut fastrand::Rng, materials: &[Arc<dyn Material>]) -> Particle {
    let mut particle = Particle::new(rng.u64(..), random_vec(rng));
    let material = &materials[rng.usize(..materials.len())];
    particle.assign_material(Arc::clone(material));
    for name in material.state_variable_names() {
        particle.assign_state_variable(name, random_f64(rng));
    }
    particle.assign_mass(rng.f64() * 1.0e3);
    particle.assign_volume(rng.f64() + 1.0e-3);
    particle.assign_pressure(random_f64(rng));
    particle.assign_displacement(random_vec(rng));
    particle.assign_natural_size(random_vec(rng));
    particle.assign_velocity(random_vec(rng));
    particle.assign_stress(random_vec(rng));
    particle.assign_strain(random_vec(rng));
    particle.assign_volumetric_strain_centroid(random_f64(rng));
    particle.assign_status(rng.bool());
    particle.assign_cell_id(rng.bool().then(|| rng.u64(..UNASSIGNED_CELL)));
    particle
}

#[test]
fn test_random_particles_survive_pack_and_rebuild() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let materials: Vec<Arc<dyn Material>> = (0..=MAX_STATE_VARS)
        .map(|n| {
            Arc::new(History {
                id: n as MaterialId + 10,
                names: NAMES[..n].to_vec(),
            }) as Arc<dyn Material>
        })
        .collect();

    let registry = Arc::new(DatatypeRegistry::new());
    let datatype = Datatype::commit(&registry, &ParticleRecord::default());

    for _ in 0..500 {
        let particle = random_particle(&mut rng, &materials);
        let record = particle.to_record().expect("encode");
        let bytes = datatype.pack(&record).expect("pack");

        let mut received = ParticleRecord::default();
        datatype.unpack(&bytes, &mut received).expect("unpack");
        assert_eq!(received, record);

        let rebuilt = Particle::from_record(&received, &materials).expect("rebuild");
        assert_eq!(rebuilt.id(), particle.id());
        assert_eq!(rebuilt.coordinates(), particle.coordinates());
        assert_eq!(rebuilt.stress(), particle.stress());
        assert_eq!(rebuilt.strain(), particle.strain());
        assert_eq!(rebuilt.status(), particle.status());
        assert_eq!(rebuilt.cell_id(), particle.cell_id());
        assert_eq!(rebuilt.state_variables(), particle.state_variables());
        assert_eq!(rebuilt.mass_density(), particle.mass() / particle.volume());
        assert_eq!(rebuilt.to_record().expect("encode"), record);
    }
    assert!(datatype.release());
}

#[test]
fn test_filler_beyond_active_count_is_ignored() {
    let materials: Vec<Arc<dyn Material>> = vec![Arc::new(History {
        id: 3,
        names: NAMES[..2].to_vec(),
    })];
    let mut particle = Particle::new(1, [0.0; 3]);
    particle.assign_material(Arc::clone(&materials[0]));
    particle.assign_state_variable("s0", 1.5);
    particle.assign_state_variable("s1", 2.5);

    let mut record = particle.to_record().expect("encode");
    record.svars[2..].fill(f64::NAN);

    let rebuilt = Particle::from_record(&record, &materials).expect("rebuild");
    assert_eq!(rebuilt.state_variables(), &[1.5, 2.5]);
}

#[test]
fn test_reconstruction_is_idempotent() {
    let mut rng = fastrand::Rng::with_seed(7);
    let materials: Vec<Arc<dyn Material>> = vec![Arc::new(History {
        id: 1,
        names: NAMES[..4].to_vec(),
    })];
    let record = random_particle(&mut rng, &materials)
        .to_record()
        .expect("encode");

    let mut particle = Particle::new(0, [0.0; 3]);
    particle
        .initialise_from_record(&record, &materials)
        .expect("first");
    let first = particle.to_record().expect("encode");
    particle
        .initialise_from_record(&record, &materials)
        .expect("second");
    assert_eq!(particle.to_record().expect("encode"), first);
    assert_eq!(first, record);
}
