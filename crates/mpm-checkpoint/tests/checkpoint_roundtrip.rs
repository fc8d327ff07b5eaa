// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

use mpm_checkpoint::{CheckpointError, CheckpointReader, CheckpointWriter, FileHeader};
use mpm_exchange::material::{LinearElastic, Material, Newtonian};
use mpm_exchange::particle::{ParticleCodec, ReconstructError, TwoPhaseParticle};
use mpm_exchange::record::{ParticleRecord, TwoPhaseParticleRecord};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;
use tempfile::tempdir;

fn materials() -> Vec<Arc<dyn Material>> {
    vec![
        Arc::new(LinearElastic::new(1, 1000.0, 1.0e7, 0.3)),
        Arc::new(Newtonian::new(2, 1000.0, 2.0e9, 8.9e-4)),
    ]
}

fn particle(id: u64, materials: &[Arc<dyn Material>]) -> TwoPhaseParticle {
    let mut particle = TwoPhaseParticle::new(id, [id as f64, 0.5, -1.0]);
    particle.solid_mut().assign_material(Arc::clone(&materials[0]));
    particle.solid_mut().assign_mass(10.0 + id as f64);
    particle.solid_mut().assign_volume(0.5);
    particle.solid_mut().assign_cell_id(Some(id * 2));
    particle.assign_liquid_material(Arc::clone(&materials[1]));
    particle.assign_liquid_mass(2.5);
    particle.assign_porosity(0.3);
    particle.assign_liquid_state_variable("pressure", -(id as f64));
    particle
}

#[test]
fn test_particles_restore_from_checkpoint() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("particles.mpmckpt");
    let materials = materials();

    let mut writer = CheckpointWriter::<TwoPhaseParticleRecord>::create(&path).expect("create");
    for id in 0..25 {
        writer.write_particle(&particle(id, &materials)).expect("write");
    }
    assert_eq!(writer.finalize().expect("finalize"), 25);

    let reader = CheckpointReader::<TwoPhaseParticleRecord>::open(&path).expect("open");
    assert_eq!(reader.record_count(), 25);
    let restored = reader
        .restore::<TwoPhaseParticle, _>(&materials)
        .expect("restore");
    assert!(restored.failures.is_empty());
    assert_eq!(restored.particles.len(), 25);

    for (id, restored) in restored.particles.iter().enumerate() {
        let original = particle(id as u64, &materials);
        assert_eq!(
            restored.to_record().expect("encode"),
            original.to_record().expect("encode")
        );
        assert_eq!(restored.solid().mass_density(), (10.0 + id as f64) / 0.5);
    }
}

#[test]
fn test_unresolvable_records_are_reported_not_fatal() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("partial.mpmckpt");
    let materials = materials();

    let mut writer = CheckpointWriter::<TwoPhaseParticleRecord>::create(&path).expect("create");
    for id in 0..3 {
        let mut record = particle(id, &materials).to_record().expect("encode");
        if id == 1 {
            record.liquid_material_id = 40;
        }
        writer.write_record(&record).expect("write");
    }
    writer.finalize().expect("finalize");

    let restored = CheckpointReader::<TwoPhaseParticleRecord>::open(&path)
        .expect("open")
        .restore::<TwoPhaseParticle, _>(&materials)
        .expect("restore");
    assert_eq!(restored.particles.len(), 2);
    assert_eq!(restored.failures.len(), 1);
    assert_eq!(restored.failures[0].0, 1);
    assert!(matches!(
        restored.failures[0].1,
        ReconstructError::MaterialNotFound { id: 40, .. }
    ));
}

#[test]
fn test_record_kind_is_checked_on_open() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("single.mpmckpt");

    let mut writer = CheckpointWriter::<ParticleRecord>::create(&path).expect("create");
    writer.write_record(&ParticleRecord::default()).expect("write");
    writer.finalize().expect("finalize");

    assert!(matches!(
        CheckpointReader::<TwoPhaseParticleRecord>::open(&path),
        Err(CheckpointError::SignatureMismatch { .. })
    ));
    assert!(CheckpointReader::<ParticleRecord>::open(&path).is_ok());
}

#[test]
fn test_corrupted_body_fails_crc() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("corrupt.mpmckpt");

    let mut writer = CheckpointWriter::<ParticleRecord>::create(&path).expect("create");
    let record = ParticleRecord {
        id: 7,
        mass: 3.0,
        ..Default::default()
    };
    writer.write_record(&record).expect("write");
    writer.finalize().expect("finalize");

    let mut file = OpenOptions::new().write(true).open(&path).expect("reopen");
    // second byte of the packed mass
    file.seek(SeekFrom::Start(FileHeader::SIZE as u64 + 9))
        .expect("seek");
    file.write_all(&[0xFF]).expect("corrupt");
    drop(file);

    assert!(matches!(
        CheckpointReader::<ParticleRecord>::open(&path),
        Err(CheckpointError::CrcMismatch { .. })
    ));
}

#[test]
fn test_truncated_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("short.mpmckpt");

    let mut writer = CheckpointWriter::<ParticleRecord>::create(&path).expect("create");
    writer.write_record(&ParticleRecord::default()).expect("write");
    writer.write_record(&ParticleRecord::default()).expect("write");
    writer.finalize().expect("finalize");

    let file = OpenOptions::new().write(true).open(&path).expect("reopen");
    let len = file.metadata().expect("metadata").len();
    file.set_len(len - 10).expect("truncate");
    drop(file);

    assert!(matches!(
        CheckpointReader::<ParticleRecord>::open(&path),
        Err(CheckpointError::Truncated { .. })
    ));
}

#[test]
fn test_oversized_record_count_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("count.mpmckpt");

    let mut writer = CheckpointWriter::<ParticleRecord>::create(&path).expect("create");
    writer.write_record(&ParticleRecord::default()).expect("write");
    writer.finalize().expect("finalize");

    let mut file = OpenOptions::new().write(true).open(&path).expect("reopen");
    // record count sits after magic, version, packed size and signature
    file.seek(SeekFrom::Start(24)).expect("seek");
    file.write_all(&(u64::MAX / 2).to_le_bytes())
        .expect("overwrite count");
    drop(file);

    assert!(matches!(
        CheckpointReader::<ParticleRecord>::open(&path),
        Err(CheckpointError::CorruptHeader {
            record_count,
            ..
        }) if record_count == u64::MAX / 2
    ));
}
