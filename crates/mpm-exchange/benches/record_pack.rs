// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

#![allow(clippy::cast_precision_loss)] // Bench data conversions
#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting

//! Record packing throughput
//!
//! Measures the hot path of a particle migration:
//! - type-map driven pack / unpack of both record layouts
//! - encode + pack + unpack + reconstruct of a two-phase particle
//! - an in-process send / receive pair

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mpm_exchange::datatype::{register_particle_type, Datatype, DatatypeRegistry};
use mpm_exchange::exchange::{recv_record, send_record};
use mpm_exchange::material::{LinearElastic, Material, Newtonian};
use mpm_exchange::particle::{ParticleCodec, TwoPhaseParticle};
use mpm_exchange::record::{ParticleRecord, TwoPhaseParticleRecord};
use mpm_exchange::transport::LocalGroup;
use std::sync::Arc;

const BATCH: usize = 1000;

fn materials() -> Vec<Arc<dyn Material>> {
    vec![
        Arc::new(LinearElastic::new(1, 1000.0, 1.0e7, 0.3)),
        Arc::new(Newtonian::new(2, 1000.0, 2.0e9, 8.9e-4)),
    ]
}

fn particles(materials: &[Arc<dyn Material>]) -> Vec<TwoPhaseParticle> {
    (0..BATCH)
        .map(|i| {
            let x = i as f64;
            let mut particle = TwoPhaseParticle::new(i as u64, [x, x * 0.5, -x]);
            let solid = particle.solid_mut();
            solid.assign_material(Arc::clone(&materials[0]));
            solid.assign_mass(1.0 + x);
            solid.assign_volume(0.25);
            solid.assign_stress([x, -x, x, 0.1, 0.2, 0.3]);
            solid.assign_cell_id(Some(i as u64 / 8));
            particle.assign_liquid_material(Arc::clone(&materials[1]));
            particle.assign_liquid_mass(0.5);
            particle.assign_porosity(0.4);
            particle
        })
        .collect()
}

// ============================================================================
// Pack / unpack
// ============================================================================

fn bench_pack(c: &mut Criterion) {
    let registry = Arc::new(DatatypeRegistry::new());
    let single = Datatype::commit(&registry, &ParticleRecord::default());
    let twophase = Datatype::commit(&registry, &TwoPhaseParticleRecord::default());

    let materials = materials();
    let records: Vec<TwoPhaseParticleRecord> = particles(&materials)
        .iter()
        .map(|p| p.to_record().unwrap())
        .collect();
    let solids: Vec<ParticleRecord> = records.iter().map(|r| r.solid).collect();
    let mut buf = vec![0u8; twophase.packed_size()];

    let mut group = c.benchmark_group("pack");
    group.throughput(Throughput::Elements(BATCH as u64));

    group.bench_function("particle_x1000", |b| {
        b.iter(|| {
            for record in &solids {
                let written = single.pack_into(record, black_box(&mut buf)).unwrap();
                black_box(written);
            }
        })
    });

    group.bench_function("twophase_x1000", |b| {
        b.iter(|| {
            for record in &records {
                let written = twophase.pack_into(record, black_box(&mut buf)).unwrap();
                black_box(written);
            }
        })
    });
    group.finish();

    let packed: Vec<Vec<u8>> = records.iter().map(|r| twophase.pack(r).unwrap()).collect();
    let mut group = c.benchmark_group("unpack");
    group.throughput(Throughput::Elements(BATCH as u64));

    group.bench_function("twophase_x1000", |b| {
        let mut record = TwoPhaseParticleRecord::default();
        b.iter(|| {
            for bytes in &packed {
                twophase.unpack(black_box(bytes), &mut record).unwrap();
            }
            black_box(&record);
        })
    });
    group.finish();

    single.release();
    twophase.release();
}

// ============================================================================
// Full particle path
// ============================================================================

fn bench_particle_roundtrip(c: &mut Criterion) {
    let registry = Arc::new(DatatypeRegistry::new());
    let datatype = Datatype::commit(&registry, &TwoPhaseParticleRecord::default());
    let materials = materials();
    let particles = particles(&materials);

    let mut group = c.benchmark_group("particle");
    group.throughput(Throughput::Elements(BATCH as u64));

    group.bench_function("encode_pack_unpack_decode_x1000", |b| {
        let mut received = TwoPhaseParticleRecord::default();
        b.iter(|| {
            for particle in &particles {
                let bytes = datatype.pack(&particle.to_record().unwrap()).unwrap();
                datatype.unpack(&bytes, &mut received).unwrap();
                let rebuilt = TwoPhaseParticle::from_record(&received, &materials).unwrap();
                black_box(rebuilt);
            }
        })
    });
    group.finish();
    datatype.release();
}

fn bench_local_send_recv(c: &mut Criterion) {
    let rank = LocalGroup::new(1).remove(0);
    let datatype = register_particle_type(&rank, &TwoPhaseParticleRecord::default()).unwrap();
    let record = TwoPhaseParticleRecord::default();

    let mut group = c.benchmark_group("local");
    group.throughput(Throughput::Bytes(datatype.packed_size() as u64));

    group.bench_function("self_send_recv", |b| {
        let mut received = TwoPhaseParticleRecord::default();
        b.iter(|| {
            send_record(&rank, &datatype, 0, 0, black_box(&record)).unwrap();
            recv_record(&rank, &datatype, 0, 0, &mut received).unwrap();
        })
    });
    group.finish();
    datatype.release();
}

criterion_group!(pack_benches, bench_pack);
criterion_group!(particle_benches, bench_particle_roundtrip, bench_local_send_recv);
criterion_main!(pack_benches, particle_benches);
