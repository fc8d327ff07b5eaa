// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! mpm-exchange-probe - particle migration probe
//!
//! Passes two-phase particles around a ring of ranks and checks that every
//! particle arrives intact. Runs either as threads of one process or as one
//! process per rank over TCP.

use clap::{Parser, Subcommand};
use colored::*;
use mpm_exchange::config::loaders::YamlLoader;
use mpm_exchange::config::{ENV_PEERS, ENV_RANK};
use mpm_exchange::datatype::{register_particle_type, RecordLayout};
use mpm_exchange::exchange::{recv_particle, send_particle};
use mpm_exchange::material::{LinearElastic, MaterialRegistry, Newtonian};
use mpm_exchange::record::{ParticleRecord, TwoPhaseParticleRecord};
use mpm_exchange::transport::{LocalGroup, TcpGroup, TcpGroupConfig, Transport};
use mpm_exchange::TwoPhaseParticle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const RING_TAG: u32 = 7;

/// Particle migration probe
#[derive(Parser, Debug)]
#[command(name = "mpm-exchange-probe")]
#[command(version)]
#[command(about = "Exchange particles around a ring of ranks")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Particles passed around the ring per rank
    #[arg(short = 'n', long, default_value = "1000", global = true)]
    rounds: u64,

    /// Run file with the material list (and group section for tcp)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Only print the summary line
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// All ranks as threads of this process
    Local {
        /// Number of ranks
        #[arg(short, long, default_value = "4")]
        ranks: usize,
    },
    /// This process is one rank of a TCP group
    Tcp {
        /// Rank of this process (falls back to the run file, then MPM_RANK)
        #[arg(short, long)]
        rank: Option<usize>,
    },
    /// Print the record layouts and their signatures
    Layout,
}

#[derive(Debug, Default)]
struct RingStats {
    rank: usize,
    received: u64,
    mismatches: u64,
    elapsed: Duration,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    match &args.mode {
        Mode::Local { ranks } => run_local(args, *ranks),
        Mode::Tcp { rank } => run_tcp(args, *rank),
        Mode::Layout => {
            print_layout(&ParticleRecord::default());
            print_layout(&TwoPhaseParticleRecord::default());
            Ok(())
        }
    }
}

fn load_materials(path: Option<&Path>) -> Result<MaterialRegistry, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(YamlLoader::load_from_file(path)?.material_registry()?),
        None => {
            let mut registry = MaterialRegistry::new();
            registry.insert(Arc::new(LinearElastic::new(1, 1000.0, 1.0e7, 0.3)))?;
            registry.insert(Arc::new(Newtonian::new(2, 1000.0, 2.0e9, 8.9e-4)))?;
            Ok(registry)
        }
    }
}

fn run_local(args: &Args, ranks: usize) -> Result<(), Box<dyn std::error::Error>> {
    if ranks == 0 {
        return Err("at least one rank is required".into());
    }
    let materials = Arc::new(load_materials(args.config.as_deref())?);
    if !args.quiet {
        eprintln!("{} Ring probe (local mode)", ">>>".green().bold());
        eprintln!("    ranks={}, rounds={}", ranks, args.rounds);
    }

    let rounds = args.rounds;
    let handles: Vec<_> = LocalGroup::new(ranks)
        .into_iter()
        .map(|rank| {
            let materials = Arc::clone(&materials);
            thread::spawn(move || ring(&rank, &*materials, rounds))
        })
        .collect();

    let mut all = Vec::with_capacity(ranks);
    for handle in handles {
        let stats = handle
            .join()
            .map_err(|_| "rank thread panicked".to_string())??;
        all.push(stats);
    }
    report(&all, args.quiet)
}

fn run_tcp(args: &Args, rank: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, materials) = match args.config.as_deref() {
        Some(path) => {
            let doc = YamlLoader::load_from_file(path)?;
            let file_rank = doc.group.as_ref().and_then(|g| g.rank);
            let env_rank = std::env::var(ENV_RANK).ok();
            let rank = resolve_rank(rank, file_rank, env_rank.as_deref())?;
            (doc.tcp_config(rank)?, doc.material_registry()?)
        }
        None => {
            let config = match rank {
                Some(rank) => {
                    let peers = std::env::var(ENV_PEERS)
                        .map_err(|_| format!("{} is not set", ENV_PEERS))?;
                    TcpGroupConfig::parse(&rank.to_string(), &peers)?
                }
                None => TcpGroupConfig::from_env()?,
            };
            (config, load_materials(None)?)
        }
    };

    if !args.quiet {
        eprintln!("{} Ring probe (tcp mode)", ">>>".green().bold());
        eprintln!(
            "    rank={} of {}, rounds={}",
            config.rank,
            config.size(),
            args.rounds
        );
        eprintln!("{}", "    Connecting to peers...".dimmed());
    }

    let group = TcpGroup::connect(config)?;
    let stats = ring(&group, &materials, args.rounds)?;
    report(&[stats], args.quiet)
}

/// Rank from the command line, else the run file, else `MPM_RANK`.
fn resolve_rank(
    cli: Option<usize>,
    file: Option<usize>,
    env: Option<&str>,
) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    if let Some(rank) = cli.or(file) {
        return Ok(Some(rank));
    }
    match env {
        Some(value) => {
            let rank = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid {} '{}'", ENV_RANK, value))?;
            Ok(Some(rank))
        }
        None => Ok(None),
    }
}

/// Pass `rounds` particles from every rank to its successor.
fn ring<T: Transport>(
    transport: &T,
    materials: &MaterialRegistry,
    rounds: u64,
) -> mpm_exchange::Result<RingStats> {
    let me = transport.rank();
    let size = transport.size();
    let next = (me + 1) % size;
    let prev = (me + size - 1) % size;
    let datatype = register_particle_type(transport, &TwoPhaseParticleRecord::default())?;

    let mut stats = RingStats {
        rank: me,
        ..RingStats::default()
    };
    let start = Instant::now();
    for round in 0..rounds {
        let outgoing = probe_particle(me, size, round, materials);
        send_particle(transport, &datatype, next, RING_TAG, &outgoing)?;

        let incoming: TwoPhaseParticle =
            recv_particle(transport, &datatype, prev, RING_TAG, materials)?;
        let expected = probe_particle(prev, size, round, materials);
        stats.received += 1;
        if !same_state(&incoming, &expected) {
            stats.mismatches += 1;
            log::warn!(
                "[EXCHANGE] rank {} round {}: particle {} differs from what rank {} sent",
                me,
                round,
                incoming.solid().id(),
                prev
            );
        }
    }
    stats.elapsed = start.elapsed();
    datatype.release();
    Ok(stats)
}

fn probe_particle(
    rank: usize,
    size: usize,
    round: u64,
    materials: &MaterialRegistry,
) -> TwoPhaseParticle {
    let id = round * size as u64 + rank as u64;
    let x = id as f64;
    let mut particle = TwoPhaseParticle::new(id, [x, -x, 0.5 * x]);
    let ids = materials.ids();
    {
        let solid = particle.solid_mut();
        if let Some(material) = ids.first().and_then(|id| materials.get(*id)) {
            solid.assign_material(Arc::clone(material));
        }
        solid.assign_mass(1.0 + x);
        solid.assign_volume(0.125);
        solid.assign_velocity([x.sin(), x.cos(), 0.0]);
        solid.assign_stress([x, 2.0 * x, 3.0 * x, 0.0, 0.0, -x]);
        solid.assign_cell_id(Some(id % 64));
    }
    if let Some(material) = ids.get(1).and_then(|id| materials.get(*id)) {
        particle.assign_liquid_material(Arc::clone(material));
    }
    particle.assign_liquid_mass(0.25 * x);
    particle.assign_porosity((id % 10) as f64 / 10.0);
    particle
}

fn same_state(a: &TwoPhaseParticle, b: &TwoPhaseParticle) -> bool {
    use mpm_exchange::ParticleCodec;
    match (a.to_record(), b.to_record()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn report(all: &[RingStats], quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = false;
    for stats in all {
        let rate = if stats.elapsed.as_secs_f64() > 0.0 {
            stats.received as f64 / stats.elapsed.as_secs_f64()
        } else {
            0.0
        };
        let status = if stats.mismatches == 0 {
            "ok".green().bold()
        } else {
            failed = true;
            "MISMATCH".red().bold()
        };
        if !quiet {
            println!(
                "rank {:>3}: {:>8} received, {:>4} mismatched, {:>10.0} particles/s  {}",
                stats.rank, stats.received, stats.mismatches, rate, status
            );
        }
    }

    let total: u64 = all.iter().map(|s| s.received).sum();
    println!(
        "{} {} particles exchanged across {} rank(s)",
        "===".cyan().bold(),
        total,
        all.len()
    );
    if failed {
        return Err("particles changed in transit".into());
    }
    Ok(())
}

fn print_layout<R: RecordLayout>(record: &R) {
    let map = record.type_map();
    println!(
        "{} {}: {} bytes in memory, {} packed, signature {:#018x}",
        ">>>".green().bold(),
        R::TYPE_NAME.bold(),
        std::mem::size_of::<R>(),
        map.packed_size(),
        map.signature()
    );
    for block in map.blocks() {
        println!(
            "    {:>5} .. {:<5} {:>3} x {}",
            block.offset,
            block.end(),
            block.count,
            block.kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_precedence() {
        assert_eq!(resolve_rank(Some(1), Some(2), Some("3")).unwrap(), Some(1));
        assert_eq!(resolve_rank(None, Some(2), Some("3")).unwrap(), Some(2));
        assert_eq!(resolve_rank(None, None, Some(" 3 ")).unwrap(), Some(3));
        assert_eq!(resolve_rank(None, None, None).unwrap(), None);
    }

    #[test]
    fn test_bad_env_rank() {
        assert!(resolve_rank(None, None, Some("three")).is_err());
        assert!(resolve_rank(Some(0), None, Some("three")).is_ok());
    }
}
