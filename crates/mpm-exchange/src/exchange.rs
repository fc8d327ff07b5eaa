// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Point-to-point transfer of a single particle record.
//!
//! Both ends commit a [`Datatype`] for the same record type on their own
//! transport. The sender packs the record and stamps the message with the
//! datatype signature; the receiver refuses messages whose signature differs
//! from its own before touching the destination record.

use crate::core::ser::SerError;
use crate::datatype::{Datatype, RecordLayout};
use crate::material::MaterialSource;
use crate::particle::ParticleCodec;
use crate::transport::{Rank, Tag, Transport};
use std::fmt;
use std::io;

/// Transfer failures. None of them is retried.
#[derive(Debug)]
pub enum ExchangeError {
    /// Rank outside `0..size`.
    InvalidRank { rank: Rank, size: usize },
    /// The sender packed with a structurally different record layout.
    SignatureMismatch { expected: u64, found: u64 },
    /// Payload length differs from the receiver's packed record size.
    Truncated { expected: usize, found: usize },
    Transport(io::Error),
    /// The peer closed its end of the link.
    Disconnected { peer: Rank },
    Ser(SerError),
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::InvalidRank { rank, size } => {
                write!(f, "rank {} outside group of {}", rank, size)
            }
            ExchangeError::SignatureMismatch { expected, found } => write!(
                f,
                "datatype signature mismatch: expected {:#018x}, found {:#018x}",
                expected, found
            ),
            ExchangeError::Truncated { expected, found } => write!(
                f,
                "record payload of {} bytes, expected {}",
                found, expected
            ),
            ExchangeError::Transport(e) => write!(f, "transport error: {}", e),
            ExchangeError::Disconnected { peer } => write!(f, "rank {} disconnected", peer),
            ExchangeError::Ser(e) => write!(f, "packing failed: {}", e),
        }
    }
}

impl std::error::Error for ExchangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExchangeError::Transport(e) => Some(e),
            ExchangeError::Ser(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExchangeError {
    fn from(e: io::Error) -> Self {
        ExchangeError::Transport(e)
    }
}

impl From<SerError> for ExchangeError {
    fn from(e: SerError) -> Self {
        ExchangeError::Ser(e)
    }
}

/// Pack `record` and send it to `dest`.
pub fn send_record<R, T>(
    transport: &T,
    datatype: &Datatype<R>,
    dest: Rank,
    tag: Tag,
    record: &R,
) -> Result<(), ExchangeError>
where
    R: RecordLayout,
    T: Transport + ?Sized,
{
    let payload = datatype.pack(record)?;
    transport.send_bytes(dest, tag, datatype.signature(), &payload)
}

/// Receive one record from `source` into `record`.
///
/// `record` is only written once the whole payload has been validated.
pub fn recv_record<R, T>(
    transport: &T,
    datatype: &Datatype<R>,
    source: Rank,
    tag: Tag,
    record: &mut R,
) -> Result<(), ExchangeError>
where
    R: RecordLayout,
    T: Transport + ?Sized,
{
    let envelope = transport.recv_bytes(source, tag)?;
    if envelope.signature != datatype.signature() {
        log::warn!(
            "[EXCHANGE] rank {} refused {} from rank {}: signature {:#018x} != {:#018x}",
            transport.rank(),
            R::TYPE_NAME,
            source,
            envelope.signature,
            datatype.signature()
        );
        return Err(ExchangeError::SignatureMismatch {
            expected: datatype.signature(),
            found: envelope.signature,
        });
    }
    if envelope.payload.len() != datatype.packed_size() {
        return Err(ExchangeError::Truncated {
            expected: datatype.packed_size(),
            found: envelope.payload.len(),
        });
    }
    datatype.unpack(&envelope.payload, record)?;
    Ok(())
}

/// Move `record` from `source` to `dest`.
///
/// The source rank sends, the destination rank receives into `record`, and
/// every other rank returns immediately. With `source == dest` the record is
/// sent to self and read back.
pub fn exchange_record<R, T>(
    transport: &T,
    datatype: &Datatype<R>,
    source: Rank,
    dest: Rank,
    tag: Tag,
    record: &mut R,
) -> Result<(), ExchangeError>
where
    R: RecordLayout,
    T: Transport + ?Sized,
{
    transport.check_rank(source)?;
    transport.check_rank(dest)?;
    let rank = transport.rank();
    if rank == source {
        send_record(transport, datatype, dest, tag, record)?;
    }
    if rank == dest {
        recv_record(transport, datatype, source, tag, record)?;
    }
    Ok(())
}

/// Encode `particle` and send its record to `dest`.
pub fn send_particle<P, T>(
    transport: &T,
    datatype: &Datatype<P::Record>,
    dest: Rank,
    tag: Tag,
    particle: &P,
) -> crate::Result<()>
where
    P: ParticleCodec,
    T: Transport + ?Sized,
{
    let record = particle.to_record()?;
    send_record(transport, datatype, dest, tag, &record)?;
    Ok(())
}

/// Receive a record from `source` and rebuild a particle from it.
pub fn recv_particle<P, T, S>(
    transport: &T,
    datatype: &Datatype<P::Record>,
    source: Rank,
    tag: Tag,
    materials: &S,
) -> crate::Result<P>
where
    P: ParticleCodec,
    T: Transport + ?Sized,
    S: MaterialSource + ?Sized,
{
    let mut record = P::Record::default();
    recv_record(transport, datatype, source, tag, &mut record)?;
    Ok(P::from_record(&record, materials)?)
}

/// Move a particle from `source` to `dest`.
///
/// On the destination rank `particle` is re-initialised from the received
/// record; if reconstruction fails it is left as it was.
pub fn exchange_particle<P, T, S>(
    transport: &T,
    datatype: &Datatype<P::Record>,
    source: Rank,
    dest: Rank,
    tag: Tag,
    particle: &mut P,
    materials: &S,
) -> crate::Result<()>
where
    P: ParticleCodec,
    T: Transport + ?Sized,
    S: MaterialSource + ?Sized,
{
    transport.check_rank(source)?;
    transport.check_rank(dest)?;
    let rank = transport.rank();
    if rank == source {
        send_particle(transport, datatype, dest, tag, particle)?;
    }
    if rank == dest {
        let mut record = P::Record::default();
        recv_record(transport, datatype, source, tag, &mut record)?;
        particle.initialise_from_record(&record, materials)?;
    }
    Ok(())
}
