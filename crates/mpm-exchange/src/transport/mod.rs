// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Point-to-point rank transports.
//!
//! A transport connects the ranks of a fixed-size group and moves opaque
//! payloads tagged with the signature of the datatype that packed them.
//!
//! - [`LocalGroup`] - every rank in one process, linked by channels
//! - [`tcp::TcpGroup`] - one process per rank, full mesh of TCP streams
//!
//! Both give per-pair FIFO ordering on a given tag and buffer sends eagerly,
//! so a rank may send to itself before posting the matching receive.

mod local;
pub mod tcp;

pub use local::{LocalGroup, LocalRank};
pub use tcp::{TcpGroup, TcpGroupConfig};

use crate::datatype::{DatatypeRegistry, ElementKind};
use crate::exchange::ExchangeError;
use std::collections::VecDeque;
use std::sync::Arc;

/// Index of a process in its group, `0..size`.
pub type Rank = usize;

/// Logical channel between a pair of ranks.
pub type Tag = u32;

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    /// Signature of the type map the payload was packed with.
    pub signature: u64,
    pub payload: Vec<u8>,
}

/// Blocking point-to-point messaging within a rank group.
pub trait Transport: Send + Sync {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    /// Whether the transport can carry elements of `kind`.
    fn supports(&self, _kind: ElementKind) -> bool {
        true
    }

    /// Datatypes committed on this transport.
    fn datatypes(&self) -> &Arc<DatatypeRegistry>;

    /// Queue `payload` for `dest`. Returns once the message is buffered.
    fn send_bytes(
        &self,
        dest: Rank,
        tag: Tag,
        signature: u64,
        payload: &[u8],
    ) -> Result<(), ExchangeError>;

    /// Block until a message from `source` on `tag` arrives.
    fn recv_bytes(&self, source: Rank, tag: Tag) -> Result<Envelope, ExchangeError>;

    /// Reject ranks outside the group.
    fn check_rank(&self, rank: Rank) -> Result<(), ExchangeError> {
        if rank < self.size() {
            Ok(())
        } else {
            Err(ExchangeError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }
}

/// Messages that arrived from one source ahead of a receive for their tag.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    held: VecDeque<Envelope>,
}

impl Pending {
    /// Oldest held message on `tag`, if any.
    pub(crate) fn take(&mut self, tag: Tag) -> Option<Envelope> {
        let pos = self.held.iter().position(|e| e.tag == tag)?;
        self.held.remove(pos)
    }

    pub(crate) fn hold(&mut self, envelope: Envelope) {
        log::trace!(
            "[TRANSPORT] holding message from rank {} tag {} ({} queued)",
            envelope.source,
            envelope.tag,
            self.held.len() + 1
        );
        self.held.push_back(envelope);
    }

    pub(crate) fn len(&self) -> usize {
        self.held.len()
    }
}
