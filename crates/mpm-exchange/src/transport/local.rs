// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! In-process rank group.
//!
//! Each ordered pair of ranks gets its own unbounded channel, which gives
//! per-pair FIFO for free and lets a receive notice when the peer is gone.

use super::{Envelope, Pending, Rank, Tag, Transport};
use crate::datatype::DatatypeRegistry;
use crate::exchange::ExchangeError;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Factory for a group of [`LocalRank`]s.
pub struct LocalGroup;

impl LocalGroup {
    /// Create `size` connected ranks, indexed by rank.
    ///
    /// Move each handle to the thread that plays that rank.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Vec<LocalRank> {
        // links[src][dst]
        let mut senders: Vec<Vec<Sender<Envelope>>> = vec![Vec::with_capacity(size); size];
        let mut receivers: Vec<Vec<Receiver<Envelope>>> = vec![Vec::with_capacity(size); size];
        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = unbounded();
                senders[src].push(tx);
                receivers[dst].push(rx);
                debug_assert_eq!(receivers[dst].len(), src + 1);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalRank {
                rank,
                size,
                outbox,
                inbox,
                pending: (0..size).map(|_| Mutex::new(Pending::default())).collect(),
                datatypes: Arc::new(DatatypeRegistry::new()),
            })
            .collect()
    }
}

/// One rank of a [`LocalGroup`].
pub struct LocalRank {
    rank: Rank,
    size: usize,
    /// Indexed by destination.
    outbox: Vec<Sender<Envelope>>,
    /// Indexed by source.
    inbox: Vec<Receiver<Envelope>>,
    pending: Vec<Mutex<Pending>>,
    datatypes: Arc<DatatypeRegistry>,
}

impl Transport for LocalRank {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn datatypes(&self) -> &Arc<DatatypeRegistry> {
        &self.datatypes
    }

    fn send_bytes(
        &self,
        dest: Rank,
        tag: Tag,
        signature: u64,
        payload: &[u8],
    ) -> Result<(), ExchangeError> {
        self.check_rank(dest)?;
        let envelope = Envelope {
            source: self.rank,
            tag,
            signature,
            payload: payload.to_vec(),
        };
        self.outbox[dest]
            .send(envelope)
            .map_err(|_| ExchangeError::Disconnected { peer: dest })?;
        log::debug!(
            "[LOCAL] rank {} -> {} tag {} ({} bytes)",
            self.rank,
            dest,
            tag,
            payload.len()
        );
        Ok(())
    }

    fn recv_bytes(&self, source: Rank, tag: Tag) -> Result<Envelope, ExchangeError> {
        self.check_rank(source)?;
        // Held across the blocking wait so concurrent receivers on the same
        // source cannot steal each other's messages.
        let mut pending = self.pending[source].lock();
        if let Some(envelope) = pending.take(tag) {
            return Ok(envelope);
        }
        loop {
            let envelope = self.inbox[source]
                .recv()
                .map_err(|_| ExchangeError::Disconnected { peer: source })?;
            if envelope.tag == tag {
                log::debug!(
                    "[LOCAL] rank {} <- {} tag {} ({} bytes)",
                    self.rank,
                    source,
                    tag,
                    envelope.payload.len()
                );
                return Ok(envelope);
            }
            pending.hold(envelope);
        }
    }
}

impl std::fmt::Debug for LocalRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRank")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}
