// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Per-transport bookkeeping of committed datatypes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle id of a committed datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatatypeId(pub u64);

#[derive(Debug, Clone)]
struct Entry {
    type_name: &'static str,
    signature: u64,
}

/// Tracks datatypes committed against one transport endpoint.
///
/// Each rank owns its registry; nothing is shared between ranks, which is
/// what lets every process build its descriptors independently.
#[derive(Debug, Default)]
pub struct DatatypeRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<DatatypeId, Entry>>,
}

impl DatatypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn commit(&self, type_name: &'static str, signature: u64) -> DatatypeId {
        let id = DatatypeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.live.lock().insert(
            id,
            Entry {
                type_name,
                signature,
            },
        );
        log::debug!(
            "[DATATYPE] commit id={} type={} signature={:#018x}",
            id.0,
            type_name,
            signature
        );
        id
    }

    /// Returns `false` if the id was not live.
    pub(crate) fn free(&self, id: DatatypeId) -> bool {
        match self.live.lock().remove(&id) {
            Some(entry) => {
                log::debug!("[DATATYPE] free id={} type={}", id.0, entry.type_name);
                true
            }
            None => false,
        }
    }

    /// Number of committed datatypes not yet released.
    pub fn live(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, id: DatatypeId) -> bool {
        self.live.lock().contains_key(&id)
    }

    pub fn signature_of(&self, id: DatatypeId) -> Option<u64> {
        self.live.lock().get(&id).map(|e| e.signature)
    }
}
