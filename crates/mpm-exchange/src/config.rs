// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Layout and transport constants shared by every rank.
//!
//! The record capacities below are part of the wire/file contract: both ends
//! of a transfer, and every checkpoint reader, must be built with the same
//! values. **Never hardcode them elsewhere.**

#[cfg(feature = "config-loaders")]
pub mod loaders;

use std::time::Duration;

// =======================================================================
// Record layout
// =======================================================================

/// Spatial dimension carried by particle records.
///
/// Vectors are stored as three components; tensors as six Voigt components.
pub const DIM: usize = 3;

/// Number of Voigt components of a symmetric 3x3 tensor (xx, yy, zz, xy, yz, xz).
pub const VOIGT: usize = 6;

/// Capacity of the solid state-variable array in a record.
pub const MAX_STATE_VARS: usize = 20;

/// Capacity of the liquid state-variable array in a two-phase record.
pub const MAX_LIQUID_STATE_VARS: usize = 5;

/// Cell id written for a particle that has not been located in the mesh.
pub const UNASSIGNED_CELL: u64 = u64::MAX;

// =======================================================================
// Transport
// =======================================================================

/// Tag used when the caller does not care about logical channels.
pub const DEFAULT_TAG: u32 = 0;

/// Largest frame accepted by the TCP rank group (anti-OOM protection).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Outbound connection timeout inside a TCP rank group.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between connection attempts while peers are still starting.
pub const DEFAULT_CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Attempts before a rank gives up on a peer.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 50;

/// Environment variable holding this process's rank.
pub const ENV_RANK: &str = "MPM_RANK";

/// Environment variable holding the comma-separated rank address list.
pub const ENV_PEERS: &str = "MPM_PEERS";
