// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! TCP transport for rank groups spread over processes or hosts.
//!
//! # Wire Format
//!
//! Every message is one length-prefixed frame whose body starts with a
//! fixed envelope header:
//!
//! ```text
//! +----------------+-----------+-----------------+-----------------+
//! | Length (4B BE) | Tag (4LE) | Signature (8LE) | Packed record   |
//! +----------------+-----------+-----------------+-----------------+
//! ```
//!
//! The source rank is implied by the connection. A connection opens with a
//! handshake frame `"MPMX" | version (1B) | rank (4LE) | size (4LE)` in each
//! direction.

mod config;
mod frame_codec;
mod group;

pub use config::TcpGroupConfig;
pub use frame_codec::{FrameCodec, FRAME_HEADER_SIZE};
pub use group::{bind_listener, TcpGroup};
