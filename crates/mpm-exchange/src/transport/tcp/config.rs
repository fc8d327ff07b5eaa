// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! TCP rank group configuration.
//!
//! # Example
//!
//! ```
//! use mpm_exchange::transport::TcpGroupConfig;
//! use std::time::Duration;
//!
//! let config = TcpGroupConfig::new(1, vec!["127.0.0.1:7400".parse().unwrap(),
//!                                          "127.0.0.1:7401".parse().unwrap()])
//!     .with_connect_timeout(Duration::from_secs(2))
//!     .with_nodelay(true);
//! assert_eq!(config.size(), 2);
//! ```

use crate::config::{
    DEFAULT_CONNECT_ATTEMPTS, DEFAULT_CONNECT_RETRY_DELAY, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_MAX_FRAME_SIZE, ENV_PEERS, ENV_RANK,
};
use crate::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;

/// Addressing and socket policy for one rank of a [`super::TcpGroup`].
#[derive(Clone, Debug)]
pub struct TcpGroupConfig {
    /// This process's rank.
    pub rank: usize,

    /// Listen address of every rank, indexed by rank. The group size is
    /// `peers.len()`.
    pub peers: Vec<SocketAddr>,

    /// Timeout of a single outbound connect attempt.
    pub connect_timeout: Duration,

    /// Pause between failed connect attempts.
    pub connect_retry_delay: Duration,

    /// Connect attempts per peer before giving up (at least one is made).
    pub connect_attempts: u32,

    /// Disable Nagle's algorithm. Record transfers are small and latency bound.
    pub nodelay: bool,

    /// Largest accepted frame body, in bytes.
    pub max_frame_size: usize,

    /// Pending connection queue of the listener.
    pub listen_backlog: i32,
}

impl TcpGroupConfig {
    pub fn new(rank: usize, peers: Vec<SocketAddr>) -> Self {
        Self {
            rank,
            peers,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connect_retry_delay: DEFAULT_CONNECT_RETRY_DELAY,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            nodelay: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            listen_backlog: 128,
        }
    }

    /// Read `MPM_RANK` and `MPM_PEERS` (comma-separated `host:port` list).
    pub fn from_env() -> Result<Self> {
        let rank = std::env::var(ENV_RANK)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_RANK)))?;
        let peers = std::env::var(ENV_PEERS)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_PEERS)))?;
        Self::parse(&rank, &peers)
    }

    /// Build a config from the textual rank and peer list.
    pub fn parse(rank: &str, peers: &str) -> Result<Self> {
        let rank: usize = rank
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid rank '{}'", rank)))?;
        let peers = peers
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<SocketAddr>()
                    .map_err(|_| Error::Config(format!("invalid peer address '{}'", p)))
            })
            .collect::<Result<Vec<_>>>()?;

        let config = Self::new(rank, peers);
        config.validate()?;
        Ok(config)
    }

    pub fn size(&self) -> usize {
        self.peers.len()
    }

    /// Address this rank listens on.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.peers.get(self.rank).copied()
    }

    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            return Err(Error::Config("peer list is empty".into()));
        }
        if self.rank >= self.peers.len() {
            return Err(Error::Config(format!(
                "rank {} outside group of {}",
                self.rank,
                self.peers.len()
            )));
        }
        if self.max_frame_size == 0 {
            return Err(Error::Config("max_frame_size must be positive".into()));
        }
        Ok(())
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_connect_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts;
        self.connect_retry_delay = delay;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer_list() {
        let config = TcpGroupConfig::parse(" 1 ", "127.0.0.1:7400, 127.0.0.1:7401,").unwrap();
        assert_eq!(config.rank, 1);
        assert_eq!(config.size(), 2);
        assert_eq!(config.listen_addr(), Some("127.0.0.1:7401".parse().unwrap()));
        assert_eq!(config.connect_attempts, DEFAULT_CONNECT_ATTEMPTS);
        assert!(config.nodelay);
    }

    #[test]
    fn test_parse_rejects_rank_outside_group() {
        let err = TcpGroupConfig::parse("2", "127.0.0.1:7400,127.0.0.1:7401").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("outside group")));
    }

    #[test]
    fn test_parse_rejects_bad_address() {
        assert!(TcpGroupConfig::parse("0", "localhost").is_err());
        assert!(TcpGroupConfig::parse("x", "127.0.0.1:1").is_err());
        assert!(TcpGroupConfig::parse("0", "").is_err());
    }
}
