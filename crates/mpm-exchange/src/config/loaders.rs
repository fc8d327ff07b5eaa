// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! YAML run file loader.
//!
//! A run file names the rank group and the materials every rank registers.
//!
//! # Example YAML
//!
//! ```yaml
//! # run.yaml
//! group:
//!   peers: ["127.0.0.1:7400", "127.0.0.1:7401"]
//!   connect_timeout_ms: 2000
//!
//! materials:
//!   - id: 1
//!     type: LinearElastic3D
//!     density: 1000.0
//!     youngs_modulus: 1.0e7
//!     poisson_ratio: 0.3
//!     porosity: 0.3
//!   - id: 2
//!     type: Newtonian3D
//!     density: 1000.0
//!     bulk_modulus: 2.0e9
//!     dynamic_viscosity: 8.9e-4
//! ```

use crate::material::{create_material, MaterialId, MaterialRegistry};
use crate::transport::TcpGroupConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// YAML run file loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize)]
pub struct RunDocument {
    #[serde(default)]
    pub group: Option<YamlGroup>,

    #[serde(default)]
    pub materials: Vec<YamlMaterial>,
}

/// Rank group section.
#[derive(Debug, Deserialize)]
pub struct YamlGroup {
    /// Listen address per rank, indexed by rank.
    pub peers: Vec<SocketAddr>,
    /// Rank of this process; usually supplied on the command line instead.
    #[serde(default)]
    pub rank: Option<usize>,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default)]
    pub connect_attempts: Option<u32>,
    #[serde(default)]
    pub nodelay: Option<bool>,
    #[serde(default)]
    pub max_frame_size: Option<usize>,
}

/// One material entry: id, factory name, and its properties inline.
#[derive(Debug, Deserialize)]
pub struct YamlMaterial {
    pub id: MaterialId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl YamlLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<RunDocument> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigFileNotFound(path.display().to_string()),
            _ => Error::IoError(e),
        })?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(yaml_content: &str) -> Result<RunDocument> {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }
}

impl RunDocument {
    /// Create every listed material and register it by id.
    pub fn material_registry(&self) -> Result<MaterialRegistry> {
        let mut registry = MaterialRegistry::new();
        for entry in &self.materials {
            let properties = serde_json::Value::Object(entry.properties.clone());
            let material = create_material(&entry.kind, entry.id, &properties)?;
            registry.insert(material)?;
            log::debug!("[CONFIG] material {} ({}) registered", entry.id, entry.kind);
        }
        Ok(registry)
    }

    /// TCP settings for `rank`, falling back to the rank named in the file.
    pub fn tcp_config(&self, rank: Option<usize>) -> Result<TcpGroupConfig> {
        let group = self
            .group
            .as_ref()
            .ok_or_else(|| Error::Config("run file has no 'group' section".into()))?;
        let rank = rank
            .or(group.rank)
            .ok_or_else(|| Error::Config("rank not given".into()))?;

        let mut config = TcpGroupConfig::new(rank, group.peers.clone());
        if let Some(ms) = group.connect_timeout_ms {
            config = config.with_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(attempts) = group.connect_attempts {
            config.connect_attempts = attempts;
        }
        if let Some(nodelay) = group.nodelay {
            config = config.with_nodelay(nodelay);
        }
        if let Some(size) = group.max_frame_size {
            config = config.with_max_frame_size(size);
        }
        config.validate()?;
        Ok(config)
    }
}
