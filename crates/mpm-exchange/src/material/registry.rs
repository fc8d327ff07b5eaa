// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Lookup of live material objects by id.

use super::{Material, MaterialError, MaterialId};
use crate::particle::{ParticlePhase, ReconstructError};
use std::collections::HashMap;
use std::sync::Arc;

/// Anything reconstruction can resolve material ids against.
///
/// Lookups are read-only. Mutating a source while other threads resolve
/// against it must be synchronised by the owner.
pub trait MaterialSource {
    fn material(&self, id: MaterialId) -> Option<&Arc<dyn Material>>;
}

/// Linear scan; with duplicate ids the first match wins.
impl MaterialSource for [Arc<dyn Material>] {
    fn material(&self, id: MaterialId) -> Option<&Arc<dyn Material>> {
        self.iter().find(|m| m.id() == id)
    }
}

impl MaterialSource for Vec<Arc<dyn Material>> {
    fn material(&self, id: MaterialId) -> Option<&Arc<dyn Material>> {
        self.as_slice().material(id)
    }
}

/// Id-keyed material table enforcing unique ids.
#[derive(Debug, Default, Clone)]
pub struct MaterialRegistry {
    materials: HashMap<MaterialId, Arc<dyn Material>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material. Fails if its id is already taken.
    pub fn insert(&mut self, material: Arc<dyn Material>) -> Result<(), MaterialError> {
        let id = material.id();
        if self.materials.contains_key(&id) {
            return Err(MaterialError::DuplicateId(id));
        }
        self.materials.insert(id, material);
        Ok(())
    }

    pub fn get(&self, id: MaterialId) -> Option<&Arc<dyn Material>> {
        self.materials.get(&id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<MaterialId> {
        let mut ids: Vec<_> = self.materials.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl MaterialSource for MaterialRegistry {
    fn material(&self, id: MaterialId) -> Option<&Arc<dyn Material>> {
        self.get(id)
    }
}

impl TryFrom<Vec<Arc<dyn Material>>> for MaterialRegistry {
    type Error = MaterialError;

    fn try_from(materials: Vec<Arc<dyn Material>>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for material in materials {
            registry.insert(material)?;
        }
        Ok(registry)
    }
}

/// Resolve the material bound to `phase` by exact id match.
pub fn resolve_material<S: MaterialSource + ?Sized>(
    source: &S,
    phase: ParticlePhase,
    id: MaterialId,
) -> Result<Arc<dyn Material>, ReconstructError> {
    source
        .material(id)
        .cloned()
        .ok_or(ReconstructError::MaterialNotFound { phase, id })
}
