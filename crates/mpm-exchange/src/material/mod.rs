// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Material bindings.
//!
//! Particles never serialize material behaviour: a record only carries the
//! material id, and reconstruction joins that id against a caller-supplied
//! [`MaterialSource`]. The models here carry just enough to be bound to a
//! particle (id, properties, state-variable names); constitutive updates live
//! with the solver.

mod linear_elastic;
mod newtonian;
mod registry;

pub use linear_elastic::LinearElastic;
pub use newtonian::Newtonian;
pub use registry::{resolve_material, MaterialRegistry, MaterialSource};

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Stable numeric identity of a material within a run.
pub type MaterialId = u32;

/// Behaviour a particle needs from its bound material.
pub trait Material: Send + Sync + fmt::Debug {
    fn id(&self) -> MaterialId;

    /// Factory name the material was created under, e.g. `"LinearElastic3D"`.
    fn kind(&self) -> &'static str;

    /// Names of the per-particle history variables, in storage order.
    fn state_variable_names(&self) -> &[&'static str] {
        &[]
    }

    /// Values a freshly bound particle starts with.
    fn initial_state_variables(&self) -> Vec<f64> {
        vec![0.; self.state_variable_names().len()]
    }

    fn property(&self, name: &str) -> Option<f64>;
}

/// Material construction and registration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialError {
    UnknownKind(String),
    MissingProperty {
        kind: &'static str,
        name: &'static str,
    },
    InvalidProperty {
        kind: &'static str,
        name: &'static str,
        value: f64,
    },
    DuplicateId(MaterialId),
}

impl fmt::Display for MaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialError::UnknownKind(kind) => write!(f, "Unknown material kind: {}", kind),
            MaterialError::MissingProperty { kind, name } => {
                write!(f, "{} requires property '{}'", kind, name)
            }
            MaterialError::InvalidProperty { kind, name, value } => {
                write!(f, "{}: invalid value {} for '{}'", kind, value, name)
            }
            MaterialError::DuplicateId(id) => write!(f, "Material id {} registered twice", id),
        }
    }
}

impl std::error::Error for MaterialError {}

/// Create a material from its factory name and JSON properties.
///
/// ```
/// use mpm_exchange::material::create_material;
/// use serde_json::json;
///
/// let water = create_material(
///     "Newtonian3D",
///     2,
///     &json!({"density": 1000.0, "bulk_modulus": 2.0e9, "dynamic_viscosity": 8.9e-4}),
/// )
/// .unwrap();
/// assert_eq!(water.id(), 2);
/// assert_eq!(water.state_variable_names(), &["pressure"]);
/// ```
pub fn create_material(
    kind: &str,
    id: MaterialId,
    properties: &Value,
) -> Result<Arc<dyn Material>, MaterialError> {
    match kind {
        LinearElastic::KIND => Ok(Arc::new(LinearElastic::from_json(id, properties)?)),
        Newtonian::KIND => Ok(Arc::new(Newtonian::from_json(id, properties)?)),
        other => Err(MaterialError::UnknownKind(other.to_string())),
    }
}

pub(crate) fn required(
    properties: &Value,
    kind: &'static str,
    name: &'static str,
) -> Result<f64, MaterialError> {
    properties
        .get(name)
        .and_then(Value::as_f64)
        .ok_or(MaterialError::MissingProperty { kind, name })
}

pub(crate) fn optional(properties: &Value, name: &str) -> Option<f64> {
    properties.get(name).and_then(Value::as_f64)
}
