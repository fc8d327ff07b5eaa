// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

use super::{required, Material, MaterialError, MaterialId};
use serde_json::Value;

const STATE_VARIABLES: [&str; 1] = ["pressure"];

/// Weakly compressible Newtonian fluid, tracking pore pressure per particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Newtonian {
    id: MaterialId,
    density: f64,
    bulk_modulus: f64,
    dynamic_viscosity: f64,
}

impl Newtonian {
    pub const KIND: &'static str = "Newtonian3D";

    pub fn new(id: MaterialId, density: f64, bulk_modulus: f64, dynamic_viscosity: f64) -> Self {
        Self {
            id,
            density,
            bulk_modulus,
            dynamic_viscosity,
        }
    }

    pub fn from_json(id: MaterialId, properties: &Value) -> Result<Self, MaterialError> {
        let density = required(properties, Self::KIND, "density")?;
        let bulk_modulus = required(properties, Self::KIND, "bulk_modulus")?;
        let dynamic_viscosity = required(properties, Self::KIND, "dynamic_viscosity")?;

        for (name, value) in [
            ("density", density),
            ("bulk_modulus", bulk_modulus),
            ("dynamic_viscosity", dynamic_viscosity),
        ] {
            if value < 0. || !value.is_finite() {
                return Err(MaterialError::InvalidProperty {
                    kind: Self::KIND,
                    name,
                    value,
                });
            }
        }

        Ok(Self::new(id, density, bulk_modulus, dynamic_viscosity))
    }
}

impl Material for Newtonian {
    fn id(&self) -> MaterialId {
        self.id
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn state_variable_names(&self) -> &[&'static str] {
        &STATE_VARIABLES
    }

    fn property(&self, name: &str) -> Option<f64> {
        match name {
            "density" => Some(self.density),
            "bulk_modulus" => Some(self.bulk_modulus),
            "dynamic_viscosity" => Some(self.dynamic_viscosity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_state_variable_starts_at_zero() {
        let water = Newtonian::new(2, 1000., 2.0e9, 8.9e-4);
        assert_eq!(water.state_variable_names(), &["pressure"]);
        assert_eq!(water.initial_state_variables(), vec![0.]);
        assert_eq!(water.property("bulk_modulus"), Some(2.0e9));
    }
}
