// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

use super::{optional, required, Material, MaterialError, MaterialId};
use serde_json::Value;

/// Isotropic linear elastic solid. Carries no history variables.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearElastic {
    id: MaterialId,
    density: f64,
    youngs_modulus: f64,
    poisson_ratio: f64,
    /// Only meaningful as the skeleton of a two-phase particle.
    porosity: Option<f64>,
    permeability: Option<[f64; 3]>,
}

impl LinearElastic {
    pub const KIND: &'static str = "LinearElastic3D";

    pub fn new(id: MaterialId, density: f64, youngs_modulus: f64, poisson_ratio: f64) -> Self {
        Self {
            id,
            density,
            youngs_modulus,
            poisson_ratio,
            porosity: None,
            permeability: None,
        }
    }

    pub fn from_json(id: MaterialId, properties: &Value) -> Result<Self, MaterialError> {
        let density = required(properties, Self::KIND, "density")?;
        let youngs_modulus = required(properties, Self::KIND, "youngs_modulus")?;
        let poisson_ratio = required(properties, Self::KIND, "poisson_ratio")?;

        if density <= 0. {
            return Err(invalid("density", density));
        }
        if youngs_modulus <= 0. {
            return Err(invalid("youngs_modulus", youngs_modulus));
        }
        if !(-1.0..0.5).contains(&poisson_ratio) {
            return Err(invalid("poisson_ratio", poisson_ratio));
        }

        let porosity = optional(properties, "porosity");
        if let Some(n) = porosity.filter(|n| !(0.0..=1.0).contains(n)) {
            return Err(invalid("porosity", n));
        }

        let permeability = match (
            optional(properties, "k_x"),
            optional(properties, "k_y"),
            optional(properties, "k_z"),
        ) {
            (Some(x), Some(y), Some(z)) => Some([x, y, z]),
            _ => None,
        };

        Ok(Self {
            id,
            density,
            youngs_modulus,
            poisson_ratio,
            porosity,
            permeability,
        })
    }

    pub fn permeability(&self) -> Option<[f64; 3]> {
        self.permeability
    }
}

fn invalid(name: &'static str, value: f64) -> MaterialError {
    MaterialError::InvalidProperty {
        kind: LinearElastic::KIND,
        name,
        value,
    }
}

impl Material for LinearElastic {
    fn id(&self) -> MaterialId {
        self.id
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn property(&self, name: &str) -> Option<f64> {
        match name {
            "density" => Some(self.density),
            "youngs_modulus" => Some(self.youngs_modulus),
            "poisson_ratio" => Some(self.poisson_ratio),
            "porosity" => self.porosity,
            "k_x" => self.permeability.map(|k| k[0]),
            "k_y" => self.permeability.map(|k| k[1]),
            "k_z" => self.permeability.map(|k| k[2]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_with_porous_properties() {
        let material = LinearElastic::from_json(
            1,
            &json!({
                "density": 1000.0,
                "youngs_modulus": 1.0e7,
                "poisson_ratio": 0.3,
                "porosity": 0.3,
                "k_x": 0.001,
                "k_y": 0.001,
                "k_z": 0.001
            }),
        )
        .expect("valid material");

        assert_eq!(material.id(), 1);
        assert!(material.state_variable_names().is_empty());
        assert_eq!(material.property("porosity"), Some(0.3));
        assert_eq!(material.permeability(), Some([0.001; 3]));
        assert_eq!(material.property("shear_modulus"), None);
    }

    #[test]
    fn test_rejects_incompressible_poisson_ratio() {
        let err = LinearElastic::from_json(
            1,
            &json!({"density": 1.0, "youngs_modulus": 1.0, "poisson_ratio": 0.5}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaterialError::InvalidProperty {
                name: "poisson_ratio",
                ..
            }
        ));
    }
}
