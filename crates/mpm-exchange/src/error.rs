// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Crate-level error type.

use crate::core::ser::SerError;
use crate::datatype::DatatypeError;
use crate::exchange::ExchangeError;
use crate::material::MaterialError;
use crate::particle::{EncodeError, ReconstructError};

/// Result type for mpm-exchange operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure surfaced by this crate.
///
/// Each component keeps its own error enum; this wraps them for callers
/// that drive several components at once.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid or incomplete configuration.
    Config(String),
    /// Configuration file not found at specified path.
    ConfigFileNotFound(String),

    // ========================================================================
    // Component Errors
    // ========================================================================
    Material(MaterialError),
    Datatype(DatatypeError),
    Encode(EncodeError),
    Reconstruct(ReconstructError),
    Exchange(ExchangeError),
    /// Packing or unpacking failed.
    Serialization(SerError),

    // ========================================================================
    // I/O
    // ========================================================================
    IoError(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            Error::Material(e) => write!(f, "Material error: {}", e),
            Error::Datatype(e) => write!(f, "Datatype error: {}", e),
            Error::Encode(e) => write!(f, "Encode error: {}", e),
            Error::Reconstruct(e) => write!(f, "Reconstruction failed: {}", e),
            Error::Exchange(e) => write!(f, "Exchange failed: {}", e),
            Error::Serialization(e) => write!(f, "Serialization error: {}", e),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Material(e) => Some(e),
            Error::Datatype(e) => Some(e),
            Error::Encode(e) => Some(e),
            Error::Reconstruct(e) => Some(e),
            Error::Exchange(e) => Some(e),
            Error::Serialization(e) => Some(e),
            Error::IoError(e) => Some(e),
            Error::Config(_) | Error::ConfigFileNotFound(_) => None,
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(e: $source) -> Self {
                    Error::$variant(e)
                }
            }
        )*
    };
}

impl_from! {
    MaterialError => Material,
    DatatypeError => Datatype,
    EncodeError => Encode,
    ReconstructError => Reconstruct,
    ExchangeError => Exchange,
    SerError => Serialization,
    std::io::Error => IoError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticlePhase;
    use std::error::Error as _;

    #[test]
    fn test_wrapped_errors_keep_their_source() {
        let err: Error = ReconstructError::MaterialNotFound {
            phase: ParticlePhase::Solid,
            id: 4,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Reconstruction failed: solid material id 4 not found in registry"
        );
        assert!(err.source().is_some());
        assert!(Error::Config("x".into()).source().is_none());
    }
}
