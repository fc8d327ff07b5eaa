// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Little-endian packing helpers for particle records.
//!
//! Every element a [`crate::datatype::Datatype`] names is written in a
//! canonical little-endian form, so two ranks agree on the packed bytes
//! regardless of host byte order or struct padding.

pub mod cursor;

pub use cursor::{Cursor, CursorMut};

use std::fmt;

/// Serialization error used within core::ser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerError {
    WriteFailed { offset: usize, reason: String },
    ReadFailed { offset: usize, reason: String },
    InvalidData { offset: usize, reason: String },
}

impl fmt::Display for SerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {}: {}", offset, reason)
            }
            SerError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            SerError::InvalidData { offset, reason } => {
                write!(f, "invalid data at offset {}: {}", offset, reason)
            }
        }
    }
}

impl std::error::Error for SerError {}

pub type SerResult<T> = core::result::Result<T, SerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ser_error_display_variants() {
        let err = SerError::WriteFailed {
            offset: 12,
            reason: "buffer too small".into(),
        };
        assert_eq!(err.to_string(), "write failed at offset 12: buffer too small");

        let err = SerError::ReadFailed {
            offset: 4,
            reason: "unexpected end of buffer".into(),
        };
        assert_eq!(
            err.to_string(),
            "read failed at offset 4: unexpected end of buffer"
        );

        let err = SerError::InvalidData {
            offset: 9,
            reason: "bool byte 0x07".into(),
        };
        assert_eq!(err.to_string(), "invalid data at offset 9: bool byte 0x07");
    }

    #[test]
    fn test_ser_error_into_crate_error() {
        let err: crate::Error = SerError::InvalidData {
            offset: 0,
            reason: "bad payload".into(),
        }
        .into();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }
}
