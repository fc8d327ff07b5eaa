// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Bounds-checked read/write cursors over packed record buffers.

use super::{SerError, SerResult};

/// Generate little-endian write methods for fixed-width element types.
macro_rules! impl_write_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) -> SerResult<()> {
            if self.offset + $size > self.buffer.len() {
                return Err(SerError::WriteFailed {
                    offset: self.offset,
                    reason: "buffer too small".into(),
                });
            }
            self.buffer[self.offset..self.offset + $size].copy_from_slice(&value.to_le_bytes());
            self.offset += $size;
            Ok(())
        }
    };
}

/// Generate little-endian read methods for fixed-width element types.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> SerResult<$type> {
            if self.offset + $size > self.buffer.len() {
                return Err(SerError::ReadFailed {
                    offset: self.offset,
                    reason: "unexpected end of buffer".into(),
                });
            }
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&self.buffer[self.offset..self.offset + $size]);
            self.offset += $size;
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Mutable cursor for packing.
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_write_le!(write_u8, u8, 1);
    impl_write_le!(write_u32_le, u32, 4);
    impl_write_le!(write_u64_le, u64, 8);

    /// Floats travel as their IEEE-754 bit pattern.
    pub fn write_f64_le(&mut self, value: f64) -> SerResult<()> {
        self.write_u64_le(value.to_bits())
    }

    pub fn write_bool(&mut self, value: bool) -> SerResult<()> {
        self.write_u8(u8::from(value))
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }
}

/// Immutable cursor for unpacking.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_u32_le, u32, 4);
    impl_read_le!(read_u64_le, u64, 8);

    pub fn read_f64_le(&mut self) -> SerResult<f64> {
        Ok(f64::from_bits(self.read_u64_le()?))
    }

    /// Only `0` and `1` are valid boolean bytes.
    pub fn read_bool(&mut self) -> SerResult<bool> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerError::InvalidData {
                offset,
                reason: format!("bool byte 0x{:02x}", other),
            }),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}
