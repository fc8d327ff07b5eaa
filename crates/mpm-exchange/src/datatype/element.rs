// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Element kinds a datatype block can carry.

use std::fmt;

/// Primitive kind of every element in a [`super::Block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// IEEE-754 binary64.
    F64,
    /// Unsigned 32-bit integer (material ids, state-variable counts).
    U32,
    /// Unsigned 64-bit integer (particle and cell ids).
    U64,
    /// Boolean flag, one byte holding 0 or 1.
    Bool,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [Self::F64, Self::U32, Self::U64, Self::Bool];

    /// Size of one element in the record's memory.
    pub const fn native_size(self) -> usize {
        match self {
            Self::F64 => std::mem::size_of::<f64>(),
            Self::U32 => std::mem::size_of::<u32>(),
            Self::U64 => std::mem::size_of::<u64>(),
            Self::Bool => std::mem::size_of::<bool>(),
        }
    }

    /// Size of one element once packed for the wire or a checkpoint file.
    pub const fn packed_size(self) -> usize {
        match self {
            Self::F64 | Self::U64 => 8,
            Self::U32 => 4,
            Self::Bool => 1,
        }
    }

    /// Stable code used in type signatures.
    pub const fn code(self) -> u8 {
        match self {
            Self::F64 => 1,
            Self::U32 => 2,
            Self::U64 => 3,
            Self::Bool => 4,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F64 => "f64",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for bool {}
}

/// Rust types that map onto an [`ElementKind`].
pub trait Element: Copy + sealed::Sealed {
    const KIND: ElementKind;
}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::F64;
}

impl Element for u32 {
    const KIND: ElementKind = ElementKind::U32;
}

impl Element for u64 {
    const KIND: ElementKind = ElementKind::U64;
}

impl Element for bool {
    const KIND: ElementKind = ElementKind::Bool;
}
