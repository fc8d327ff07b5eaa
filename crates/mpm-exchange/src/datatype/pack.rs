// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Moving record bytes named by a [`TypeMap`] in and out of packed buffers.

use super::element::ElementKind;
use super::type_map::TypeMap;
use super::RecordLayout;
use crate::core::ser::{Cursor, CursorMut, SerError, SerResult};
use std::mem;

fn check_extent<R: RecordLayout>(map: &TypeMap) -> SerResult<()> {
    if map.extent() != mem::size_of::<R>() {
        return Err(SerError::InvalidData {
            offset: 0,
            reason: format!(
                "type map extent {} does not match {} ({} bytes)",
                map.extent(),
                R::TYPE_NAME,
                mem::size_of::<R>()
            ),
        });
    }
    Ok(())
}

/// Pack `record` into `buf`, returning the number of bytes written.
pub(crate) fn pack_into<R: RecordLayout>(map: &TypeMap, record: &R, buf: &mut [u8]) -> SerResult<usize> {
    check_extent::<R>(map)?;
    let base = (record as *const R).cast::<u8>();
    let mut cursor = CursorMut::new(buf);

    for block in map.blocks() {
        let stride = block.kind.native_size();
        for i in 0..block.count {
            let offset = block.offset + i * stride;
            // SAFETY: the builder only records blocks that lie inside the
            // record (`offset + stride <= size_of::<R>()`, checked above via
            // the extent) and only at the address of a field whose Rust type
            // is the block's element kind. The `RecordLayout` contract makes
            // that field present at the same offset in every value of `R`,
            // so the read targets an initialised value of that type.
            unsafe {
                let ptr = base.add(offset);
                match block.kind {
                    ElementKind::F64 => cursor.write_f64_le(ptr.cast::<f64>().read_unaligned())?,
                    ElementKind::U32 => cursor.write_u32_le(ptr.cast::<u32>().read_unaligned())?,
                    ElementKind::U64 => cursor.write_u64_le(ptr.cast::<u64>().read_unaligned())?,
                    ElementKind::Bool => cursor.write_bool(ptr.cast::<bool>().read_unaligned())?,
                }
            }
        }
    }
    Ok(cursor.offset())
}

/// Unpack `buf` into `record`.
///
/// The record is only modified if the whole buffer decodes; bytes of the
/// record not covered by the map keep their previous value.
pub(crate) fn unpack_from<R: RecordLayout>(map: &TypeMap, buf: &[u8], record: &mut R) -> SerResult<usize> {
    check_extent::<R>(map)?;
    let mut staged = *record;
    let base = (&mut staged as *mut R).cast::<u8>();
    let mut cursor = Cursor::new(buf);

    for block in map.blocks() {
        let stride = block.kind.native_size();
        for i in 0..block.count {
            let offset = block.offset + i * stride;
            // SAFETY: same bounds and field-type invariant as `pack_into`;
            // booleans are only written after `read_bool` has rejected every
            // byte other than 0 and 1.
            unsafe {
                let ptr = base.add(offset);
                match block.kind {
                    ElementKind::F64 => ptr.cast::<f64>().write_unaligned(cursor.read_f64_le()?),
                    ElementKind::U32 => ptr.cast::<u32>().write_unaligned(cursor.read_u32_le()?),
                    ElementKind::U64 => ptr.cast::<u64>().write_unaligned(cursor.read_u64_le()?),
                    ElementKind::Bool => ptr.cast::<bool>().write_unaligned(cursor.read_bool()?),
                }
            }
        }
    }

    if !cursor.is_eof() {
        return Err(SerError::InvalidData {
            offset: cursor.offset(),
            reason: format!("{} trailing bytes", cursor.remaining()),
        });
    }

    *record = staged;
    Ok(cursor.offset())
}
