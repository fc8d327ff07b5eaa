// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Type maps: the ordered (offset, count, kind) blocks describing a record.

use super::element::{Element, ElementKind};
use super::RecordLayout;
use std::marker::PhantomData;
use std::mem;

/// A contiguous run of same-kind elements inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Byte offset of the first element from the start of the record.
    pub offset: usize,
    /// Number of elements in the run.
    pub count: usize,
    /// Kind of every element in the run.
    pub kind: ElementKind,
}

impl Block {
    /// One past the last byte covered by the block.
    pub fn end(&self) -> usize {
        self.offset + self.count * self.kind.native_size()
    }
}

/// Memory layout description of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMap {
    blocks: Vec<Block>,
    extent: usize,
}

impl TypeMap {
    /// Build the map of `record` from its [`RecordLayout::describe`].
    pub fn of<R: RecordLayout>(record: &R) -> Self {
        let mut builder = TypeMapBuilder::new(record);
        record.describe(&mut builder);
        builder.build()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Size in bytes of the record the map was built from.
    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn element_count(&self) -> usize {
        self.blocks.iter().map(|b| b.count).sum()
    }

    /// Bytes needed to pack one record.
    pub fn packed_size(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.count * b.kind.packed_size())
            .sum()
    }

    /// Structural signature of the element sequence (FNV-1a 64).
    ///
    /// Offsets and padding are excluded and adjacent blocks of the same kind
    /// are folded together, so maps built on different hosts or with
    /// different grouping agree whenever the packed element sequence does.
    pub fn signature(&self) -> u64 {
        let mut runs: Vec<(ElementKind, u64)> = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            match runs.last_mut() {
                Some((kind, count)) if *kind == block.kind => *count += block.count as u64,
                _ => runs.push((block.kind, block.count as u64)),
            }
        }

        let mut hash = FNV_OFFSET;
        for (kind, count) in runs {
            hash = fnv1a(hash, &[kind.code()]);
            hash = fnv1a(hash, &count.to_le_bytes());
        }
        hash
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Collects the fields of one record instance into a [`TypeMap`].
///
/// Offsets are taken from the addresses of the borrowed fields relative to
/// the record, so the map always matches the compiled layout. Fields must be
/// visited in memory order; physically contiguous fields of one kind are
/// merged into a single block.
pub struct TypeMapBuilder<'r> {
    base: usize,
    extent: usize,
    blocks: Vec<Block>,
    _record: PhantomData<&'r ()>,
}

impl<'r> TypeMapBuilder<'r> {
    pub fn new<R>(record: &'r R) -> Self {
        Self {
            base: record as *const R as usize,
            extent: mem::size_of::<R>(),
            blocks: Vec::new(),
            _record: PhantomData,
        }
    }

    /// Add a single field.
    pub fn scalar<T: Element>(&mut self, field: &'r T) -> &mut Self {
        self.push(field as *const T as usize, 1, T::KIND)
    }

    /// Add a fixed-capacity array field.
    pub fn array<T: Element, const N: usize>(&mut self, field: &'r [T; N]) -> &mut Self {
        self.push(field.as_ptr() as usize, N, T::KIND)
    }

    fn push(&mut self, address: usize, count: usize, kind: ElementKind) -> &mut Self {
        let offset = address
            .checked_sub(self.base)
            .filter(|offset| offset + count * kind.native_size() <= self.extent);
        let Some(offset) = offset else {
            panic!("field at address {address:#x} lies outside the described record");
        };

        if let Some(last) = self.blocks.last_mut() {
            assert!(
                offset >= last.end(),
                "record fields must be described in memory order (offset {} overlaps block ending at {})",
                offset,
                last.end()
            );
            if last.kind == kind && last.end() == offset {
                last.count += count;
                return self;
            }
        }

        self.blocks.push(Block {
            offset,
            count,
            kind,
        });
        self
    }

    pub fn build(self) -> TypeMap {
        TypeMap {
            blocks: self.blocks,
            extent: self.extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Default)]
    struct Sample {
        id: u64,
        a: f64,
        b: f64,
        flag: bool,
        n: u32,
        values: [f64; 3],
    }

    fn sample_map(sample: &Sample) -> TypeMap {
        let mut builder = TypeMapBuilder::new(sample);
        builder
            .scalar(&sample.id)
            .scalar(&sample.a)
            .scalar(&sample.b)
            .scalar(&sample.flag)
            .scalar(&sample.n)
            .array(&sample.values);
        builder.build()
    }

    #[test]
    fn test_contiguous_same_kind_fields_merge() {
        let sample = Sample::default();
        let map = sample_map(&sample);

        assert_eq!(
            map.blocks()[1],
            Block {
                offset: mem::offset_of!(Sample, a),
                count: 2,
                kind: ElementKind::F64,
            }
        );
        assert_eq!(map.blocks().len(), 5);
        assert_eq!(map.element_count(), 8);
        assert_eq!(map.extent(), mem::size_of::<Sample>());
    }

    #[test]
    fn test_padding_is_not_covered() {
        let sample = Sample::default();
        let map = sample_map(&sample);
        let flag = map.blocks()[2];
        let n = map.blocks()[3];
        assert_eq!(flag.kind, ElementKind::Bool);
        assert_eq!(n.kind, ElementKind::U32);
        assert_eq!(n.offset, mem::offset_of!(Sample, n));
        assert!(n.offset > flag.end());
    }

    #[test]
    fn test_packed_size_excludes_padding() {
        let sample = Sample::default();
        let map = sample_map(&sample);
        assert_eq!(map.packed_size(), 8 + 16 + 1 + 4 + 24);
    }

    #[test]
    fn test_signature_is_independent_of_grouping() {
        let sample = Sample::default();
        let grouped = sample_map(&sample);

        let split = TypeMap {
            blocks: grouped
                .blocks()
                .iter()
                .flat_map(|b| {
                    (0..b.count).map(move |i| Block {
                        offset: b.offset + i * b.kind.native_size(),
                        count: 1,
                        kind: b.kind,
                    })
                })
                .collect(),
            extent: grouped.extent(),
        };
        assert_eq!(split.blocks().len(), 8);
        assert_eq!(grouped.signature(), split.signature());
    }

    #[test]
    fn test_signature_detects_count_change() {
        let sample = Sample::default();
        let map = sample_map(&sample);
        let mut blocks = map.blocks().to_vec();
        blocks.last_mut().expect("non-empty").count = 2;
        let shorter = TypeMap {
            blocks,
            extent: map.extent(),
        };
        assert_ne!(map.signature(), shorter.signature());
    }

    #[test]
    #[should_panic(expected = "memory order")]
    fn test_out_of_order_fields_are_rejected() {
        let sample = Sample::default();
        let mut builder = TypeMapBuilder::new(&sample);
        builder.scalar(&sample.b).scalar(&sample.a);
    }

    #[test]
    #[should_panic(expected = "outside the described record")]
    fn test_foreign_field_is_rejected() {
        let sample = Sample::default();
        let other = 1.0f64;
        let mut builder = TypeMapBuilder::new(&sample);
        builder.scalar(&other);
    }
}
