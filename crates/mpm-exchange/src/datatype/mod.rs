// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Transport datatypes derived from record memory layouts.
//!
//! A [`Datatype`] is the descriptor a rank commits before moving a record:
//! the ordered list of `(offset, count, kind)` blocks covering every field of
//! the record, taken from the compiled layout of the record type itself.
//! Because the map is derived from the type and nothing else, two ranks that
//! share the record definition build interchangeable descriptors without
//! talking to each other.
//!
//! # Example
//!
//! ```
//! use mpm_exchange::datatype::{register_particle_type, deregister_particle_type};
//! use mpm_exchange::record::TwoPhaseParticleRecord;
//! use mpm_exchange::transport::LocalGroup;
//!
//! let rank = LocalGroup::new(1).remove(0);
//! let record = TwoPhaseParticleRecord::default();
//! let datatype = register_particle_type(&rank, &record).unwrap();
//! assert_eq!(datatype.type_map().blocks().len(), 8);
//! deregister_particle_type(datatype);
//! ```

mod element;
mod pack;
mod registry;
mod type_map;

pub use element::{Element, ElementKind};
pub use registry::{DatatypeId, DatatypeRegistry};
pub use type_map::{Block, TypeMap, TypeMapBuilder};

use crate::core::ser::{SerError, SerResult};
use crate::transport::Transport;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A flat record type that can be described as a [`TypeMap`].
///
/// `describe` must hand every meaningful field of `self` to the builder, in
/// memory order. Packing reads and writes the described fields through raw
/// pointers at the offsets taken from the instance passed to `describe`, and
/// applies those offsets to every other value of `Self`.
///
/// # Safety
///
/// Every reference `describe` hands to the builder must point at a plain
/// field of `self` (or an element of a plain array field) that exists at the
/// same offset with the same type in every value of `Self`. Fields reached
/// through an enum variant, a pointer or any other indirection violate this:
/// another value of `Self` may hold different bytes there.
///
/// ```compile_fail
/// use mpm_exchange::datatype::{RecordLayout, TypeMapBuilder};
///
/// #[derive(Clone, Copy, Default)]
/// #[repr(C)]
/// struct Sample {
///     value: f64,
/// }
///
/// impl RecordLayout for Sample {
///     const TYPE_NAME: &'static str = "Sample";
///
///     fn describe<'r>(&'r self, map: &mut TypeMapBuilder<'r>) {
///         map.scalar(&self.value);
///     }
/// }
/// ```
pub unsafe trait RecordLayout: Copy + Default + Send + 'static {
    /// Name used in logs and error messages.
    const TYPE_NAME: &'static str;

    fn describe<'r>(&'r self, map: &mut TypeMapBuilder<'r>);

    /// Build the type map of this record type.
    fn type_map(&self) -> TypeMap {
        TypeMap::of(self)
    }
}

/// Descriptor construction failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatatypeError {
    /// The transport cannot carry one of the record's element kinds.
    UnsupportedKind {
        type_name: &'static str,
        kind: ElementKind,
    },
}

impl fmt::Display for DatatypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatatypeError::UnsupportedKind { type_name, kind } => write!(
                f,
                "transport cannot represent element kind {} required by {}",
                kind, type_name
            ),
        }
    }
}

impl std::error::Error for DatatypeError {}

/// A committed descriptor for records of type `R`.
///
/// Release it with [`Datatype::release`] once the transfer is done. A handle
/// that is simply dropped is released too, with a warning.
pub struct Datatype<R: RecordLayout> {
    id: DatatypeId,
    type_map: TypeMap,
    signature: u64,
    registry: Arc<DatatypeRegistry>,
    released: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R: RecordLayout> Datatype<R> {
    /// Commit the layout of `record` against `registry`.
    pub fn commit(registry: &Arc<DatatypeRegistry>, record: &R) -> Self {
        let type_map = TypeMap::of(record);
        let signature = type_map.signature();
        let id = registry.commit(R::TYPE_NAME, signature);
        Self {
            id,
            type_map,
            signature,
            registry: Arc::clone(registry),
            released: false,
            _record: PhantomData,
        }
    }

    pub fn id(&self) -> DatatypeId {
        self.id
    }

    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    pub fn signature(&self) -> u64 {
        self.signature
    }

    pub fn packed_size(&self) -> usize {
        self.type_map.packed_size()
    }

    pub fn pack(&self, record: &R) -> SerResult<Vec<u8>> {
        let mut buf = vec![0u8; self.packed_size()];
        let written = self.pack_into(record, &mut buf)?;
        buf.truncate(written);
        Ok(buf)
    }

    pub fn pack_into(&self, record: &R, buf: &mut [u8]) -> SerResult<usize> {
        pack::pack_into(&self.type_map, record, buf)
    }

    /// Decode one packed record. `buf` must hold exactly one record.
    pub fn unpack(&self, buf: &[u8], record: &mut R) -> SerResult<()> {
        if buf.len() != self.packed_size() {
            return Err(SerError::ReadFailed {
                offset: buf.len(),
                reason: format!(
                    "expected {} packed bytes for {}",
                    self.packed_size(),
                    R::TYPE_NAME
                ),
            });
        }
        pack::unpack_from(&self.type_map, buf, record).map(|_| ())
    }

    /// Release the transport resources held by this descriptor.
    pub fn release(mut self) -> bool {
        self.released = true;
        self.registry.free(self.id)
    }
}

impl<R: RecordLayout> fmt::Debug for Datatype<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datatype")
            .field("type", &R::TYPE_NAME)
            .field("id", &self.id)
            .field("blocks", &self.type_map.blocks().len())
            .field("signature", &format_args!("{:#018x}", self.signature))
            .finish()
    }
}

impl<R: RecordLayout> Drop for Datatype<R> {
    fn drop(&mut self) {
        if !self.released && self.registry.free(self.id) {
            log::warn!(
                "[DATATYPE] {} id={} dropped without release",
                R::TYPE_NAME,
                self.id.0
            );
        }
    }
}

/// Build and commit the datatype of a particle record on `transport`.
///
/// Fails only when the transport cannot carry one of the record's element
/// kinds; that is a platform capability problem, not a data error.
pub fn register_particle_type<R, T>(transport: &T, record: &R) -> Result<Datatype<R>, DatatypeError>
where
    R: RecordLayout,
    T: Transport + ?Sized,
{
    let type_map = TypeMap::of(record);
    if let Some(block) = type_map
        .blocks()
        .iter()
        .find(|b| !transport.supports(b.kind))
    {
        log::error!(
            "[DATATYPE] rank {} cannot represent {} for {}",
            transport.rank(),
            block.kind,
            R::TYPE_NAME
        );
        return Err(DatatypeError::UnsupportedKind {
            type_name: R::TYPE_NAME,
            kind: block.kind,
        });
    }
    Ok(Datatype::commit(transport.datatypes(), record))
}

/// Release a datatype obtained from [`register_particle_type`].
pub fn deregister_particle_type<R: RecordLayout>(datatype: Datatype<R>) {
    let id = datatype.id();
    if !datatype.release() {
        log::warn!("[DATATYPE] id={} was already released", id.0);
    }
}
