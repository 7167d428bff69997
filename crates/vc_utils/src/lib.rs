//! Small building blocks shared by the reflection crates.
//!
//! - [`hash`]: fixed-seed and pass-through hashers, `hashbrown` aliases and
//!   the deterministic [`HashedName`](hash::HashedName) used for name lookup.
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId).
//! - [`range_invoke!`]: generates variadic trait impls up to [`MAX_ARITY`].
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod range_invoke;
mod typeid_map;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;

/// The largest argument count supported by generated variadic impls.
pub const MAX_ARITY: usize = 8;
