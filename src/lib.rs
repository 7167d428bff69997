//! Runtime reflection and dynamic dispatch.
//!
//! - [`ptr`]: type-erased pointers and inline storage.
//! - [`utils`]: hashing helpers and fast `TypeId` maps.
//! - [`meta`]: variants, type descriptors, members and signals.
//!
//! ```
//! use vc_dynamic::meta::{TypeRegistry, register_builtins};
//!
//! let registry = TypeRegistry::new();
//! register_builtins(&registry).unwrap();
//!
//! let sum = registry.value(2i32).try_add(&registry.value(0.5f64)).unwrap();
//! assert!(sum.equals(&2.5f64));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use vc_meta as meta;
pub use vc_ptr as ptr;
pub use vc_utils as utils;
