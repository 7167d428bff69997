//! Lifetime-carrying, type-erased pointers for erased value storage.
//!
//! The reflection engine stores values of unknown type behind a single
//! `Variant`. Every generated thunk in its operation tables (drop, clone,
//! arithmetic, member invocation) receives the storage through one of the
//! pointers below instead of a raw `*mut u8`, so the borrow of the storage
//! stays visible to the compiler.
//!
//! **Ptr** and **PtrMut**
//!
//! [`Ptr<'a>`] and [`PtrMut<'a>`] are type-erased `&T` and `&mut T`
//! equivalents. They carry a lifetime and an alignment check usable in
//! debug builds.
//!
//! **OwningPtr**
//!
//! [`OwningPtr<'a>`] points to a value the holder is about to give up.
//! The value must be consumed exactly once, either by
//! [`read`](OwningPtr::read) or by [`drop_as`](OwningPtr::drop_as).
//! It does not manage the allocation behind the value.
//!
//! **InlineBuffer**
//!
//! [`InlineBuffer<N>`] is an uninitialized, 16-byte aligned byte array
//! used for small-object storage.
#![expect(unsafe_code, reason = "Raw pointers are inherently unsafe.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod inline;
mod type_erased;

// -----------------------------------------------------------------------------
// Top-level exports

pub use inline::{INLINE_ALIGN, InlineBuffer};
pub use type_erased::{OwningPtr, Ptr, PtrMut};
