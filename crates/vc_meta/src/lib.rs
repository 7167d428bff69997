//! Runtime reflection and dynamic dispatch.
//!
//! - [`Variant`]: a type-erased value or reference with inline storage for
//!   small values.
//! - [`TypeRegistry`] and [`Type`]: per-type descriptors holding the
//!   operation table and the registered members, described through a
//!   [`TypeFactory`].
//! - Members: [`ConstructorEntry`] with best-match lookup,
//!   [`ConverterEntry`], [`FunctionEntry`], [`PropertyEntry`] and
//!   [`SignalEntry`].
//! - Signals store their slots in a generational [`SlotArena`] and deliver
//!   emissions from other threads through a per-thread delayed queue.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! use vc_meta::{MetaError, ObjectId, SignalSignature, TypeRegistry, register_builtins};
//!
//! struct Button;
//! struct Clicked;
//!
//! impl SignalSignature for Clicked {
//!     type Args = (i32,);
//! }
//!
//! # fn main() -> Result<(), MetaError> {
//! let registry = TypeRegistry::new();
//! register_builtins(&registry)?;
//! registry.register::<Button>("Button")?.signal::<Clicked>("clicked")?;
//!
//! let button = Button;
//! let sender = ObjectId::of(&button);
//! let clicks = Arc::new(AtomicI32::new(0));
//!
//! let signal = registry.resolve::<Button>().find_signal("clicked").unwrap();
//! let counter = Arc::clone(&clicks);
//! let _connection = signal.connect(sender, move |count: i32| {
//!     counter.fetch_add(count, Ordering::Relaxed);
//! })?;
//!
//! signal.emit(sender, &[registry.value(2i32)])?;
//! assert_eq!(clicks.load(Ordering::Relaxed), 2);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod builtins;
mod descriptor;
mod error;
mod member;
mod registry;
mod signal;
mod value;
mod variant;

// -----------------------------------------------------------------------------
// Exports

pub use builtins::register_builtins;
pub use descriptor::{
    BaseEntry, BinaryOperator, Numeric, Operation, Scalar, Type, TypeDescriptor, TypeFlags,
    UnaryOperator,
};
pub use error::MetaError;
pub use member::{
    ArgList, ConstructorEntry, ConverterEntry, FunctionEntry, Method, MethodMut, PropertyEntry,
    StaticFunction,
};
pub use registry::{TypeFactory, TypeRegistry};
pub use signal::{Connection, SignalEntry, SignalSignature, SlotArena, SlotFn, SlotIndex};
pub use value::{ObjectId, PointerLike, RawPtr, Value};
pub use variant::{INLINE_CAPACITY, StorageKind, Variant};

pub use vc_utils::hash::HashedName;
