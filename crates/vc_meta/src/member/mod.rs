//! Member descriptors bound to a type: constructors, converters, functions
//! and properties. Each wraps one erased invocation thunk.

// -----------------------------------------------------------------------------
// Modules

mod args;
mod constructor;
mod converter;
mod function;
mod property;
mod receiver;

// -----------------------------------------------------------------------------
// Exports

pub use args::{ArgList, Method, MethodMut, StaticFunction};
pub use constructor::ConstructorEntry;
pub use converter::ConverterEntry;
pub use function::FunctionEntry;
pub use property::PropertyEntry;

pub(crate) use args::{take_arg, wrap_return};
pub(crate) use receiver::{Receiver, exclusive_receiver, shared_receiver};
