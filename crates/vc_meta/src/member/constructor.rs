use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use super::args::{StaticFunction, wrap_return};
use crate::descriptor::Type;
use crate::error::MetaError;
use crate::registry::TypeRegistry;
use crate::value::Value;
use crate::variant::Variant;

type ConstructFn =
    dyn Fn(Type, &mut [Variant<'_>]) -> Result<Variant<'static>, MetaError> + Send + Sync;

/// A registered way to build an owner value from arguments.
///
/// Owned arguments of the exact type are moved into the call. References
/// are deep-copied and other types go through converters.
pub struct ConstructorEntry {
    owner: Type,
    arg_types: Vec<Type>,
    thunk: Box<ConstructFn>,
}

impl ConstructorEntry {
    pub(crate) fn new<T, F, M>(registry: &TypeRegistry, owner: Type, f: F) -> Self
    where
        T: Value,
        F: StaticFunction<M, Output = T>,
    {
        Self {
            owner,
            arg_types: F::arg_types(registry),
            thunk: Box::new(
                move |ty: Type, args: &mut [Variant<'_>]| -> Result<Variant<'static>, MetaError> {
                    f.call(args).map(|value| wrap_return(ty, value))
                },
            ),
        }
    }

    /// The constructed type.
    #[inline]
    pub fn owner(&self) -> Type {
        self.owner
    }

    /// Number of parameters.
    #[inline]
    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    /// Parameter types in order.
    #[inline]
    pub fn arg_types(&self) -> &[Type] {
        &self.arg_types
    }

    /// Type of parameter `index`.
    #[inline]
    pub fn arg_type(&self, index: usize) -> Option<Type> {
        self.arg_types.get(index).copied()
    }

    /// Builds a new owned value.
    ///
    /// # Errors
    ///
    /// [`MetaError::ArityMismatch`] or [`MetaError::ArgumentMismatch`].
    pub fn invoke(&self, args: &mut [Variant<'_>]) -> Result<Variant<'static>, MetaError> {
        (self.thunk)(self.owner, args)
    }
}

impl fmt::Debug for ConstructorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorEntry")
            .field("owner", &self.owner)
            .field("arg_types", &self.arg_types)
            .finish()
    }
}
