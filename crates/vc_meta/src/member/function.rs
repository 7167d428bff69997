#![expect(unsafe_code, reason = "Method thunks reinterpret their receiver.")]

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use vc_utils::hash::HashedName;

use super::args::{Method, MethodMut, StaticFunction, wrap_return};
use super::{Receiver, exclusive_receiver, shared_receiver};
use crate::descriptor::Type;
use crate::error::MetaError;
use crate::registry::TypeRegistry;
use crate::value::Value;
use crate::variant::Variant;

type InvokeFn = dyn for<'r> Fn(Receiver<'r>, &mut [Variant<'_>]) -> Result<Variant<'static>, MetaError>
    + Send
    + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Static,
    Const,
    Mutable,
}

/// A registered function: static, or a method taking `&T` or `&mut T`.
///
/// Methods registered on a base type accept derived instances; the
/// receiver is upcast along the registered base chain.
pub struct FunctionEntry {
    name: HashedName,
    owner: Type,
    kind: Kind,
    arg_types: Vec<Type>,
    return_type: Type,
    thunk: Box<InvokeFn>,
}

impl FunctionEntry {
    pub(crate) fn from_static<F, M>(
        registry: &TypeRegistry,
        owner: Type,
        name: HashedName,
        f: F,
    ) -> Self
    where
        F: StaticFunction<M>,
    {
        let return_type = registry.resolve::<F::Output>();
        Self {
            name,
            owner,
            kind: Kind::Static,
            arg_types: F::arg_types(registry),
            return_type,
            thunk: Box::new(
                move |_: Receiver<'_>, args: &mut [Variant<'_>]| -> Result<Variant<'static>, MetaError> {
                    f.call(args).map(|value| wrap_return(return_type, value))
                },
            ),
        }
    }

    pub(crate) fn from_method<T, F, M>(
        registry: &TypeRegistry,
        owner: Type,
        name: HashedName,
        f: F,
    ) -> Self
    where
        T: Value,
        F: Method<T, M>,
    {
        let return_type = registry.resolve::<F::Output>();
        Self {
            name,
            owner,
            kind: Kind::Const,
            arg_types: F::arg_types(registry),
            return_type,
            thunk: Box::new(
                move |receiver: Receiver<'_>, args: &mut [Variant<'_>]| -> Result<Variant<'static>, MetaError> {
                    // SAFETY: receivers are projected to `owner`, which describes `T`.
                    let this = unsafe { receiver.shared::<T>(name)? };
                    f.call(this, args).map(|value| wrap_return(return_type, value))
                },
            ),
        }
    }

    pub(crate) fn from_method_mut<T, F, M>(
        registry: &TypeRegistry,
        owner: Type,
        name: HashedName,
        f: F,
    ) -> Self
    where
        T: Value,
        F: MethodMut<T, M>,
    {
        let return_type = registry.resolve::<F::Output>();
        Self {
            name,
            owner,
            kind: Kind::Mutable,
            arg_types: F::arg_types(registry),
            return_type,
            thunk: Box::new(
                move |receiver: Receiver<'_>, args: &mut [Variant<'_>]| -> Result<Variant<'static>, MetaError> {
                    // SAFETY: receivers are projected to `owner`, which describes `T`.
                    let this = unsafe { receiver.exclusive::<T>(name)? };
                    f.call(this, args).map(|value| wrap_return(return_type, value))
                },
            ),
        }
    }

    /// The hashed name.
    #[inline]
    pub fn name(&self) -> HashedName {
        self.name
    }

    /// The type the function was registered on.
    #[inline]
    pub fn owner(&self) -> Type {
        self.owner
    }

    /// Takes no instance.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.kind == Kind::Static
    }

    /// Takes `&T`.
    #[inline]
    pub fn is_const(&self) -> bool {
        self.kind == Kind::Const
    }

    /// Number of parameters, receiver excluded.
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

    /// The return type. `()` maps to the void descriptor.
    #[inline]
    pub fn return_type(&self) -> Type {
        self.return_type
    }

    /// Calls a static function.
    ///
    /// # Errors
    ///
    /// [`MetaError::InstanceRequired`] for methods, or an argument error.
    pub fn invoke_static(&self, args: &mut [Variant<'_>]) -> Result<Variant<'static>, MetaError> {
        if !self.is_static() {
            return Err(MetaError::InstanceRequired { name: self.name });
        }
        (self.thunk)(Receiver::None, args)
    }

    /// Calls the function on a shared instance.
    ///
    /// Static functions ignore the instance.
    ///
    /// # Errors
    ///
    /// [`MetaError::ConstViolation`] for `&mut T` methods,
    /// [`MetaError::BadCast`] if the instance is unrelated to the owner,
    /// or an argument error.
    pub fn invoke(
        &self,
        instance: &Variant<'_>,
        args: &mut [Variant<'_>],
    ) -> Result<Variant<'static>, MetaError> {
        let receiver = match self.kind {
            Kind::Static => Receiver::None,
            Kind::Const => shared_receiver(instance, self.owner, self.name)?,
            Kind::Mutable => {
                return Err(MetaError::ConstViolation {
                    type_name: self.owner.type_name(),
                });
            }
        };
        (self.thunk)(receiver, args)
    }

    /// Calls the function on an exclusive instance.
    ///
    /// # Errors
    ///
    /// As [`invoke`](Self::invoke). A constant reference passed to a
    /// `&mut T` method gives [`MetaError::ConstViolation`].
    pub fn invoke_mut(
        &self,
        instance: &mut Variant<'_>,
        args: &mut [Variant<'_>],
    ) -> Result<Variant<'static>, MetaError> {
        let receiver = match self.kind {
            Kind::Static => Receiver::None,
            Kind::Const => shared_receiver(instance, self.owner, self.name)?,
            Kind::Mutable => exclusive_receiver(instance, self.owner, self.name)?,
        };
        (self.thunk)(receiver, args)
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("arg_types", &self.arg_types)
            .field("return_type", &self.return_type)
            .finish()
    }
}
