#![expect(unsafe_code, reason = "Operator thunks read type-erased storage.")]

use core::fmt;
use core::marker::PhantomData;

use vc_ptr::{Ptr, PtrMut};
use vc_utils::hash::HashedName;

use super::TypeRegistry;
use crate::descriptor::{
    AssignFn, BaseEntry, BinaryFn, BinaryOperator, Numeric, ToBoolFn, Type, TypeFlags, UnaryFn,
    UnaryOperator, clone_from_thunk, clone_thunk, default_thunk, leak, numeric_assign,
    numeric_binary, numeric_negate, numeric_to_bool, operand, pointer_assign, pointer_binary,
    scalar_thunk,
};
use crate::error::MetaError;
use crate::member::{
    ConstructorEntry, ConverterEntry, FunctionEntry, Method, MethodMut, PropertyEntry,
    StaticFunction,
};
use crate::signal::{SignalEntry, SignalSignature};
use crate::value::{PointerLike, Value};
use crate::variant::Variant;

/// Describes `T`: its operations and its members.
///
/// Obtained from [`TypeRegistry::register`] or [`TypeRegistry::factory`].
/// Operations replace any earlier registration of the same operation;
/// members are checked for duplicates and return an error.
pub struct TypeFactory<'r, T> {
    registry: &'r TypeRegistry,
    ty: Type,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Value> TypeFactory<'r, T> {
    #[inline]
    pub(super) fn new(registry: &'r TypeRegistry, ty: Type) -> Self {
        Self {
            registry,
            ty,
            _marker: PhantomData,
        }
    }

    /// The described type.
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The registry this factory writes to.
    #[inline]
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }
}

// Operations.
impl<T: Value> TypeFactory<'_, T> {
    /// Enables [`Type::default_construct`].
    pub fn with_default(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.ty.update_ops(|ops| ops.default = Some(default_thunk::<T>));
        self
    }

    /// Enables deep copies of `T` variants.
    pub fn with_clone(&mut self) -> &mut Self
    where
        T: Clone,
    {
        self.ty.update_ops(|ops| {
            ops.clone = Some(clone_thunk::<T>);
            ops.clone_from = Some(clone_from_thunk::<T>);
        });
        self
    }

    /// Sets the truthiness of `T` values.
    pub fn with_to_bool(&mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> &mut Self {
        let thunk: ToBoolFn = leak(move |ptr: Ptr<'_>| -> bool {
            // SAFETY: only called on storage holding a `T`.
            f(unsafe { ptr.as_ref::<T>() })
        });
        self.ty.update_ops(|ops| ops.to_bool = Some(thunk));
        self
    }

    /// Sets a unary operator.
    pub fn with_unary_operator(
        &mut self,
        op: UnaryOperator,
        f: impl Fn(&T) -> T + Send + Sync + 'static,
    ) -> &mut Self {
        let thunk: UnaryFn = leak(move |ty: Type, ptr: Ptr<'_>| -> Result<Variant<'static>, MetaError> {
            // SAFETY: only called on storage holding a `T`.
            Ok(Variant::with_value(ty, f(unsafe { ptr.as_ref::<T>() })))
        });
        self.ty.update_ops(|ops| ops.unary[op.index()] = Some(thunk));
        self
    }

    /// Sets a binary operator. The right operand must be a `T` or convert to one.
    pub fn with_binary_operator(
        &mut self,
        op: BinaryOperator,
        f: impl Fn(&T, &T) -> T + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: Clone,
    {
        let thunk: BinaryFn = leak(
            move |ty: Type, lhs: Ptr<'_>, rhs: &Variant<'_>| -> Result<Variant<'static>, MetaError> {
                let rhs = operand::<T>(ty, rhs)?;
                // SAFETY: only called on storage holding a `T`.
                Ok(Variant::with_value(ty, f(unsafe { lhs.as_ref::<T>() }, &rhs)))
            },
        );
        self.ty.update_ops(|ops| ops.binary[op.index()] = Some(thunk));
        self
    }

    /// Sets the assignment form of a binary operator.
    pub fn with_assign_operator(
        &mut self,
        op: BinaryOperator,
        f: impl Fn(&mut T, &T) + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: Clone,
    {
        let ty = self.ty;
        let thunk: AssignFn = leak(
            move |mut lhs: PtrMut<'_>, rhs: &Variant<'_>| -> Result<(), MetaError> {
                let rhs = operand::<T>(ty, rhs)?;
                // SAFETY: only called on storage holding a `T`.
                f(unsafe { lhs.as_mut::<T>() }, &rhs);
                Ok(())
            },
        );
        self.ty.update_ops(|ops| ops.assign[op.index()] = Some(thunk));
        self
    }

    /// Registers the full numeric operation set: default, clone, truthiness,
    /// negation and every binary and assignment operator, with mixed-type
    /// bridging.
    pub fn with_numeric(&mut self) -> &mut Self
    where
        T: Numeric,
    {
        let ty = self.ty;
        self.with_default().with_clone();
        ty.update_ops(|ops| {
            ops.scalar = Some(scalar_thunk::<T>);
            ops.to_bool = Some(numeric_to_bool::<T>());
            ops.unary[UnaryOperator::Minus.index()] = Some(numeric_negate::<T>());
            for op in BinaryOperator::ALL {
                ops.binary[op.index()] = Some(numeric_binary::<T>(op));
                ops.assign[op.index()] = Some(numeric_assign::<T>(ty, op));
            }
        });
        self
    }

    /// Marks `T` as pointer-like: `+`, `-`, `+=` and `-=` take a `usize`
    /// element count.
    pub fn with_pointer_arithmetic(&mut self) -> &mut Self
    where
        T: PointerLike,
    {
        let ty = self.ty;
        ty.insert_flags(TypeFlags::POINTER);
        self.with_clone();
        ty.update_ops(|ops| {
            for op in [BinaryOperator::Addition, BinaryOperator::Subtraction] {
                ops.binary[op.index()] = Some(pointer_binary::<T>(op));
                ops.assign[op.index()] = Some(pointer_assign::<T>(ty, op));
            }
        });
        self
    }
}

// Members.
impl<T: Value> TypeFactory<'_, T> {
    /// Declares `B` a base of `T`, reachable through `AsRef`/`AsMut`.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateBase`].
    pub fn base<B: Value>(&mut self) -> Result<&mut Self, MetaError>
    where
        T: AsRef<B> + AsMut<B>,
    {
        let base = self.registry.resolve::<B>();
        self.ty.add_base(BaseEntry::new::<T, B>(base))?;
        Ok(self)
    }

    /// Adds a constructor. Its parameters are the closure's parameters.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateConstructor`] for an identical parameter list.
    pub fn constructor<F, M>(&mut self, f: F) -> Result<&mut Self, MetaError>
    where
        F: StaticFunction<M, Output = T>,
    {
        let entry = ConstructorEntry::new::<T, F, M>(self.registry, self.ty, f);
        self.ty.add_constructor(entry)?;
        Ok(self)
    }

    /// Adds a converter to `To` through [`Into`].
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateConverter`].
    pub fn converter<To: Value>(&mut self) -> Result<&mut Self, MetaError>
    where
        T: Clone + Into<To>,
    {
        self.converter_with(|value: &T| -> To { value.clone().into() })
    }

    /// Adds a converter to `To` through `f`.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateConverter`].
    pub fn converter_with<To: Value>(
        &mut self,
        f: impl Fn(&T) -> To + Send + Sync + 'static,
    ) -> Result<&mut Self, MetaError> {
        let to = self.registry.resolve::<To>();
        self.ty.add_converter(ConverterEntry::new(self.ty, to, f))?;
        Ok(self)
    }

    /// Adds a static function.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateFunction`].
    pub fn function<F, M>(
        &mut self,
        name: impl Into<HashedName>,
        f: F,
    ) -> Result<&mut Self, MetaError>
    where
        F: StaticFunction<M>,
    {
        let entry = FunctionEntry::from_static(self.registry, self.ty, name.into(), f);
        self.ty.add_function(entry)?;
        Ok(self)
    }

    /// Adds a method taking `&T`.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateFunction`].
    pub fn method<F, M>(&mut self, name: impl Into<HashedName>, f: F) -> Result<&mut Self, MetaError>
    where
        F: Method<T, M>,
    {
        let entry = FunctionEntry::from_method::<T, F, M>(self.registry, self.ty, name.into(), f);
        self.ty.add_function(entry)?;
        Ok(self)
    }

    /// Adds a method taking `&mut T`.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateFunction`].
    pub fn method_mut<F, M>(
        &mut self,
        name: impl Into<HashedName>,
        f: F,
    ) -> Result<&mut Self, MetaError>
    where
        F: MethodMut<T, M>,
    {
        let entry =
            FunctionEntry::from_method_mut::<T, F, M>(self.registry, self.ty, name.into(), f);
        self.ty.add_function(entry)?;
        Ok(self)
    }

    /// Adds a read-write instance property.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateProperty`].
    pub fn property<P: Value>(
        &mut self,
        name: impl Into<HashedName>,
        get: impl Fn(&T) -> P + Send + Sync + 'static,
        set: impl Fn(&mut T, P) + Send + Sync + 'static,
    ) -> Result<&mut Self, MetaError> {
        let entry = PropertyEntry::instance(self.registry, self.ty, name.into(), get)
            .with_instance_setter(set);
        self.ty.add_property(entry)?;
        Ok(self)
    }

    /// Adds a read-write instance property that emits `signal` after each set.
    ///
    /// The signal is looked up on `T` and its bases and must carry exactly
    /// one argument, of type `P` or convertible from it.
    ///
    /// # Errors
    ///
    /// [`MetaError::UnknownSignal`], [`MetaError::ArityMismatch`],
    /// [`MetaError::ArgumentMismatch`] or [`MetaError::DuplicateProperty`].
    pub fn property_with_signal<P: Value>(
        &mut self,
        name: impl Into<HashedName>,
        get: impl Fn(&T) -> P + Send + Sync + 'static,
        set: impl Fn(&mut T, P) + Send + Sync + 'static,
        signal: impl Into<HashedName>,
    ) -> Result<&mut Self, MetaError> {
        let signal = self.notifier::<P>(signal.into())?;
        let entry = PropertyEntry::instance(self.registry, self.ty, name.into(), get)
            .with_instance_setter(set)
            .with_signal(signal);
        self.ty.add_property(entry)?;
        Ok(self)
    }

    /// Adds an instance property without a setter.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateProperty`].
    pub fn read_only_property<P: Value>(
        &mut self,
        name: impl Into<HashedName>,
        get: impl Fn(&T) -> P + Send + Sync + 'static,
    ) -> Result<&mut Self, MetaError> {
        let entry = PropertyEntry::instance(self.registry, self.ty, name.into(), get);
        self.ty.add_property(entry)?;
        Ok(self)
    }

    /// Adds a read-write static property.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateProperty`].
    pub fn static_property<P: Value>(
        &mut self,
        name: impl Into<HashedName>,
        get: impl Fn() -> P + Send + Sync + 'static,
        set: impl Fn(P) + Send + Sync + 'static,
    ) -> Result<&mut Self, MetaError> {
        let entry =
            PropertyEntry::global(self.registry, self.ty, name.into(), get).with_global_setter(set);
        self.ty.add_property(entry)?;
        Ok(self)
    }

    /// Adds a static property without a setter.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateProperty`].
    pub fn read_only_static_property<P: Value>(
        &mut self,
        name: impl Into<HashedName>,
        get: impl Fn() -> P + Send + Sync + 'static,
    ) -> Result<&mut Self, MetaError> {
        let entry = PropertyEntry::global(self.registry, self.ty, name.into(), get);
        self.ty.add_property(entry)?;
        Ok(self)
    }

    /// Declares the signal `S` on `T`.
    ///
    /// # Errors
    ///
    /// [`MetaError::DuplicateSignal`] if the name or `S` is already used.
    pub fn signal<S: SignalSignature>(
        &mut self,
        name: impl Into<HashedName>,
    ) -> Result<&mut Self, MetaError> {
        self.signal_with_args::<S>(name, &[])
    }

    /// Declares the signal `S` with one name per argument.
    ///
    /// # Errors
    ///
    /// [`MetaError::ArityMismatch`] if the name count differs from the
    /// argument count, or [`MetaError::DuplicateSignal`].
    pub fn signal_with_args<S: SignalSignature>(
        &mut self,
        name: impl Into<HashedName>,
        arg_names: &[&str],
    ) -> Result<&mut Self, MetaError> {
        let entry = SignalEntry::new::<S>(self.registry, self.ty, name.into(), arg_names)?;
        self.ty.add_signal(entry)?;
        Ok(self)
    }

    fn notifier<P: Value>(&self, name: HashedName) -> Result<&'static SignalEntry, MetaError> {
        let signal = self.ty.find_signal(name).ok_or(MetaError::UnknownSignal {
            type_name: self.ty.type_name(),
            name,
        })?;
        if signal.arg_count() != 1 {
            return Err(MetaError::ArityMismatch {
                expected: 1,
                found: signal.arg_count(),
            });
        }
        let (value, expected) = (self.registry.resolve::<P>(), signal.arg_types()[0]);
        if value != expected && value.find_converter(expected).is_none() {
            return Err(MetaError::ArgumentMismatch {
                index: 0,
                expected: expected.type_name(),
                found: value.type_name(),
            });
        }
        Ok(signal)
    }
}

impl<T> fmt::Debug for TypeFactory<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeFactory").field(&self.ty).finish()
    }
}
