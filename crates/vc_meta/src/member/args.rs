use alloc::vec::Vec;

use vc_utils::range_invoke;

use crate::descriptor::Type;
use crate::error::{MetaError, check_arity};
use crate::registry::TypeRegistry;
use crate::value::Value;
use crate::variant::Variant;

// -----------------------------------------------------------------------------
// Argument extraction

/// Moves argument `index` out of `arg` as an `A`.
///
/// An owned `A` is moved out, leaving `arg` undefined. A referenced `A` is
/// deep-copied. Any other type goes through its registered converter to `A`.
pub(crate) fn take_arg<A: Value>(arg: &mut Variant<'_>, index: usize) -> Result<A, MetaError> {
    if arg.is::<A>() {
        if let Some(value) = arg.take_value::<A>() {
            return Ok(value);
        }
        let mut copy = arg.try_clone()?;
        if let Some(value) = copy.take_value::<A>() {
            return Ok(value);
        }
    }
    arg.convert_into::<A>().ok_or(MetaError::ArgumentMismatch {
        index,
        expected: core::any::type_name::<A>(),
        found: arg.type_name(),
    })
}

/// Wraps a return value, mapping `()` to an undefined variant.
pub(crate) fn wrap_return<R: Value>(ty: Type, value: R) -> Variant<'static> {
    if ty.is_void() {
        Variant::new()
    } else {
        Variant::with_value(ty, value)
    }
}

// -----------------------------------------------------------------------------
// ArgList

/// A tuple of argument types, e.g. `(i32, f32)`.
///
/// Declares signal signatures and drives typed constructor lookup.
pub trait ArgList: 'static {
    /// Number of arguments.
    const ARITY: usize;

    /// Resolves each argument type.
    fn types(registry: &TypeRegistry) -> Vec<Type>;
}

macro_rules! impl_arg_list {
    ($($idx:tt: $ty:ident),*) => {
        impl<$($ty: Value),*> ArgList for ($($ty,)*) {
            const ARITY: usize = 0 $(+ { let _ = $idx; 1 })*;

            fn types(_registry: &TypeRegistry) -> Vec<Type> {
                alloc::vec![$(_registry.resolve::<$ty>()),*]
            }
        }
    };
}

range_invoke!(impl_arg_list);

// -----------------------------------------------------------------------------
// Callable shapes

/// Free functions and closures `Fn(P0, ..) -> R` with up to eight arguments.
///
/// `Marker` only tells the impls apart and is inferred.
pub trait StaticFunction<Marker>: Send + Sync + 'static {
    /// The return type.
    type Output: Value;
    /// Number of arguments.
    const ARITY: usize;

    /// Resolves each argument type.
    fn arg_types(registry: &TypeRegistry) -> Vec<Type>;

    /// Extracts the arguments and calls the function.
    fn call(&self, args: &mut [Variant<'_>]) -> Result<Self::Output, MetaError>;
}

/// Methods taking `&T` first: `Fn(&T, P0, ..) -> R`.
pub trait Method<T, Marker>: Send + Sync + 'static {
    /// The return type.
    type Output: Value;
    /// Number of arguments, receiver excluded.
    const ARITY: usize;

    /// Resolves each argument type.
    fn arg_types(registry: &TypeRegistry) -> Vec<Type>;

    /// Extracts the arguments and calls the method.
    fn call(&self, this: &T, args: &mut [Variant<'_>]) -> Result<Self::Output, MetaError>;
}

/// Methods taking `&mut T` first: `Fn(&mut T, P0, ..) -> R`.
pub trait MethodMut<T, Marker>: Send + Sync + 'static {
    /// The return type.
    type Output: Value;
    /// Number of arguments, receiver excluded.
    const ARITY: usize;

    /// Resolves each argument type.
    fn arg_types(registry: &TypeRegistry) -> Vec<Type>;

    /// Extracts the arguments and calls the method.
    fn call(&self, this: &mut T, args: &mut [Variant<'_>]) -> Result<Self::Output, MetaError>;
}

macro_rules! impl_callables {
    ($($idx:tt: $ty:ident),*) => {
        impl<F, R, $($ty),*> StaticFunction<fn($($ty),*) -> R> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: Value,
            $($ty: Value,)*
        {
            type Output = R;
            const ARITY: usize = 0 $(+ { let _ = $idx; 1 })*;

            fn arg_types(_registry: &TypeRegistry) -> Vec<Type> {
                alloc::vec![$(_registry.resolve::<$ty>()),*]
            }

            fn call(&self, _args: &mut [Variant<'_>]) -> Result<R, MetaError> {
                check_arity(<Self as StaticFunction<fn($($ty),*) -> R>>::ARITY, _args.len())?;
                Ok(self($(take_arg::<$ty>(&mut _args[$idx], $idx)?),*))
            }
        }

        impl<F, T, R, $($ty),*> Method<T, fn(&T, $($ty),*) -> R> for F
        where
            F: Fn(&T, $($ty),*) -> R + Send + Sync + 'static,
            T: Value,
            R: Value,
            $($ty: Value,)*
        {
            type Output = R;
            const ARITY: usize = 0 $(+ { let _ = $idx; 1 })*;

            fn arg_types(_registry: &TypeRegistry) -> Vec<Type> {
                alloc::vec![$(_registry.resolve::<$ty>()),*]
            }

            fn call(&self, this: &T, _args: &mut [Variant<'_>]) -> Result<R, MetaError> {
                check_arity(<Self as Method<T, fn(&T, $($ty),*) -> R>>::ARITY, _args.len())?;
                Ok(self(this, $(take_arg::<$ty>(&mut _args[$idx], $idx)?),*))
            }
        }

        impl<F, T, R, $($ty),*> MethodMut<T, fn(&mut T, $($ty),*) -> R> for F
        where
            F: Fn(&mut T, $($ty),*) -> R + Send + Sync + 'static,
            T: Value,
            R: Value,
            $($ty: Value,)*
        {
            type Output = R;
            const ARITY: usize = 0 $(+ { let _ = $idx; 1 })*;

            fn arg_types(_registry: &TypeRegistry) -> Vec<Type> {
                alloc::vec![$(_registry.resolve::<$ty>()),*]
            }

            fn call(&self, this: &mut T, _args: &mut [Variant<'_>]) -> Result<R, MetaError> {
                check_arity(<Self as MethodMut<T, fn(&mut T, $($ty),*) -> R>>::ARITY, _args.len())?;
                Ok(self(this, $(take_arg::<$ty>(&mut _args[$idx], $idx)?),*))
            }
        }
    };
}

range_invoke!(impl_callables);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;

    use super::{ArgList, StaticFunction, take_arg};
    use crate::{MetaError, StorageKind, TypeRegistry, Variant};

    #[test]
    fn owned_arguments_are_moved_out() {
        let registry = TypeRegistry::new();
        let mut arg = registry.value(String::from("moved"));

        let value: String = take_arg(&mut arg, 0).unwrap();
        assert_eq!(value, "moved");
        assert_eq!(arg.kind(), StorageKind::Undefined);
    }

    #[test]
    fn referenced_arguments_are_copied() {
        let registry = TypeRegistry::new();
        registry.factory::<String>().with_clone();
        let source = String::from("kept");
        let mut arg = registry.reference(&source);

        let value: String = take_arg(&mut arg, 0).unwrap();
        assert_eq!(value, "kept");
        assert_eq!(arg.kind(), StorageKind::RefConst);
    }

    #[test]
    fn mismatched_arguments_without_converter_fail() {
        let registry = TypeRegistry::new();
        let mut arg = registry.value(1u8);

        let err = take_arg::<String>(&mut arg, 3).unwrap_err();
        assert!(matches!(err, MetaError::ArgumentMismatch { index: 3, .. }));
    }

    #[test]
    fn static_functions_check_arity() {
        fn call<M, F: StaticFunction<M>>(f: &F, args: &mut [Variant<'_>]) -> Result<F::Output, MetaError> {
            f.call(args)
        }

        let registry = TypeRegistry::new();
        let add = |a: i32, b: i32| a + b;

        let mut args = vec![registry.value(2i32), registry.value(3i32)];
        assert_eq!(call(&add, &mut args), Ok(5));

        let mut short = vec![registry.value(2i32)];
        assert_eq!(
            call(&add, &mut short),
            Err(MetaError::ArityMismatch { expected: 2, found: 1 })
        );
    }

    #[test]
    fn arg_lists_resolve_in_order() {
        let registry = TypeRegistry::new();
        let types = <(i32, f32) as ArgList>::types(&registry);
        assert_eq!(types, vec![registry.resolve::<i32>(), registry.resolve::<f32>()]);
        assert_eq!(<() as ArgList>::ARITY, 0);
    }
}
