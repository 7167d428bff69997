//! Registration of the primitive types and `String`.

use alloc::string::{String, ToString};
use core::any::TypeId;
use core::fmt::Display;

use crate::descriptor::{BinaryOperator, Numeric, Scalar};
use crate::error::MetaError;
use crate::registry::TypeRegistry;

/// Registers `()`, `bool`, `char`, `String` and the primitive numbers under
/// their Rust names.
///
/// Numbers get the numeric operation set and an `as` converter to every
/// other number. `bool` converts to and from every number, and numbers
/// convert to `String`. `String` supports `+` and `+=`.
///
/// # Errors
///
/// [`MetaError::AlreadyRegistered`] if one of these types already has a name.
///
/// # Examples
///
/// ```
/// use vc_meta::{TypeRegistry, register_builtins};
///
/// let registry = TypeRegistry::new();
/// register_builtins(&registry).unwrap();
///
/// let product = &registry.value(42i8) * &registry.value(0.5f32);
/// assert!(product.equals(&21.0f32));
/// ```
pub fn register_builtins(registry: &TypeRegistry) -> Result<(), MetaError> {
    registry.register::<()>("()")?.with_default();
    registry
        .register::<bool>("bool")?
        .with_default()
        .with_clone()
        .with_to_bool(|v: &bool| *v);
    registry.register::<char>("char")?.with_default().with_clone();
    registry
        .register::<String>("String")?
        .with_default()
        .with_clone()
        .with_to_bool(|v: &String| !v.is_empty())
        .with_binary_operator(BinaryOperator::Addition, |a: &String, b: &String| {
            let mut joined = a.clone();
            joined.push_str(b);
            joined
        })
        .with_assign_operator(BinaryOperator::Addition, |a: &mut String, b: &String| {
            a.push_str(b);
        });

    macro_rules! numbers {
        ($($ty:ident),*) => {
            $( register_number::<$ty>(registry, stringify!($ty))?; )*
            $( cast_to_numbers::<$ty>(registry)?; )*
        };
    }
    numbers!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
    Ok(())
}

fn register_number<T: Numeric + Display>(
    registry: &TypeRegistry,
    name: &str,
) -> Result<(), MetaError> {
    registry
        .register::<T>(name)?
        .with_numeric()
        .converter_with(|v: &T| -> bool { v.is_nonzero() })?
        .converter_with(|v: &T| -> String { v.to_string() })?;
    registry
        .factory::<bool>()
        .converter_with(|v: &bool| -> T { T::from_scalar(Scalar::Int(i128::from(*v))) })?;
    Ok(())
}

fn cast_to_numbers<S: Numeric>(registry: &TypeRegistry) -> Result<(), MetaError> {
    fn cast<S: Numeric, D: Numeric>(registry: &TypeRegistry) -> Result<(), MetaError> {
        if TypeId::of::<S>() != TypeId::of::<D>() {
            registry
                .factory::<S>()
                .converter_with(|v: &S| -> D { D::from_scalar(v.to_scalar()) })?;
        }
        Ok(())
    }

    macro_rules! targets {
        ($($ty:ident),*) => { $( cast::<S, $ty>(registry)?; )* };
    }
    targets!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
    Ok(())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::register_builtins;
    use crate::{MetaError, TypeRegistry};

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        register_builtins(&registry).unwrap();
        registry
    }

    #[test]
    fn builtins_are_named() {
        let registry = registry();
        for name in ["bool", "char", "String", "i8", "u64", "usize", "f32", "f64"] {
            assert!(registry.find_type(name).is_some(), "{name} missing");
        }
        assert!(matches!(
            register_builtins(&registry),
            Err(MetaError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn numbers_cast_with_as_semantics() {
        let registry = registry();
        let u8_ty = registry.resolve::<u8>();

        assert!(registry.value(300i32).convert(u8_ty).equals(&44u8));
        assert!(registry.value(-1.75f64).convert(registry.resolve::<i16>()).equals(&-1i16));
        assert_eq!(registry.value(7u8).convert_into::<bool>(), Some(true));
        assert_eq!(registry.value(true).convert_into::<f64>(), Some(1.0));
        assert_eq!(registry.value(12u16).convert_into::<String>().as_deref(), Some("12"));
    }

    #[test]
    fn strings_concatenate() {
        let registry = registry();
        let mut text = registry.value(String::from("signal"));
        text += &registry.value(String::from("/slot"));

        assert!(text.equals(&String::from("signal/slot")));
        assert_eq!(registry.value(String::new()).to_bool(), Ok(false));
    }
}
