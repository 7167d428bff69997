use thiserror::Error;
use vc_utils::hash::HashedName;

use crate::descriptor::Operation;

// -----------------------------------------------------------------------------
// Error

/// Errors raised by registration, invocation and variant operations.
///
/// Registration conflicts (`AlreadyRegistered`, `Duplicate*`) are programmer
/// errors and are expected to be propagated with `?` up to the setup code.
/// Stale slot or connection handles never produce an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MetaError {
    #[error("type `{type_name}` is already registered")]
    AlreadyRegistered { type_name: &'static str },

    #[error("`{base}` is already registered as a base of `{type_name}`")]
    DuplicateBase {
        type_name: &'static str,
        base: &'static str,
    },

    #[error("`{type_name}` already has a constructor with the same argument types")]
    DuplicateConstructor { type_name: &'static str },

    #[error("`{type_name}` already has a converter to `{target}`")]
    DuplicateConverter {
        type_name: &'static str,
        target: &'static str,
    },

    #[error("`{type_name}` already has a function named {name}")]
    DuplicateFunction {
        type_name: &'static str,
        name: HashedName,
    },

    #[error("`{type_name}` already has a property named {name}")]
    DuplicateProperty {
        type_name: &'static str,
        name: HashedName,
    },

    #[error("`{type_name}` already has a signal named {name} or with the same identity")]
    DuplicateSignal {
        type_name: &'static str,
        name: HashedName,
    },

    #[error("expected {expected} arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("argument {index} expects `{expected}`, found `{found}` with no converter")]
    ArgumentMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{type_name}` does not support {op}")]
    UnsupportedOperation {
        op: Operation,
        type_name: &'static str,
    },

    #[error("cannot cast `{from}` to `{to}`")]
    BadCast {
        from: &'static str,
        to: &'static str,
    },

    #[error("the variant holds no value")]
    UndefinedValue,

    #[error("cannot mutate `{type_name}` through a constant reference")]
    ConstViolation { type_name: &'static str },

    #[error("member {name} requires an instance")]
    InstanceRequired { name: HashedName },

    #[error("property {name} has no setter")]
    ReadOnlyProperty { name: HashedName },

    #[error("`{type_name}` has no signal named {name}")]
    UnknownSignal {
        type_name: &'static str,
        name: HashedName,
    },

    #[error("division by zero")]
    DivisionByZero,
}

/// Checks an argument count against the declared one.
#[inline]
pub(crate) fn check_arity(expected: usize, found: usize) -> Result<(), MetaError> {
    if expected == found {
        Ok(())
    } else {
        Err(MetaError::ArityMismatch { expected, found })
    }
}
