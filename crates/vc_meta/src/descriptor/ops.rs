#![expect(unsafe_code, reason = "Operation thunks read type-erased storage.")]

use core::fmt;

use vc_ptr::{OwningPtr, Ptr, PtrMut};

use crate::descriptor::Type;
use crate::error::MetaError;
use crate::value::Value;
use crate::variant::Variant;

// -----------------------------------------------------------------------------
// Operators

/// Unary operators a type can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `-x`
    Minus,
}

impl UnaryOperator {
    /// Number of unary operators.
    pub const COUNT: usize = 1;

    #[inline(always)]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Source form of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Minus => "-",
        }
    }
}

/// Binary arithmetic operators. Each one also exists in assignment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `a + b`
    Addition,
    /// `a - b`
    Subtraction,
    /// `a * b`
    Multiplication,
    /// `a / b`
    Division,
    /// `a % b`
    Modulo,
}

impl BinaryOperator {
    /// Number of binary operators.
    pub const COUNT: usize = 5;

    /// Every binary operator, in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Addition,
        Self::Subtraction,
        Self::Multiplication,
        Self::Division,
        Self::Modulo,
    ];

    #[inline(always)]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Source form of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "-",
            Self::Multiplication => "*",
            Self::Division => "/",
            Self::Modulo => "%",
        }
    }
}

/// An entry of the operation table, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DefaultConstruct,
    Clone,
    ToBool,
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    Assign(BinaryOperator),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultConstruct => f.write_str("default construction"),
            Self::Clone => f.write_str("cloning"),
            Self::ToBool => f.write_str("conversion to bool"),
            Self::Unary(op) => write!(f, "unary `{}`", op.symbol()),
            Self::Binary(op) => write!(f, "binary `{}`", op.symbol()),
            Self::Assign(op) => write!(f, "`{}=`", op.symbol()),
        }
    }
}

// -----------------------------------------------------------------------------
// Thunk types

// Every erased thunk below is only ever called with storage holding the
// type its descriptor was created for.

pub(crate) type DropFn = unsafe fn(OwningPtr<'_>);
pub(crate) type DefaultFn = fn(Type) -> Variant<'static>;
pub(crate) type CloneFn = unsafe fn(Type, Ptr<'_>) -> Variant<'static>;
pub(crate) type CloneFromFn = unsafe fn(PtrMut<'_>, Ptr<'_>);
pub(crate) type ScalarFn = unsafe fn(Ptr<'_>) -> super::Scalar;

pub(crate) type ToBoolFn = &'static (dyn Fn(Ptr<'_>) -> bool + Send + Sync);
pub(crate) type UnaryFn =
    &'static (dyn Fn(Type, Ptr<'_>) -> Result<Variant<'static>, MetaError> + Send + Sync);
pub(crate) type BinaryFn = &'static (dyn Fn(Type, Ptr<'_>, &Variant<'_>) -> Result<Variant<'static>, MetaError>
              + Send
              + Sync);
pub(crate) type AssignFn =
    &'static (dyn Fn(PtrMut<'_>, &Variant<'_>) -> Result<(), MetaError> + Send + Sync);

/// Optional operations of a type. `None` means unsupported.
#[derive(Clone, Copy, Default)]
pub(crate) struct OpTable {
    pub default: Option<DefaultFn>,
    pub clone: Option<CloneFn>,
    pub clone_from: Option<CloneFromFn>,
    pub to_bool: Option<ToBoolFn>,
    pub scalar: Option<ScalarFn>,
    pub unary: [Option<UnaryFn>; UnaryOperator::COUNT],
    pub binary: [Option<BinaryFn>; BinaryOperator::COUNT],
    pub assign: [Option<AssignFn>; BinaryOperator::COUNT],
}

/// Leaks a thunk so it can sit in an [`OpTable`].
///
/// Zero-sized closures do not allocate.
#[inline]
pub(crate) fn leak<F>(f: F) -> &'static F {
    alloc::boxed::Box::leak(alloc::boxed::Box::new(f))
}

// -----------------------------------------------------------------------------
// Generic thunks

pub(crate) unsafe fn drop_thunk<T>(ptr: OwningPtr<'_>) {
    ptr.debug_assert_aligned::<T>();
    // SAFETY: the pointee is a `T` about to be released.
    unsafe { ptr.drop_as::<T>() }
}

pub(crate) fn default_thunk<T: Value + Default>(ty: Type) -> Variant<'static> {
    Variant::with_value(ty, T::default())
}

pub(crate) unsafe fn clone_thunk<T: Value + Clone>(ty: Type, src: Ptr<'_>) -> Variant<'static> {
    // SAFETY: the pointee is a `T`.
    let value = unsafe { src.as_ref::<T>() }.clone();
    Variant::with_value(ty, value)
}

pub(crate) unsafe fn clone_from_thunk<T: Value + Clone>(mut dst: PtrMut<'_>, src: Ptr<'_>) {
    // SAFETY: both pointees are distinct `T`s.
    unsafe { dst.as_mut::<T>().clone_from(src.as_ref::<T>()) }
}

/// Reads a same-typed or convertible right-hand operand as `T`.
pub(crate) fn operand<T: Value + Clone>(lhs: Type, rhs: &Variant<'_>) -> Result<T, MetaError> {
    if let Some(value) = rhs.try_as_ref::<T>() {
        return Ok(value.clone());
    }
    rhs.convert_into::<T>().ok_or(MetaError::ArgumentMismatch {
        index: 0,
        expected: lhs.type_name(),
        found: rhs.type_name(),
    })
}
