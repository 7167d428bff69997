#![expect(unsafe_code, reason = "Arithmetic thunks read type-erased storage.")]

use vc_ptr::{Ptr, PtrMut};

use super::ops::{AssignFn, BinaryFn, BinaryOperator, ToBoolFn, UnaryFn, leak};
use super::Type;
use crate::error::MetaError;
use crate::value::{PointerLike, Value};
use crate::variant::Variant;

// -----------------------------------------------------------------------------
// Scalar

/// A numeric value widened to one of three precisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i128),
    Float(f32),
    Double(f64),
}

// -----------------------------------------------------------------------------
// Numeric

mod sealed {
    pub trait Sealed {}
}

/// Built-in numeric types with mixed-type arithmetic.
///
/// Integer arithmetic wraps. Integer division or modulo by zero is an error.
/// Floating-point modulo truncates both operands to `i64` first.
pub trait Numeric: Value + Copy + Default + PartialEq + sealed::Sealed {
    /// Widens the value.
    fn to_scalar(self) -> Scalar;
    /// Narrows a scalar with `as` semantics.
    fn from_scalar(scalar: Scalar) -> Self;
    /// Applies a binary operator to two values of the same type.
    fn apply(self, op: BinaryOperator, rhs: Self) -> Result<Self, MetaError>;
    /// `-self`, wrapping for integers.
    fn negate(self) -> Self;
    /// `self != 0`.
    fn is_nonzero(self) -> bool;
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Numeric for $ty {
            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::Int(self as i128)
            }

            #[inline]
            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Int(v) => v as $ty,
                    Scalar::Float(v) => v as $ty,
                    Scalar::Double(v) => v as $ty,
                }
            }

            fn apply(self, op: BinaryOperator, rhs: Self) -> Result<Self, MetaError> {
                Ok(match op {
                    BinaryOperator::Addition => self.wrapping_add(rhs),
                    BinaryOperator::Subtraction => self.wrapping_sub(rhs),
                    BinaryOperator::Multiplication => self.wrapping_mul(rhs),
                    BinaryOperator::Division if rhs == 0 => return Err(MetaError::DivisionByZero),
                    BinaryOperator::Division => self.wrapping_div(rhs),
                    BinaryOperator::Modulo if rhs == 0 => return Err(MetaError::DivisionByZero),
                    BinaryOperator::Modulo => self.wrapping_rem(rhs),
                })
            }

            #[inline]
            fn negate(self) -> Self {
                self.wrapping_neg()
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Numeric for $ty {
            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }

            #[inline]
            fn from_scalar(scalar: Scalar) -> Self {
                match scalar {
                    Scalar::Int(v) => v as $ty,
                    Scalar::Float(v) => v as $ty,
                    Scalar::Double(v) => v as $ty,
                }
            }

            fn apply(self, op: BinaryOperator, rhs: Self) -> Result<Self, MetaError> {
                Ok(match op {
                    BinaryOperator::Addition => self + rhs,
                    BinaryOperator::Subtraction => self - rhs,
                    BinaryOperator::Multiplication => self * rhs,
                    BinaryOperator::Division => self / rhs,
                    BinaryOperator::Modulo => {
                        let (lhs, rhs) = (self as i64, rhs as i64);
                        if rhs == 0 {
                            return Err(MetaError::DivisionByZero);
                        }
                        lhs.wrapping_rem(rhs) as $ty
                    }
                })
            }

            #[inline]
            fn negate(self) -> Self {
                -self
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != 0.0
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_float!(f32 => Float, f64 => Double);

// -----------------------------------------------------------------------------
// Mixed-type bridging

/// Outcome of an arithmetic operation on mixed operands.
enum Bridged<T> {
    /// Computed in the left operand's type.
    Native(T),
    /// Integral left, `f32` right: computed in `f32`.
    Float(f32),
    /// Integral left, `f64` right: computed in `f64`.
    Double(f64),
}

/// Same types use the native operator. Integral left with a floating right
/// computes at the right operand's precision. Anything else converts the
/// right operand to the left type first.
fn bridge<T: Numeric>(
    lhs_ty: Type,
    lhs: T,
    op: BinaryOperator,
    rhs: &Variant<'_>,
) -> Result<Bridged<T>, MetaError> {
    if let Some(&rhs) = rhs.try_as_ref::<T>() {
        return lhs.apply(op, rhs).map(Bridged::Native);
    }
    let rhs_ty = rhs.ty().ok_or(MetaError::UndefinedValue)?;
    let scalar = rhs.scalar();

    if let Some(scalar) = scalar
        && lhs_ty.is_integral()
        && rhs_ty.is_floating()
    {
        let widened = lhs.to_scalar();
        return if rhs_ty.is_double() {
            f64::from_scalar(widened)
                .apply(op, f64::from_scalar(scalar))
                .map(Bridged::Double)
        } else {
            f32::from_scalar(widened)
                .apply(op, f32::from_scalar(scalar))
                .map(Bridged::Float)
        };
    }

    let rhs = match scalar {
        Some(scalar) => T::from_scalar(scalar),
        None => rhs.convert_into::<T>().ok_or(MetaError::ArgumentMismatch {
            index: 0,
            expected: lhs_ty.type_name(),
            found: rhs_ty.type_name(),
        })?,
    };
    lhs.apply(op, rhs).map(Bridged::Native)
}

pub(crate) unsafe fn scalar_thunk<T: Numeric>(ptr: Ptr<'_>) -> Scalar {
    // SAFETY: the pointee is a `T`.
    unsafe { ptr.as_ref::<T>() }.to_scalar()
}

pub(crate) fn numeric_to_bool<T: Numeric>() -> ToBoolFn {
    // SAFETY: only called on storage holding a `T`.
    leak(|ptr: Ptr<'_>| unsafe { ptr.as_ref::<T>() }.is_nonzero())
}

pub(crate) fn numeric_negate<T: Numeric>() -> UnaryFn {
    leak(|ty: Type, ptr: Ptr<'_>| -> Result<Variant<'static>, MetaError> {
        // SAFETY: only called on storage holding a `T`.
        let value = unsafe { *ptr.as_ref::<T>() };
        Ok(Variant::with_value(ty, value.negate()))
    })
}

pub(crate) fn numeric_binary<T: Numeric>(op: BinaryOperator) -> BinaryFn {
    leak(move |ty: Type, lhs: Ptr<'_>, rhs: &Variant<'_>| -> Result<Variant<'static>, MetaError> {
        // SAFETY: only called on storage holding a `T`.
        let lhs = unsafe { *lhs.as_ref::<T>() };
        Ok(match bridge(ty, lhs, op, rhs)? {
            Bridged::Native(v) => Variant::with_value(ty, v),
            // The bridged branches only run when `rhs` is `f32`/`f64`.
            Bridged::Float(v) => Variant::with_value(rhs.ty().ok_or(MetaError::UndefinedValue)?, v),
            Bridged::Double(v) => Variant::with_value(rhs.ty().ok_or(MetaError::UndefinedValue)?, v),
        })
    })
}

pub(crate) fn numeric_assign<T: Numeric>(ty: Type, op: BinaryOperator) -> AssignFn {
    leak(move |mut lhs: PtrMut<'_>, rhs: &Variant<'_>| -> Result<(), MetaError> {
        // SAFETY: only called on storage holding a `T`.
        let slot = unsafe { lhs.as_mut::<T>() };
        *slot = match bridge(ty, *slot, op, rhs)? {
            Bridged::Native(v) => v,
            Bridged::Float(v) => T::from_scalar(Scalar::Float(v)),
            Bridged::Double(v) => T::from_scalar(Scalar::Double(v)),
        };
        Ok(())
    })
}

// -----------------------------------------------------------------------------
// Pointer arithmetic

fn offset_operand(rhs: &Variant<'_>) -> Result<usize, MetaError> {
    rhs.try_as_ref::<usize>()
        .copied()
        .ok_or(MetaError::ArgumentMismatch {
            index: 0,
            expected: core::any::type_name::<usize>(),
            found: rhs.type_name(),
        })
}

fn offset<T: PointerLike>(value: T, op: BinaryOperator, count: usize) -> Option<T> {
    match op {
        BinaryOperator::Addition => Some(value.offset_add(count)),
        BinaryOperator::Subtraction => Some(value.offset_sub(count)),
        _ => None,
    }
}

pub(crate) fn pointer_binary<T: PointerLike>(op: BinaryOperator) -> BinaryFn {
    leak(move |ty: Type, lhs: Ptr<'_>, rhs: &Variant<'_>| -> Result<Variant<'static>, MetaError> {
        let count = offset_operand(rhs)?;
        // SAFETY: only called on storage holding a `T`.
        let value = unsafe { *lhs.as_ref::<T>() };
        offset(value, op, count)
            .map(|v| Variant::with_value(ty, v))
            .ok_or(MetaError::UnsupportedOperation {
                op: super::Operation::Binary(op),
                type_name: ty.type_name(),
            })
    })
}

pub(crate) fn pointer_assign<T: PointerLike>(ty: Type, op: BinaryOperator) -> AssignFn {
    leak(move |mut lhs: PtrMut<'_>, rhs: &Variant<'_>| -> Result<(), MetaError> {
        let count = offset_operand(rhs)?;
        // SAFETY: only called on storage holding a `T`.
        let slot = unsafe { lhs.as_mut::<T>() };
        *slot = offset(*slot, op, count).ok_or(MetaError::UnsupportedOperation {
            op: super::Operation::Assign(op),
            type_name: ty.type_name(),
        })?;
        Ok(())
    })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{BinaryOperator, Numeric, Scalar};
    use crate::MetaError;

    #[test]
    fn integer_arithmetic_wraps_and_rejects_zero_divisors() {
        assert_eq!(i8::MAX.apply(BinaryOperator::Addition, 1), Ok(i8::MIN));
        assert_eq!(7u32.apply(BinaryOperator::Modulo, 4), Ok(3));
        assert_eq!(
            7u32.apply(BinaryOperator::Division, 0),
            Err(MetaError::DivisionByZero)
        );
    }

    #[test]
    fn float_modulo_truncates_to_integers() {
        assert_eq!(3.0f64.apply(BinaryOperator::Modulo, 2.0), Ok(1.0));
        assert_eq!(2.5f32.apply(BinaryOperator::Modulo, 30.0), Ok(2.0));
    }

    #[test]
    fn scalars_narrow_with_as_semantics() {
        assert_eq!(i64::from_scalar(Scalar::Double(121.5)), 121);
        assert_eq!(u8::from_scalar(Scalar::Int(300)), 44);
        assert_eq!(f32::from_scalar(Scalar::Int(8)), 8.0);
    }
}
