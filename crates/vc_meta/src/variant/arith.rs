use core::ops;

use super::Variant;
use crate::descriptor::{BinaryOperator, Operation, UnaryOperator};
use crate::error::MetaError;

impl Variant<'_> {
    /// Applies a unary operator registered on the content's type.
    ///
    /// # Errors
    ///
    /// [`MetaError::UndefinedValue`] or [`MetaError::UnsupportedOperation`].
    pub fn try_unary(&self, op: UnaryOperator) -> Result<Variant<'static>, MetaError> {
        let (Some(ty), Some(ptr)) = (self.ty, self.data()) else {
            return Err(MetaError::UndefinedValue);
        };
        let f = ty.ops().unary[op.index()].ok_or(MetaError::UnsupportedOperation {
            op: Operation::Unary(op),
            type_name: ty.type_name(),
        })?;
        f(ty, ptr)
    }

    /// Applies a binary operator registered on the left operand's type.
    ///
    /// Mixed numeric operands follow the bridging rules of
    /// [`Numeric`](crate::Numeric); pointer-like types only take `usize`.
    ///
    /// # Errors
    ///
    /// [`MetaError::UndefinedValue`], [`MetaError::UnsupportedOperation`],
    /// [`MetaError::ArgumentMismatch`] or [`MetaError::DivisionByZero`].
    pub fn try_binary(
        &self,
        op: BinaryOperator,
        rhs: &Variant<'_>,
    ) -> Result<Variant<'static>, MetaError> {
        let (Some(ty), Some(ptr)) = (self.ty, self.data()) else {
            return Err(MetaError::UndefinedValue);
        };
        let f = ty.ops().binary[op.index()].ok_or(MetaError::UnsupportedOperation {
            op: Operation::Binary(op),
            type_name: ty.type_name(),
        })?;
        f(ty, ptr, rhs)
    }

    /// Applies an assignment operator in place. The result keeps the left type.
    ///
    /// # Errors
    ///
    /// As [`try_binary`](Self::try_binary), plus [`MetaError::ConstViolation`].
    pub fn try_assign_op(&mut self, op: BinaryOperator, rhs: &Variant<'_>) -> Result<(), MetaError> {
        let ty = self.ty.ok_or(MetaError::UndefinedValue)?;
        let f = ty.ops().assign[op.index()].ok_or(MetaError::UnsupportedOperation {
            op: Operation::Assign(op),
            type_name: ty.type_name(),
        })?;
        f(self.data_mut()?, rhs)
    }

    /// `-self`
    #[inline]
    pub fn try_neg(&self) -> Result<Variant<'static>, MetaError> {
        self.try_unary(UnaryOperator::Minus)
    }
}

macro_rules! binary_methods {
    ($($op:ident: $try_op:ident, $try_assign:ident;)*) => {
        impl Variant<'_> {$(
            #[doc = concat!("Binary [`", stringify!($op), "`](BinaryOperator::", stringify!($op), ").")]
            #[inline]
            pub fn $try_op(&self, rhs: &Variant<'_>) -> Result<Variant<'static>, MetaError> {
                self.try_binary(BinaryOperator::$op, rhs)
            }

            #[doc = concat!("Assigning [`", stringify!($op), "`](BinaryOperator::", stringify!($op), ").")]
            #[inline]
            pub fn $try_assign(&mut self, rhs: &Variant<'_>) -> Result<(), MetaError> {
                self.try_assign_op(BinaryOperator::$op, rhs)
            }
        )*}
    };
}

binary_methods! {
    Addition: try_add, try_add_assign;
    Subtraction: try_sub, try_sub_assign;
    Multiplication: try_mul, try_mul_assign;
    Division: try_div, try_div_assign;
    Modulo: try_rem, try_rem_assign;
}

// The operator traits cannot report errors; a failure is a hard error.

macro_rules! operator_impls {
    ($($trait:ident::$method:ident => $try_op:ident, $assign_trait:ident::$assign_method:ident => $try_assign:ident;)*) => {$(
        impl<'b> ops::$trait<&Variant<'b>> for &Variant<'_> {
            type Output = Variant<'static>;

            #[track_caller]
            fn $method(self, rhs: &Variant<'b>) -> Variant<'static> {
                self.$try_op(rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }

        impl<'b> ops::$assign_trait<&Variant<'b>> for Variant<'_> {
            #[track_caller]
            fn $assign_method(&mut self, rhs: &Variant<'b>) {
                self.$try_assign(rhs).unwrap_or_else(|err| panic!("{err}"));
            }
        }
    )*};
}

operator_impls! {
    Add::add => try_add, AddAssign::add_assign => try_add_assign;
    Sub::sub => try_sub, SubAssign::sub_assign => try_sub_assign;
    Mul::mul => try_mul, MulAssign::mul_assign => try_mul_assign;
    Div::div => try_div, DivAssign::div_assign => try_div_assign;
    Rem::rem => try_rem, RemAssign::rem_assign => try_rem_assign;
}

impl ops::Neg for &Variant<'_> {
    type Output = Variant<'static>;

    #[track_caller]
    fn neg(self) -> Variant<'static> {
        self.try_neg().unwrap_or_else(|err| panic!("{err}"))
    }
}
