#![expect(unsafe_code, reason = "Converters read type-erased source storage.")]

use alloc::boxed::Box;
use core::fmt;

use vc_ptr::Ptr;

use crate::descriptor::Type;
use crate::error::MetaError;
use crate::value::Value;
use crate::variant::Variant;

type ConvertFn = dyn for<'p> Fn(Ptr<'p>) -> Variant<'static> + Send + Sync;

/// A registered conversion from the owner type to another type.
pub struct ConverterEntry {
    from: Type,
    to: Type,
    thunk: Box<ConvertFn>,
}

impl ConverterEntry {
    pub(crate) fn new<S, D>(from: Type, to: Type, f: impl Fn(&S) -> D + Send + Sync + 'static) -> Self
    where
        S: Value,
        D: Value,
    {
        Self {
            from,
            to,
            thunk: Box::new(move |ptr: Ptr<'_>| {
                // SAFETY: `convert_ptr` callers pass storage of `S`.
                let value = f(unsafe { ptr.as_ref::<S>() });
                Variant::with_value(to, value)
            }),
        }
    }

    /// Source type.
    #[inline]
    pub fn from(&self) -> Type {
        self.from
    }

    /// Target type.
    #[inline]
    pub fn to(&self) -> Type {
        self.to
    }

    /// Converts the content of `value`, which must hold the source type.
    ///
    /// # Errors
    ///
    /// [`MetaError::UndefinedValue`] or [`MetaError::BadCast`].
    pub fn convert(&self, value: &Variant<'_>) -> Result<Variant<'static>, MetaError> {
        let (Some(ty), Some(ptr)) = (value.ty(), value.data()) else {
            return Err(MetaError::UndefinedValue);
        };
        if ty != self.from {
            return Err(MetaError::BadCast {
                from: ty.type_name(),
                to: self.from.type_name(),
            });
        }
        // SAFETY: the source type was just checked.
        Ok(unsafe { self.convert_ptr(ptr) })
    }

    /// # Safety
    ///
    /// `ptr` must point to a value of the source type.
    #[inline]
    pub(crate) unsafe fn convert_ptr(&self, ptr: Ptr<'_>) -> Variant<'static> {
        (self.thunk)(ptr)
    }
}

impl fmt::Debug for ConverterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterEntry")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}
