use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

// -----------------------------------------------------------------------------
// Value

/// Types that can live inside a [`Variant`](crate::Variant).
///
/// Blanket-implemented for every `'static + Send + Sync` type, which keeps
/// variants and signal payloads shareable across threads.
pub trait Value: Any + Send + Sync {}

impl<T: Any + Send + Sync> Value for T {}

// -----------------------------------------------------------------------------
// ObjectId

/// Address-based identity of an object, used for signal senders and receivers.
///
/// Two ids compare equal when they were taken from the same address. The id
/// does not keep the object alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(usize);

impl ObjectId {
    /// The id of "no object".
    pub const NONE: Self = Self(0);

    /// The id of `object`.
    #[inline]
    pub fn of<T: ?Sized>(object: &T) -> Self {
        Self(core::ptr::from_ref(object).cast::<u8>() as usize)
    }

    /// Wraps a raw address.
    #[inline(always)]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// The raw address.
    #[inline(always)]
    pub const fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}

// -----------------------------------------------------------------------------
// Pointer-like values

/// Values that support offsetting by an element count.
///
/// Registered through [`TypeFactory::with_pointer_arithmetic`]; such types
/// only accept `usize` right-hand operands for `+`, `-`, `+=` and `-=`.
///
/// [`TypeFactory::with_pointer_arithmetic`]: crate::TypeFactory::with_pointer_arithmetic
pub trait PointerLike: Value + Copy {
    /// Moves forward by `count` elements.
    fn offset_add(self, count: usize) -> Self;
    /// Moves backward by `count` elements.
    fn offset_sub(self, count: usize) -> Self;
}

/// An address of a `T` that can be stored in a variant.
///
/// Only the address is kept; dereferencing is `unsafe` and up to the caller.
pub struct RawPtr<T> {
    addr: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RawPtr<T> {
    /// Null address.
    pub const NULL: Self = Self::from_addr(0);

    /// The address of `value`.
    #[inline]
    pub fn from_ref(value: &T) -> Self {
        Self::from_addr(core::ptr::from_ref(value) as usize)
    }

    /// Wraps a raw address.
    #[inline(always)]
    pub const fn from_addr(addr: usize) -> Self {
        Self {
            addr,
            _marker: PhantomData,
        }
    }

    /// The raw address.
    #[inline(always)]
    pub const fn addr(self) -> usize {
        self.addr
    }

    /// Returns `true` for the null address.
    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.addr == 0
    }

    /// The address as a raw pointer.
    #[inline(always)]
    pub const fn as_ptr(self) -> *const T {
        core::ptr::without_provenance(self.addr)
    }
}

impl<T: 'static> PointerLike for RawPtr<T> {
    #[inline]
    fn offset_add(self, count: usize) -> Self {
        Self::from_addr(self.addr.wrapping_add(count.wrapping_mul(size_of::<T>())))
    }

    #[inline]
    fn offset_sub(self, count: usize) -> Self {
        Self::from_addr(self.addr.wrapping_sub(count.wrapping_mul(size_of::<T>())))
    }
}

impl<T> Clone for RawPtr<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawPtr<T> {}

impl<T> PartialEq for RawPtr<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<T> Eq for RawPtr<T> {}

impl<T> Default for RawPtr<T> {
    #[inline]
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> fmt::Debug for RawPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPtr({:#x})", self.addr)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{ObjectId, PointerLike, RawPtr};

    #[test]
    fn raw_ptr_offsets_in_elements() {
        let data = [1u32, 2, 3, 4];
        let first = RawPtr::from_ref(&data[0]);
        let third = first.offset_add(2);

        assert_eq!(third, RawPtr::from_ref(&data[2]));
        assert_eq!(third.offset_sub(2), first);
        assert!(RawPtr::<u32>::NULL.is_null());
    }

    #[test]
    fn object_id_is_address_identity() {
        let a = 1u8;
        let b = 1u8;
        assert_eq!(ObjectId::of(&a), ObjectId::of(&a));
        assert_ne!(ObjectId::of(&a), ObjectId::of(&b));
        assert_ne!(ObjectId::of(&a), ObjectId::NONE);
    }
}
