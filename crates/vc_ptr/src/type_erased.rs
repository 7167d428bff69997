use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Shared helpers

macro_rules! impl_erased {
    ($ptr:ident) => {
        impl $ptr<'_> {
            /// Returns `true` if the address is aligned for `T`.
            #[inline]
            pub fn is_aligned<T>(&self) -> bool {
                self.0.as_ptr().cast::<T>().is_aligned()
            }

            /// Asserts alignment for `T` in debug builds only.
            #[cfg_attr(debug_assertions, track_caller)]
            #[cfg_attr(not(debug_assertions), inline(always))]
            pub fn debug_assert_aligned<T>(&self) {
                debug_assert!(
                    self.is_aligned::<T>(),
                    "erased pointer {:p} is not aligned to {} for `{}`",
                    self.0,
                    align_of::<T>(),
                    core::any::type_name::<T>(),
                );
            }

            /// The address of the pointee, used as an identity token.
            #[inline(always)]
            pub fn addr(&self) -> usize {
                self.0.as_ptr() as usize
            }
        }

        impl From<$ptr<'_>> for NonNull<u8> {
            #[inline(always)]
            fn from(ptr: $ptr<'_>) -> Self {
                ptr.0
            }
        }

        impl fmt::Pointer for $ptr<'_> {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Pointer::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $ptr<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:p})", stringify!($ptr), self.0)
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Ptr

/// A shared, type-erased pointer. Behaves like `&'a T` for an unknown `T`.
///
/// The pointee must stay valid and unchanged while the pointer lives.
///
/// # Examples
///
/// ```
/// # use vc_ptr::Ptr;
/// let x = 8i32;
/// let ptr = Ptr::from_ref(&x);
///
/// ptr.debug_assert_aligned::<i32>();
/// assert_eq!(unsafe { *ptr.as_ref::<i32>() }, 8);
/// ```
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Ptr<'a>(NonNull<u8>, PhantomData<&'a u8>);

impl_erased!(Ptr);

impl<'a> Ptr<'a> {
    /// Creates a `Ptr` from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` points to a valid value for the whole of `'a`.
    /// - The value is not mutated while the `Ptr` is alive.
    #[inline(always)]
    pub const unsafe fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr, PhantomData)
    }

    /// Creates a `Ptr` borrowing `val`.
    #[inline(always)]
    pub const fn from_ref<T: ?Sized>(val: &'a T) -> Self {
        Self(NonNull::from_ref(val).cast(), PhantomData)
    }

    /// Returns the raw pointer, erasing the lifetime.
    #[inline(always)]
    pub const fn as_ptr(self) -> *const u8 {
        self.0.as_ptr()
    }

    /// Reinterprets the pointee as `&'a T`.
    ///
    /// # Safety
    ///
    /// - The pointee is a valid `T`.
    /// - The pointer is aligned for `T`.
    #[inline(always)]
    pub const unsafe fn as_ref<T>(self) -> &'a T {
        // SAFETY: guaranteed by the caller.
        unsafe { &*self.0.as_ptr().cast::<T>() }
    }
}

impl<'a, T: ?Sized> From<&'a T> for Ptr<'a> {
    #[inline]
    fn from(val: &'a T) -> Self {
        Self::from_ref(val)
    }
}

// -----------------------------------------------------------------------------
// PtrMut

/// An exclusive, type-erased pointer. Behaves like `&'a mut T` for an unknown `T`.
///
/// Not `Copy`: use [`reborrow`](Self::reborrow) to hand out a shorter-lived copy.
///
/// # Examples
///
/// ```
/// # use vc_ptr::PtrMut;
/// let mut x = 8i32;
/// let mut ptr = PtrMut::from_mut(&mut x);
///
/// unsafe { *ptr.as_mut::<i32>() += 2 };
/// assert_eq!(x, 10);
/// ```
#[repr(transparent)]
pub struct PtrMut<'a>(NonNull<u8>, PhantomData<&'a mut u8>);

impl_erased!(PtrMut);

impl<'a> PtrMut<'a> {
    /// Creates a `PtrMut` from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` points to a valid value for the whole of `'a`.
    /// - No other pointer accesses the value while the `PtrMut` is alive.
    #[inline(always)]
    pub const unsafe fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr, PhantomData)
    }

    /// Creates a `PtrMut` exclusively borrowing `val`.
    #[inline(always)]
    pub const fn from_mut<T: ?Sized>(val: &'a mut T) -> Self {
        Self(NonNull::from_mut(val).cast(), PhantomData)
    }

    /// Returns the raw pointer, erasing the lifetime.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Shared view with a lifetime bound to `&self`.
    #[inline(always)]
    pub const fn borrow(&self) -> Ptr<'_> {
        Ptr(self.0, PhantomData)
    }

    /// Exclusive view with a lifetime bound to `&mut self`.
    #[inline(always)]
    pub const fn reborrow(&mut self) -> PtrMut<'_> {
        PtrMut(self.0, PhantomData)
    }

    /// Reinterprets the pointee as `&mut T` for the duration of the borrow.
    ///
    /// # Safety
    ///
    /// - The pointee is a valid `T`.
    /// - The pointer is aligned for `T`.
    #[inline(always)]
    pub const unsafe fn as_mut<T>(&mut self) -> &mut T {
        // SAFETY: guaranteed by the caller.
        unsafe { &mut *self.0.as_ptr().cast::<T>() }
    }

    /// Consumes the pointer, producing `&'a mut T`.
    ///
    /// # Safety
    ///
    /// Same as [`as_mut`](Self::as_mut).
    #[inline(always)]
    pub const unsafe fn consume<T>(self) -> &'a mut T {
        // SAFETY: guaranteed by the caller.
        unsafe { &mut *self.0.as_ptr().cast::<T>() }
    }
}

impl<'a, T: ?Sized> From<&'a mut T> for PtrMut<'a> {
    #[inline]
    fn from(val: &'a mut T) -> Self {
        Self::from_mut(val)
    }
}

// -----------------------------------------------------------------------------
// OwningPtr

/// A pointer to a value whose ownership is being handed over.
///
/// The pointee must be consumed exactly once by [`read`](Self::read) or
/// [`drop_as`](Self::drop_as). The backing memory is not freed by either.
///
/// # Examples
///
/// ```
/// # use vc_ptr::OwningPtr;
/// # use core::mem::ManuallyDrop;
/// let mut s = ManuallyDrop::new(String::from("moved"));
/// let ptr = OwningPtr::from_value(&mut s);
///
/// let s: String = unsafe { ptr.read() };
/// assert_eq!(s, "moved");
/// ```
#[repr(transparent)]
pub struct OwningPtr<'a>(NonNull<u8>, PhantomData<&'a mut u8>);

impl_erased!(OwningPtr);

impl<'a> OwningPtr<'a> {
    /// Creates an `OwningPtr` from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` points to a valid, initialized value.
    /// - Nobody else will drop or read that value afterwards.
    #[inline(always)]
    pub const unsafe fn new(ptr: NonNull<u8>) -> Self {
        Self(ptr, PhantomData)
    }

    /// Takes a value out of a [`ManuallyDrop`] slot.
    ///
    /// [`ManuallyDrop`]: core::mem::ManuallyDrop
    #[inline(always)]
    pub const fn from_value<T>(val: &'a mut core::mem::ManuallyDrop<T>) -> Self {
        Self(NonNull::from_mut(val).cast(), PhantomData)
    }

    /// Returns the raw pointer, erasing the lifetime.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Shared view with a lifetime bound to `&self`.
    #[inline(always)]
    pub const fn borrow(&self) -> Ptr<'_> {
        Ptr(self.0, PhantomData)
    }

    /// Moves the value out.
    ///
    /// # Safety
    ///
    /// - The pointee is a valid `T`.
    /// - The pointer is aligned for `T`.
    #[inline(always)]
    pub const unsafe fn read<T>(self) -> T {
        // SAFETY: guaranteed by the caller.
        unsafe { self.0.as_ptr().cast::<T>().read() }
    }

    /// Runs the destructor of the pointee in place.
    ///
    /// # Safety
    ///
    /// - The pointee is a valid `T`.
    /// - The pointer is aligned for `T`.
    #[inline]
    pub unsafe fn drop_as<T>(self) {
        // SAFETY: guaranteed by the caller.
        unsafe { self.0.as_ptr().cast::<T>().drop_in_place() }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::{OwningPtr, Ptr, PtrMut};
    use alloc::rc::Rc;
    use core::mem::ManuallyDrop;

    #[test]
    fn shared_and_exclusive_views_alias_the_same_value() {
        let mut value = 41u64;
        let addr = Ptr::from_ref(&value).addr();

        let mut ptr = PtrMut::from_mut(&mut value);
        assert_eq!(ptr.addr(), addr);
        assert!(ptr.is_aligned::<u64>());

        unsafe { *ptr.reborrow().consume::<u64>() += 1 };
        assert_eq!(unsafe { *ptr.borrow().as_ref::<u64>() }, 42);
    }

    #[test]
    fn owning_ptr_drops_exactly_once() {
        let rc = Rc::new(());
        let mut slot = ManuallyDrop::new(Rc::clone(&rc));
        assert_eq!(Rc::strong_count(&rc), 2);

        let ptr = OwningPtr::from_value(&mut slot);
        unsafe { ptr.drop_as::<Rc<()>>() };
        assert_eq!(Rc::strong_count(&rc), 1);
    }
}
