use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::{Ptr, PtrMut};

/// Alignment guaranteed by [`InlineBuffer`].
pub const INLINE_ALIGN: usize = 16;

/// Uninitialized, aligned storage for a value of at most `N` bytes.
///
/// The buffer never tracks whether it holds a value; the owner does.
///
/// # Examples
///
/// ```
/// # use vc_ptr::InlineBuffer;
/// let mut buf = InlineBuffer::<16>::uninit();
/// assert!(InlineBuffer::<16>::fits::<[u32; 4]>());
/// assert!(!InlineBuffer::<16>::fits::<[u32; 5]>());
///
/// unsafe {
///     buf.write(7u32);
///     assert_eq!(*buf.as_ptr().as_ref::<u32>(), 7);
/// }
/// ```
#[derive(Clone, Copy)]
#[repr(C, align(16))]
pub struct InlineBuffer<const N: usize>([MaybeUninit<u8>; N]);

impl<const N: usize> InlineBuffer<N> {
    /// Creates an uninitialized buffer.
    #[inline(always)]
    pub const fn uninit() -> Self {
        Self([MaybeUninit::uninit(); N])
    }

    /// Returns `true` if a `T` can be stored in the buffer.
    #[inline(always)]
    pub const fn fits<T>() -> bool {
        Self::fits_layout(size_of::<T>(), align_of::<T>())
    }

    /// Layout form of [`fits`](Self::fits).
    #[inline(always)]
    pub const fn fits_layout(size: usize, align: usize) -> bool {
        size <= N && align <= INLINE_ALIGN
    }

    /// Shared view of the storage.
    #[inline(always)]
    pub fn as_ptr(&self) -> Ptr<'_> {
        // SAFETY: the pointer comes from a live reference.
        unsafe { Ptr::new(NonNull::from_ref(&self.0).cast()) }
    }

    /// Exclusive view of the storage.
    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> PtrMut<'_> {
        // SAFETY: the pointer comes from a live exclusive reference.
        unsafe { PtrMut::new(NonNull::from_mut(&mut self.0).cast()) }
    }

    /// Moves `value` into the buffer, overwriting without dropping.
    ///
    /// # Safety
    ///
    /// `Self::fits::<T>()` must hold.
    #[inline]
    pub unsafe fn write<T>(&mut self, value: T) {
        debug_assert!(Self::fits::<T>());
        // SAFETY: size and alignment are checked by the caller.
        unsafe { self.0.as_mut_ptr().cast::<T>().write(value) }
    }
}

impl<const N: usize> Default for InlineBuffer<N> {
    #[inline]
    fn default() -> Self {
        Self::uninit()
    }
}
