//! The type-erased [`Variant`] value.
#![expect(unsafe_code, reason = "Variant manages type-erased storage by hand.")]

// -----------------------------------------------------------------------------
// Modules

mod arith;

// -----------------------------------------------------------------------------
// Imports

use alloc::alloc::{alloc, dealloc, handle_alloc_error};
use core::alloc::Layout;
use core::any::TypeId;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use vc_ptr::{InlineBuffer, OwningPtr, Ptr, PtrMut};

use crate::descriptor::{Operation, Scalar, Type};
use crate::error::MetaError;
use crate::value::{ObjectId, Value};

// -----------------------------------------------------------------------------
// Storage

/// Bytes available for inline storage.
pub const INLINE_CAPACITY: usize = 16;

type Inline = InlineBuffer<INLINE_CAPACITY>;

/// How a [`Variant`] holds its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// No content and no type.
    Undefined,
    /// An owned value in the inline buffer.
    ValueInline,
    /// An owned value on the heap.
    ValueHeap,
    /// A mutable reference to a value owned elsewhere.
    RefMutable,
    /// A shared reference to a value owned elsewhere.
    RefConst,
}

enum Storage {
    Undefined,
    Inline(Inline),
    Heap(NonNull<u8>),
    RefMut(NonNull<u8>),
    RefConst(NonNull<u8>),
}

// -----------------------------------------------------------------------------
// Variant

/// A type-erased value, or a reference to one.
///
/// Owned values no larger than [`INLINE_CAPACITY`] bytes (and aligned to at
/// most 16) are stored inline; larger ones go to the heap. References carry
/// the lifetime `'a` of the borrowed object.
///
/// Creating a variant needs the value's [`Type`], which usually comes from
/// [`TypeRegistry`](crate::TypeRegistry) helpers such as
/// [`value`](crate::TypeRegistry::value) and
/// [`reference`](crate::TypeRegistry::reference).
///
/// Moving out with [`take`](Self::take) leaves the source
/// [`Undefined`](StorageKind::Undefined).
///
/// # Examples
///
/// ```
/// use vc_meta::{StorageKind, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let mut x = 7i32;
///
/// let owned = registry.value(42i32);
/// assert_eq!(owned.kind(), StorageKind::ValueInline);
/// assert_eq!(owned.try_as_ref::<i32>(), Some(&42));
///
/// let mut by_ref = registry.reference_mut(&mut x);
/// *by_ref.cast_mut::<i32>().unwrap() += 1;
/// drop(by_ref);
/// assert_eq!(x, 8);
/// ```
pub struct Variant<'a> {
    storage: Storage,
    ty: Option<Type>,
    _marker: PhantomData<&'a mut ()>,
}

// SAFETY: every stored or referenced value is `Send + Sync` (see `Value`).
unsafe impl Send for Variant<'_> {}
// SAFETY: shared access only hands out `&T` for `T: Sync`.
unsafe impl Sync for Variant<'_> {}

impl Variant<'static> {
    /// Creates an owned variant holding `value`.
    ///
    /// # Panics
    ///
    /// If `ty` does not describe `T`.
    #[inline]
    pub fn with_value<T: Value>(ty: Type, value: T) -> Self {
        let mut var = Self::new();
        var.emplace(ty, value);
        var
    }
}

impl<'a> Variant<'a> {
    /// Creates an undefined variant.
    #[inline]
    pub const fn new() -> Self {
        Self {
            storage: Storage::Undefined,
            ty: None,
            _marker: PhantomData,
        }
    }

    /// Creates a variant referencing `value` immutably.
    ///
    /// # Panics
    ///
    /// If `ty` does not describe `T`.
    #[inline]
    pub fn from_ref<T: Value>(ty: Type, value: &'a T) -> Self {
        let mut var = Self::new();
        var.assign_ref(ty, value);
        var
    }

    /// Creates a variant referencing `value` mutably.
    ///
    /// # Panics
    ///
    /// If `ty` does not describe `T`.
    #[inline]
    pub fn from_mut<T: Value>(ty: Type, value: &'a mut T) -> Self {
        let mut var = Self::new();
        var.assign_mut(ty, value);
        var
    }

    #[track_caller]
    fn check_type<T: Value>(ty: Type) {
        assert!(
            ty.is::<T>(),
            "type descriptor of `{}` used for a `{}`",
            ty.type_name(),
            core::any::type_name::<T>(),
        );
    }

    /// Replaces the content with an owned `value`.
    ///
    /// The previous content is released first.
    ///
    /// # Panics
    ///
    /// If `ty` does not describe `T`.
    #[track_caller]
    pub fn emplace<T: Value>(&mut self, ty: Type, value: T) {
        Self::check_type::<T>(ty);
        self.release();

        self.storage = if Inline::fits::<T>() {
            let mut buf = Inline::uninit();
            // SAFETY: `T` fits the buffer.
            unsafe { buf.write(value) };
            Storage::Inline(buf)
        } else if size_of::<T>() == 0 {
            // Over-aligned zero-sized types need no allocation.
            let ptr = NonNull::<T>::dangling();
            // SAFETY: zero-sized writes only need an aligned pointer.
            unsafe { ptr.write(value) };
            Storage::Heap(ptr.cast())
        } else {
            let layout = Layout::new::<T>();
            // SAFETY: `layout` has a non-zero size.
            let Some(ptr) = NonNull::new(unsafe { alloc(layout) }) else {
                handle_alloc_error(layout)
            };
            // SAFETY: fresh allocation with the layout of `T`.
            unsafe { ptr.cast::<T>().write(value) };
            Storage::Heap(ptr)
        };
        self.ty = Some(ty);
    }

    /// Rebinds to an immutable reference.
    ///
    /// # Panics
    ///
    /// If `ty` does not describe `T`.
    #[track_caller]
    pub fn assign_ref<T: Value>(&mut self, ty: Type, value: &'a T) {
        Self::check_type::<T>(ty);
        self.release();
        self.storage = Storage::RefConst(NonNull::from_ref(value).cast());
        self.ty = Some(ty);
    }

    /// Rebinds to a mutable reference.
    ///
    /// # Panics
    ///
    /// If `ty` does not describe `T`.
    #[track_caller]
    pub fn assign_mut<T: Value>(&mut self, ty: Type, value: &'a mut T) {
        Self::check_type::<T>(ty);
        self.release();
        self.storage = Storage::RefMut(NonNull::from_mut(value).cast());
        self.ty = Some(ty);
    }

    /// Moves the content of `other` into `self`.
    #[inline]
    pub fn assign(&mut self, other: Variant<'a>) {
        *self = other;
    }

    /// Destroys owned content and becomes undefined.
    ///
    /// References are simply forgotten.
    pub fn release(&mut self) {
        let storage = mem::replace(&mut self.storage, Storage::Undefined);
        let Some(ty) = self.ty.take() else {
            return;
        };
        match storage {
            Storage::Inline(mut buf) => {
                // SAFETY: the buffer holds a value of `ty`, dropped exactly once.
                unsafe { (ty.drop_fn())(OwningPtr::new(buf.as_mut_ptr().into())) }
            }
            Storage::Heap(ptr) => {
                // SAFETY: the allocation holds a value of `ty` with its layout.
                unsafe {
                    (ty.drop_fn())(OwningPtr::new(ptr));
                    if ty.size() != 0 {
                        dealloc(ptr.as_ptr(), ty.layout());
                    }
                }
            }
            Storage::Undefined | Storage::RefMut(_) | Storage::RefConst(_) => {}
        }
    }

    /// Moves the content out, leaving `self` undefined.
    #[inline]
    pub fn take(&mut self) -> Variant<'a> {
        mem::take(self)
    }
}

// Inspection.
impl<'a> Variant<'a> {
    /// The storage mode.
    #[inline]
    pub fn kind(&self) -> StorageKind {
        match self.storage {
            Storage::Undefined => StorageKind::Undefined,
            Storage::Inline(_) => StorageKind::ValueInline,
            Storage::Heap(_) => StorageKind::ValueHeap,
            Storage::RefMut(_) => StorageKind::RefMutable,
            Storage::RefConst(_) => StorageKind::RefConst,
        }
    }

    /// The type of the content.
    #[inline]
    pub fn ty(&self) -> Option<Type> {
        self.ty
    }

    /// The Rust type name of the content, or `"undefined"`.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.ty.map_or("undefined", Type::type_name)
    }

    /// Returns `true` unless undefined.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.ty.is_some()
    }

    /// Returns `true` if undefined.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.ty.is_none()
    }

    /// Returns `true` for owned content.
    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self.storage, Storage::Inline(_) | Storage::Heap(_))
    }

    /// Returns `true` for referenced content.
    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self.storage, Storage::RefMut(_) | Storage::RefConst(_))
    }

    /// Returns `true` for a constant reference.
    #[inline]
    pub fn is_const(&self) -> bool {
        matches!(self.storage, Storage::RefConst(_))
    }

    /// Returns `true` if the content is exactly a `T`.
    #[inline]
    pub fn is<T: Value>(&self) -> bool {
        self.ty.is_some_and(|ty| ty.type_id() == TypeId::of::<T>())
    }

    /// Returns `true` if the content is a `T` or has `T` as a registered base.
    #[inline]
    pub fn is_cast_able<T: Value>(&self) -> bool {
        self.ty
            .is_some_and(|ty| ty.is_castable_to(TypeId::of::<T>()))
    }

    /// Address-based identity of the content.
    ///
    /// Inline values move with the variant, so their id changes when it does.
    #[inline]
    pub fn object_id(&self) -> ObjectId {
        self.raw()
            .map_or(ObjectId::NONE, |p| ObjectId::from_addr(p.as_ptr() as usize))
    }

    fn raw(&self) -> Option<NonNull<u8>> {
        match &self.storage {
            Storage::Undefined => None,
            Storage::Inline(buf) => Some(buf.as_ptr().into()),
            Storage::Heap(p) | Storage::RefMut(p) | Storage::RefConst(p) => Some(*p),
        }
    }

    /// Shared pointer to the content.
    #[inline]
    pub fn data(&self) -> Option<Ptr<'_>> {
        // SAFETY: the content lives at least as long as `&self`.
        self.raw().map(|p| unsafe { Ptr::new(p) })
    }

    /// Exclusive pointer to the content.
    ///
    /// # Errors
    ///
    /// [`MetaError::UndefinedValue`] or, for constant references,
    /// [`MetaError::ConstViolation`].
    pub fn data_mut(&mut self) -> Result<PtrMut<'_>, MetaError> {
        let type_name = self.type_name();
        match &mut self.storage {
            Storage::Undefined => Err(MetaError::UndefinedValue),
            Storage::RefConst(_) => Err(MetaError::ConstViolation { type_name }),
            Storage::Inline(buf) => Ok(buf.as_mut_ptr()),
            // SAFETY: owned or mutably borrowed content, exclusive through `&mut self`.
            Storage::Heap(p) | Storage::RefMut(p) => Ok(unsafe { PtrMut::new(*p) }),
        }
    }
}

// Typed access.
impl<'a> Variant<'a> {
    /// Reinterprets the content as `T` without checking.
    ///
    /// With the `debug` feature in debug builds the type is asserted.
    ///
    /// # Safety
    ///
    /// The variant must hold exactly a `T`.
    #[inline]
    pub unsafe fn as_ref<T: Value>(&self) -> &T {
        #[cfg(all(debug_assertions, feature = "debug"))]
        assert!(self.is::<T>(), "`{}` read as `{}`", self.type_name(), core::any::type_name::<T>());

        // SAFETY: guaranteed by the caller.
        unsafe { self.raw().unwrap_unchecked().cast::<T>().as_ref() }
    }

    /// Mutable form of [`as_ref`](Self::as_ref).
    ///
    /// # Safety
    ///
    /// The variant must hold exactly a `T` and must not be a constant reference.
    #[inline]
    pub unsafe fn as_mut<T: Value>(&mut self) -> &mut T {
        #[cfg(all(debug_assertions, feature = "debug"))]
        assert!(
            self.is::<T>() && !self.is_const(),
            "`{}` written as `{}`",
            self.type_name(),
            core::any::type_name::<T>(),
        );

        // SAFETY: guaranteed by the caller.
        unsafe { self.raw().unwrap_unchecked().cast::<T>().as_mut() }
    }

    /// The content if it is exactly a `T`.
    #[inline]
    pub fn try_as_ref<T: Value>(&self) -> Option<&T> {
        // SAFETY: the type was just checked.
        self.is::<T>().then(|| unsafe { self.as_ref::<T>() })
    }

    /// The content if it is exactly a `T` and mutable.
    #[inline]
    pub fn try_as_mut<T: Value>(&mut self) -> Option<&mut T> {
        if self.is::<T>() && !self.is_const() {
            // SAFETY: the type and mutability were just checked.
            Some(unsafe { self.as_mut::<T>() })
        } else {
            None
        }
    }

    /// The content as a `T` or as its registered base `T`.
    ///
    /// # Errors
    ///
    /// [`MetaError::UndefinedValue`] or [`MetaError::BadCast`].
    pub fn cast<T: Value>(&self) -> Result<&T, MetaError> {
        let (Some(ty), Some(ptr)) = (self.ty, self.data()) else {
            return Err(MetaError::UndefinedValue);
        };
        match ty.upcast(ptr, TypeId::of::<T>()) {
            // SAFETY: `upcast` produced storage of `T`.
            Some(ptr) => Ok(unsafe { ptr.as_ref::<T>() }),
            None => Err(MetaError::BadCast {
                from: ty.type_name(),
                to: core::any::type_name::<T>(),
            }),
        }
    }

    /// Mutable form of [`cast`](Self::cast).
    ///
    /// # Errors
    ///
    /// As [`cast`](Self::cast), plus [`MetaError::ConstViolation`].
    pub fn cast_mut<T: Value>(&mut self) -> Result<&mut T, MetaError> {
        let ty = self.ty.ok_or(MetaError::UndefinedValue)?;
        let ptr = self.data_mut()?;
        match ty.upcast_mut(ptr, TypeId::of::<T>()) {
            // SAFETY: `upcast_mut` produced storage of `T`.
            Some(ptr) => Ok(unsafe { ptr.consume::<T>() }),
            None => Err(MetaError::BadCast {
                from: ty.type_name(),
                to: core::any::type_name::<T>(),
            }),
        }
    }

    /// Moves an owned `T` out, leaving `self` undefined.
    ///
    /// Returns `None` for references and other types.
    pub fn take_value<T: Value>(&mut self) -> Option<T> {
        if !self.is::<T>() || !self.is_value() {
            return None;
        }
        self.ty = None;
        match mem::replace(&mut self.storage, Storage::Undefined) {
            Storage::Inline(mut buf) => {
                // SAFETY: the buffer holds a `T`, read exactly once.
                Some(unsafe { OwningPtr::new(buf.as_mut_ptr().into()).read::<T>() })
            }
            Storage::Heap(ptr) => {
                // SAFETY: the allocation holds a `T`, read exactly once then freed.
                unsafe {
                    let value = OwningPtr::new(ptr).read::<T>();
                    if size_of::<T>() != 0 {
                        dealloc(ptr.as_ptr(), Layout::new::<T>());
                    }
                    Some(value)
                }
            }
            Storage::Undefined | Storage::RefMut(_) | Storage::RefConst(_) => None,
        }
    }

    /// Compares the content with `rhs`. `false` for other types.
    #[inline]
    pub fn equals<T: Value + PartialEq>(&self, rhs: &T) -> bool {
        self.try_as_ref::<T>() == Some(rhs)
    }
}

// Borrowing, copying and conversion.
impl<'a> Variant<'a> {
    /// A constant reference to the same content.
    pub fn borrow(&self) -> Variant<'_> {
        Variant {
            storage: self.raw().map_or(Storage::Undefined, Storage::RefConst),
            ty: self.ty,
            _marker: PhantomData,
        }
    }

    /// A mutable reference to the same content.
    ///
    /// # Errors
    ///
    /// [`MetaError::ConstViolation`] for constant references.
    pub fn borrow_mut(&mut self) -> Result<Variant<'_>, MetaError> {
        let ty = self.ty;
        if ty.is_none() {
            return Ok(Variant::new());
        }
        let ptr = self.data_mut()?;
        Ok(Variant {
            storage: Storage::RefMut(ptr.into()),
            ty,
            _marker: PhantomData,
        })
    }

    /// Deep-copies the content into a new owned variant.
    ///
    /// References are read through, so the copy is always a value.
    ///
    /// # Errors
    ///
    /// [`MetaError::UnsupportedOperation`] if cloning is not registered.
    pub fn try_clone(&self) -> Result<Variant<'static>, MetaError> {
        let (Some(ty), Some(ptr)) = (self.ty, self.data()) else {
            return Ok(Variant::new());
        };
        match ty.ops().clone {
            // SAFETY: `ptr` holds a value of `ty`.
            Some(clone) => Ok(unsafe { clone(ty, ptr) }),
            None => Err(MetaError::UnsupportedOperation {
                op: Operation::Clone,
                type_name: ty.type_name(),
            }),
        }
    }

    /// Copy-assignment from `source`.
    ///
    /// An owned value or a mutable reference of the same type is assigned
    /// in place, so a mutable reference writes through to its target.
    /// Anything else, a constant reference included, is rebound to a deep
    /// copy of `source`.
    ///
    /// # Errors
    ///
    /// [`MetaError::UnsupportedOperation`] if cloning is not registered.
    pub fn copy_from(&mut self, source: &Variant<'_>) -> Result<(), MetaError> {
        let (Some(ty), Some(src)) = (source.ty, source.data()) else {
            self.release();
            return Ok(());
        };
        if !self.is_const()
            && self.ty == Some(ty)
            && let Some(clone_from) = ty.ops().clone_from
        {
            let dst = self.data_mut()?;
            // SAFETY: both sides hold distinct values of `ty`.
            unsafe { clone_from(dst, src) };
            return Ok(());
        }
        *self = source.try_clone()?;
        Ok(())
    }

    /// Converts to `target` with a registered converter.
    ///
    /// Returns an undefined variant when no converter exists. A same-typed
    /// target yields a deep copy.
    pub fn convert(&self, target: Type) -> Variant<'static> {
        let (Some(ty), Some(ptr)) = (self.ty, self.data()) else {
            return Variant::new();
        };
        if ty == target {
            return self.try_clone().unwrap_or_default();
        }
        match ty.find_converter(target) {
            // SAFETY: `ptr` holds a value of `ty`, the converter's source.
            Some(converter) => unsafe { converter.convert_ptr(ptr) },
            None => Variant::new(),
        }
    }

    /// Converts to a `T` value with a registered converter.
    pub fn convert_into<T: Value>(&self) -> Option<T> {
        let (ty, ptr) = (self.ty?, self.data()?);
        let mut converted = if ty.is::<T>() {
            self.try_clone().ok()?
        } else {
            let converter = ty.find_converter_by_id(TypeId::of::<T>())?;
            // SAFETY: `ptr` holds a value of `ty`, the converter's source.
            unsafe { converter.convert_ptr(ptr) }
        };
        converted.take_value::<T>()
    }

    /// Truthiness of the content. Undefined is `false`.
    ///
    /// # Errors
    ///
    /// [`MetaError::UnsupportedOperation`] if no conversion to `bool` is registered.
    pub fn to_bool(&self) -> Result<bool, MetaError> {
        let (Some(ty), Some(ptr)) = (self.ty, self.data()) else {
            return Ok(false);
        };
        match ty.ops().to_bool {
            Some(to_bool) => Ok(to_bool(ptr)),
            None => Err(MetaError::UnsupportedOperation {
                op: Operation::ToBool,
                type_name: ty.type_name(),
            }),
        }
    }

    /// The content widened to a [`Scalar`], for numeric types.
    pub(crate) fn scalar(&self) -> Option<Scalar> {
        let (ty, ptr) = (self.ty?, self.data()?);
        let scalar = ty.ops().scalar?;
        // SAFETY: `ptr` holds a value of `ty`.
        Some(unsafe { scalar(ptr) })
    }
}

// -----------------------------------------------------------------------------
// Traits

impl Drop for Variant<'_> {
    #[inline]
    fn drop(&mut self) {
        self.release();
    }
}

impl Default for Variant<'_> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Variant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("kind", &self.kind())
            .field("type", &self.type_name())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;

    use super::{StorageKind, Variant};
    use crate::{MetaError, TypeRegistry};

    #[test]
    fn undefined_has_no_type_and_is_false() {
        let var = Variant::new();
        assert_eq!(var.kind(), StorageKind::Undefined);
        assert!(var.ty().is_none());
        assert_eq!(var.to_bool(), Ok(false));
        assert!(var.data().is_none());
    }

    #[test]
    fn small_values_stay_inline_large_ones_go_to_heap() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.value(1u64).kind(), StorageKind::ValueInline);
        assert_eq!(registry.value([0u64; 2]).kind(), StorageKind::ValueInline);
        assert_eq!(registry.value([0u64; 3]).kind(), StorageKind::ValueHeap);
        assert!(registry.resolve::<[u8; 16]>().is_small_optimized());
        assert!(!registry.resolve::<[u8; 17]>().is_small_optimized());
    }

    #[test]
    fn release_drops_owned_values_once() {
        let registry = TypeRegistry::new();
        let counter = Arc::new(());

        let mut inline = registry.value(Arc::clone(&counter));
        let mut heap = registry.value([Arc::clone(&counter), Arc::clone(&counter), Arc::clone(&counter)]);
        assert_eq!(Arc::strong_count(&counter), 5);

        inline.release();
        assert_eq!(Arc::strong_count(&counter), 4);
        heap.release();
        assert_eq!(Arc::strong_count(&counter), 1);
        assert!(heap.is_undefined());
    }

    #[test]
    fn references_are_not_dropped() {
        let registry = TypeRegistry::new();
        let counter = Arc::new(());
        {
            let _by_ref = registry.reference(&counter);
            assert_eq!(Arc::strong_count(&counter), 1);
        }
        assert_eq!(Arc::strong_count(&counter), 1);
    }

    #[test]
    fn take_value_moves_out_and_leaves_undefined() {
        let registry = TypeRegistry::new();
        let mut var = registry.value(String::from("payload"));

        assert_eq!(var.take_value::<u32>(), None);
        assert_eq!(var.take_value::<String>().as_deref(), Some("payload"));
        assert!(var.is_undefined());
    }

    #[test]
    fn constant_references_refuse_mutation() {
        let registry = TypeRegistry::new();
        let value = 3i32;
        let mut var = registry.reference(&value);

        assert!(var.try_as_mut::<i32>().is_none());
        assert!(matches!(var.cast_mut::<i32>(), Err(MetaError::ConstViolation { .. })));
        assert!(matches!(var.borrow_mut(), Err(MetaError::ConstViolation { .. })));
    }

    #[test]
    fn moved_from_variant_is_undefined() {
        let registry = TypeRegistry::new();
        let mut source = registry.value(5u8);
        let target = source.take();

        assert!(source.is_undefined());
        assert!(target.equals(&5u8));
    }
}
