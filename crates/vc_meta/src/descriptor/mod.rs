//! Per-type descriptors: layout, flags, the operation table and registered members.
#![expect(unsafe_code, reason = "Upcasts and default thunks operate on erased pointers.")]

// -----------------------------------------------------------------------------
// Modules

mod numeric;
mod ops;

// -----------------------------------------------------------------------------
// Exports

pub use numeric::{Numeric, Scalar};
pub use ops::{BinaryOperator, Operation, UnaryOperator};

pub(crate) use numeric::{
    numeric_assign, numeric_binary, numeric_negate, numeric_to_bool, pointer_assign,
    pointer_binary, scalar_thunk,
};
pub(crate) use ops::{
    AssignFn, BinaryFn, OpTable, ToBoolFn, UnaryFn, clone_from_thunk, clone_thunk, default_thunk,
    drop_thunk, leak, operand,
};

// -----------------------------------------------------------------------------
// Imports

use alloc::vec::Vec;
use core::alloc::Layout;
use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bitflags::bitflags;
use vc_ptr::{InlineBuffer, OwningPtr, Ptr, PtrMut};
use vc_utils::hash::HashedName;

use crate::error::MetaError;
use crate::member::{ConstructorEntry, ConverterEntry, FunctionEntry, PropertyEntry};
use crate::signal::{SignalEntry, SignalSignature};
use crate::value::Value;
use crate::variant::{INLINE_CAPACITY, Variant};

// -----------------------------------------------------------------------------
// TypeFlags

bitflags! {
    /// Static facts about a described type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u32 {
        /// Stored inline in a [`Variant`] without allocation.
        const SMALL_OPTIMIZED = 1 << 0;
        /// The unit type `()`.
        const VOID            = 1 << 1;
        /// A primitive integer.
        const INTEGRAL        = 1 << 2;
        /// `f32` or `f64`.
        const FLOATING        = 1 << 3;
        /// `f64`.
        const DOUBLE          = 1 << 4;
        /// Registered with pointer arithmetic.
        const POINTER         = 1 << 5;
    }
}

impl TypeFlags {
    fn of<T: 'static>() -> Self {
        let id = TypeId::of::<T>();
        let integers = [
            TypeId::of::<i8>(),
            TypeId::of::<i16>(),
            TypeId::of::<i32>(),
            TypeId::of::<i64>(),
            TypeId::of::<i128>(),
            TypeId::of::<isize>(),
            TypeId::of::<u8>(),
            TypeId::of::<u16>(),
            TypeId::of::<u32>(),
            TypeId::of::<u64>(),
            TypeId::of::<u128>(),
            TypeId::of::<usize>(),
        ];

        let mut flags = Self::empty();
        if InlineBuffer::<INLINE_CAPACITY>::fits::<T>() {
            flags |= Self::SMALL_OPTIMIZED;
        }
        if id == TypeId::of::<()>() {
            flags |= Self::VOID;
        }
        if integers.contains(&id) {
            flags |= Self::INTEGRAL;
        }
        if id == TypeId::of::<f32>() {
            flags |= Self::FLOATING;
        }
        if id == TypeId::of::<f64>() {
            flags |= Self::FLOATING | Self::DOUBLE;
        }
        flags
    }
}

// -----------------------------------------------------------------------------
// BaseEntry

/// A registered base type together with the projections reaching it.
#[derive(Clone, Copy)]
pub struct BaseEntry {
    ty: Type,
    upcast: for<'p> unsafe fn(Ptr<'p>) -> Ptr<'p>,
    upcast_mut: for<'p> unsafe fn(PtrMut<'p>) -> PtrMut<'p>,
}

unsafe fn upcast_thunk<T: AsRef<B> + 'static, B: 'static>(ptr: Ptr<'_>) -> Ptr<'_> {
    // SAFETY: the pointee is a `T`.
    Ptr::from_ref(unsafe { ptr.as_ref::<T>() }.as_ref())
}

unsafe fn upcast_mut_thunk<T: AsMut<B> + 'static, B: 'static>(ptr: PtrMut<'_>) -> PtrMut<'_> {
    // SAFETY: the pointee is a `T`.
    PtrMut::from_mut(unsafe { ptr.consume::<T>() }.as_mut())
}

impl BaseEntry {
    pub(crate) fn new<T, B>(ty: Type) -> Self
    where
        T: AsRef<B> + AsMut<B> + 'static,
        B: 'static,
    {
        Self {
            ty,
            upcast: upcast_thunk::<T, B>,
            upcast_mut: upcast_mut_thunk::<T, B>,
        }
    }

    /// The base type.
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }
}

impl fmt::Debug for BaseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BaseEntry").field(&self.ty).finish()
    }
}

// -----------------------------------------------------------------------------
// Members

#[derive(Default)]
struct Members {
    bases: Vec<BaseEntry>,
    constructors: Vec<&'static ConstructorEntry>,
    converters: Vec<&'static ConverterEntry>,
    functions: Vec<&'static FunctionEntry>,
    properties: Vec<&'static PropertyEntry>,
    signals: Vec<&'static SignalEntry>,
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// The runtime record of one concrete type.
///
/// Descriptors are created by [`TypeRegistry::resolve`] on first use and
/// live for the rest of the process. They are handled through [`Type`].
///
/// [`TypeRegistry::resolve`]: crate::TypeRegistry::resolve
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    layout: Layout,
    name: AtomicU64,
    flags: AtomicU32,
    drop: ops::DropFn,
    ops: RwLock<OpTable>,
    members: RwLock<Members>,
}

impl TypeDescriptor {
    pub(crate) fn new<T: Value>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            layout: Layout::new::<T>(),
            name: AtomicU64::new(0),
            flags: AtomicU32::new(TypeFlags::of::<T>().bits()),
            drop: drop_thunk::<T>,
            ops: RwLock::new(OpTable::default()),
            members: RwLock::new(Members::default()),
        }
    }
}

// -----------------------------------------------------------------------------
// Type

/// A handle to a [`TypeDescriptor`].
///
/// Cheap to copy. Two handles are equal when they refer to the same descriptor.
#[derive(Clone, Copy)]
pub struct Type(&'static TypeDescriptor);

impl PartialEq for Type {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::ptr::from_ref(self.0).hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            name if name.is_none() => write!(f, "Type({})", self.type_name()),
            name => write!(f, "Type({}, {name})", self.type_name()),
        }
    }
}

// Identity and layout.
impl Type {
    #[inline(always)]
    pub(crate) const fn from_static(descriptor: &'static TypeDescriptor) -> Self {
        Self(descriptor)
    }

    /// The Rust [`TypeId`] of the described type.
    #[inline]
    pub fn type_id(self) -> TypeId {
        self.0.type_id
    }

    /// The Rust type name, for diagnostics.
    #[inline]
    pub fn type_name(self) -> &'static str {
        self.0.type_name
    }

    /// Returns `true` if this describes `T`.
    #[inline]
    pub fn is<T: 'static>(self) -> bool {
        self.0.type_id == TypeId::of::<T>()
    }

    /// The registered name, [`HashedName::NONE`] before registration.
    #[inline]
    pub fn name(self) -> HashedName {
        HashedName::from_raw(self.0.name.load(Ordering::Acquire))
    }

    /// Returns `true` once the type has been given a name.
    #[inline]
    pub fn is_registered(self) -> bool {
        !self.name().is_none()
    }

    pub(crate) fn assign_name(self, name: HashedName) -> Result<(), MetaError> {
        self.0
            .name
            .compare_exchange(0, name.get(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| MetaError::AlreadyRegistered {
                type_name: self.type_name(),
            })
    }

    /// Memory layout of the described type.
    #[inline]
    pub fn layout(self) -> Layout {
        self.0.layout
    }

    /// Size in bytes.
    #[inline]
    pub fn size(self) -> usize {
        self.0.layout.size()
    }

    /// Alignment in bytes.
    #[inline]
    pub fn align(self) -> usize {
        self.0.layout.align()
    }

    /// Current flags.
    #[inline]
    pub fn flags(self) -> TypeFlags {
        TypeFlags::from_bits_retain(self.0.flags.load(Ordering::Acquire))
    }

    pub(crate) fn insert_flags(self, flags: TypeFlags) {
        self.0.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Stored inline in a [`Variant`].
    #[inline]
    pub fn is_small_optimized(self) -> bool {
        self.flags().contains(TypeFlags::SMALL_OPTIMIZED)
    }

    /// The unit type.
    #[inline]
    pub fn is_void(self) -> bool {
        self.flags().contains(TypeFlags::VOID)
    }

    /// A primitive integer.
    #[inline]
    pub fn is_integral(self) -> bool {
        self.flags().contains(TypeFlags::INTEGRAL)
    }

    /// `f32` or `f64`.
    #[inline]
    pub fn is_floating(self) -> bool {
        self.flags().contains(TypeFlags::FLOATING)
    }

    /// `f64`.
    #[inline]
    pub fn is_double(self) -> bool {
        self.flags().contains(TypeFlags::DOUBLE)
    }

    /// Registered with pointer arithmetic.
    #[inline]
    pub fn is_pointer(self) -> bool {
        self.flags().contains(TypeFlags::POINTER)
    }
}

// Operation table.
impl Type {
    #[inline]
    pub(crate) fn drop_fn(self) -> unsafe fn(OwningPtr<'_>) {
        self.0.drop
    }

    /// A snapshot of the operation table.
    #[inline]
    pub(crate) fn ops(self) -> OpTable {
        *self.0.ops.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn update_ops(self, f: impl FnOnce(&mut OpTable)) {
        f(&mut self.0.ops.write().unwrap_or_else(PoisonError::into_inner));
    }

    /// Returns `true` if default construction is registered.
    pub fn has_default(self) -> bool {
        self.ops().default.is_some()
    }

    /// Returns `true` if cloning is registered.
    pub fn has_clone(self) -> bool {
        self.ops().clone.is_some()
    }

    /// Returns `true` if conversion to `bool` is registered.
    pub fn has_to_bool(self) -> bool {
        self.ops().to_bool.is_some()
    }

    /// Returns `true` if `op` is registered.
    pub fn has_unary(self, op: UnaryOperator) -> bool {
        self.ops().unary[op.index()].is_some()
    }

    /// Returns `true` if the binary form of `op` is registered.
    pub fn has_binary(self, op: BinaryOperator) -> bool {
        self.ops().binary[op.index()].is_some()
    }

    /// Returns `true` if the assignment form of `op` is registered.
    pub fn has_assign(self, op: BinaryOperator) -> bool {
        self.ops().assign[op.index()].is_some()
    }

    /// Creates a default value.
    ///
    /// # Errors
    ///
    /// [`MetaError::UnsupportedOperation`] without a registered default.
    pub fn default_construct(self) -> Result<Variant<'static>, MetaError> {
        match self.ops().default {
            Some(default) => Ok(default(self)),
            None => Err(MetaError::UnsupportedOperation {
                op: Operation::DefaultConstruct,
                type_name: self.type_name(),
            }),
        }
    }
}

// Members.
impl Type {
    fn members(self) -> RwLockReadGuard<'static, Members> {
        self.0.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn members_mut(self) -> RwLockWriteGuard<'static, Members> {
        self.0.members.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Direct bases, in registration order.
    pub fn bases(self) -> Vec<Type> {
        self.members().bases.iter().map(BaseEntry::ty).collect()
    }

    /// Registered constructors.
    pub fn constructors(self) -> Vec<&'static ConstructorEntry> {
        self.members().constructors.clone()
    }

    /// Registered converters.
    pub fn converters(self) -> Vec<&'static ConverterEntry> {
        self.members().converters.clone()
    }

    /// Functions registered on this type, bases excluded.
    pub fn functions(self) -> Vec<&'static FunctionEntry> {
        self.members().functions.clone()
    }

    /// Properties registered on this type, bases excluded.
    pub fn properties(self) -> Vec<&'static PropertyEntry> {
        self.members().properties.clone()
    }

    /// Signals registered on this type, bases excluded.
    pub fn signals(self) -> Vec<&'static SignalEntry> {
        self.members().signals.clone()
    }

    pub(crate) fn add_base(self, base: BaseEntry) -> Result<(), MetaError> {
        let mut members = self.members_mut();
        if members.bases.iter().any(|b| b.ty == base.ty) {
            return Err(MetaError::DuplicateBase {
                type_name: self.type_name(),
                base: base.ty.type_name(),
            });
        }
        members.bases.push(base);
        Ok(())
    }

    pub(crate) fn add_constructor(
        self,
        entry: ConstructorEntry,
    ) -> Result<&'static ConstructorEntry, MetaError> {
        let mut members = self.members_mut();
        if members
            .constructors
            .iter()
            .any(|c| c.arg_types() == entry.arg_types())
        {
            return Err(MetaError::DuplicateConstructor {
                type_name: self.type_name(),
            });
        }
        let entry = leak_entry(entry);
        members.constructors.push(entry);
        Ok(entry)
    }

    pub(crate) fn add_converter(
        self,
        entry: ConverterEntry,
    ) -> Result<&'static ConverterEntry, MetaError> {
        let mut members = self.members_mut();
        if members.converters.iter().any(|c| c.to() == entry.to()) {
            return Err(MetaError::DuplicateConverter {
                type_name: self.type_name(),
                target: entry.to().type_name(),
            });
        }
        let entry = leak_entry(entry);
        members.converters.push(entry);
        Ok(entry)
    }

    pub(crate) fn add_function(
        self,
        entry: FunctionEntry,
    ) -> Result<&'static FunctionEntry, MetaError> {
        let mut members = self.members_mut();
        if members.functions.iter().any(|f| f.name() == entry.name()) {
            return Err(MetaError::DuplicateFunction {
                type_name: self.type_name(),
                name: entry.name(),
            });
        }
        let entry = leak_entry(entry);
        members.functions.push(entry);
        Ok(entry)
    }

    pub(crate) fn add_property(
        self,
        entry: PropertyEntry,
    ) -> Result<&'static PropertyEntry, MetaError> {
        let mut members = self.members_mut();
        if members.properties.iter().any(|p| p.name() == entry.name()) {
            return Err(MetaError::DuplicateProperty {
                type_name: self.type_name(),
                name: entry.name(),
            });
        }
        let entry = leak_entry(entry);
        members.properties.push(entry);
        Ok(entry)
    }

    pub(crate) fn add_signal(self, entry: SignalEntry) -> Result<&'static SignalEntry, MetaError> {
        let mut members = self.members_mut();
        if members
            .signals
            .iter()
            .any(|s| s.name() == entry.name() || s.identity() == entry.identity())
        {
            return Err(MetaError::DuplicateSignal {
                type_name: self.type_name(),
                name: entry.name(),
            });
        }
        let entry = leak_entry(entry);
        members.signals.push(entry);
        Ok(entry)
    }

    /// Drops the name and every registered member.
    ///
    /// Member entries stay allocated, so outstanding references remain valid.
    pub(crate) fn clear(self) {
        self.0.name.store(0, Ordering::Release);
        *self.members_mut() = Members::default();
    }
}

fn leak_entry<E>(entry: E) -> &'static E {
    alloc::boxed::Box::leak(alloc::boxed::Box::new(entry))
}

// Lookup.
impl Type {
    /// Finds a direct or transitive base with the given id.
    ///
    /// Direct bases are checked before recursing.
    pub fn find_base(self, target: TypeId) -> Option<Type> {
        let bases = self.bases();
        if let Some(&base) = bases.iter().find(|b| b.type_id() == target) {
            return Some(base);
        }
        bases.into_iter().find_map(|b| b.find_base(target))
    }

    /// Returns `true` if the type is `target` or has it as a base.
    pub fn is_castable_to(self, target: TypeId) -> bool {
        self.type_id() == target || self.find_base(target).is_some()
    }

    /// The chain of base links from `self` down to `target`.
    fn base_path(self, target: TypeId) -> Option<Vec<BaseEntry>> {
        let bases = self.members().bases.clone();
        for base in bases {
            if base.ty.type_id() == target {
                return Some(alloc::vec![base]);
            }
            if let Some(mut rest) = base.ty.base_path(target) {
                rest.insert(0, base);
                return Some(rest);
            }
        }
        None
    }

    /// Projects storage of this type to storage of `target`.
    pub(crate) fn upcast<'p>(self, ptr: Ptr<'p>, target: TypeId) -> Option<Ptr<'p>> {
        if self.type_id() == target {
            return Some(ptr);
        }
        let path = self.base_path(target)?;
        // SAFETY: each link is applied to storage of the type it was registered on.
        Some(path.iter().fold(ptr, |ptr, link| unsafe { (link.upcast)(ptr) }))
    }

    /// Mutable form of [`upcast`](Self::upcast).
    pub(crate) fn upcast_mut<'p>(self, ptr: PtrMut<'p>, target: TypeId) -> Option<PtrMut<'p>> {
        if self.type_id() == target {
            return Some(ptr);
        }
        let path = self.base_path(target)?;
        // SAFETY: each link is applied to storage of the type it was registered on.
        Some(path.iter().fold(ptr, |ptr, link| unsafe { (link.upcast_mut)(ptr) }))
    }

    /// Best-match constructor for the given argument types.
    ///
    /// Candidates with a different arity are skipped. Each position scores
    /// one point on an exact match. A mismatch is accepted only if the
    /// provided type converts to the expected one, otherwise the candidate is
    /// rejected. A perfect score returns immediately; else the first highest
    /// scoring viable candidate wins.
    pub fn find_constructor(self, args: &[Type]) -> Option<&'static ConstructorEntry> {
        let mut best: Option<(&'static ConstructorEntry, usize)> = None;

        for ctor in self.constructors() {
            if ctor.arg_count() != args.len() {
                continue;
            }
            let mut score = 0;
            let mut viable = true;
            for (&expected, &provided) in ctor.arg_types().iter().zip(args) {
                if expected == provided {
                    score += 1;
                } else if provided.find_converter(expected).is_none() {
                    viable = false;
                    break;
                }
            }
            if !viable {
                continue;
            }
            if score == args.len() {
                return Some(ctor);
            }
            if best.is_none_or(|(_, best_score)| best_score < score) {
                best = Some((ctor, score));
            }
        }
        best.map(|(ctor, _)| ctor)
    }

    /// Converter to `target`. Only this type's own converters are searched.
    pub fn find_converter(self, target: Type) -> Option<&'static ConverterEntry> {
        self.find_converter_by_id(target.type_id())
    }

    /// Converter to the type with id `target`.
    pub fn find_converter_by_id(self, target: TypeId) -> Option<&'static ConverterEntry> {
        self.members()
            .converters
            .iter()
            .find(|c| c.to().type_id() == target)
            .copied()
    }

    /// Searches this type, then its bases depth-first.
    fn find_in_hierarchy<E: 'static>(
        self,
        local: impl Fn(&Members) -> Option<&'static E> + Copy,
    ) -> Option<&'static E> {
        let (found, bases) = {
            let members = self.members();
            (local(&members), members.bases.clone())
        };
        found.or_else(|| bases.iter().find_map(|b| b.ty.find_in_hierarchy(local)))
    }

    /// Function by name, searching bases depth-first after this type.
    pub fn find_function(self, name: impl Into<HashedName>) -> Option<&'static FunctionEntry> {
        let name = name.into();
        self.find_in_hierarchy(|m| m.functions.iter().find(|f| f.name() == name).copied())
    }

    /// Property by name, searching bases depth-first after this type.
    pub fn find_property(self, name: impl Into<HashedName>) -> Option<&'static PropertyEntry> {
        let name = name.into();
        self.find_in_hierarchy(|m| m.properties.iter().find(|p| p.name() == name).copied())
    }

    /// Signal by name, searching bases depth-first after this type.
    pub fn find_signal(self, name: impl Into<HashedName>) -> Option<&'static SignalEntry> {
        let name = name.into();
        self.find_in_hierarchy(|m| m.signals.iter().find(|s| s.name() == name).copied())
    }

    /// Signal by its declaring marker type.
    pub fn find_signal_of<S: SignalSignature>(self) -> Option<&'static SignalEntry> {
        let identity = TypeId::of::<S>();
        self.find_in_hierarchy(|m| m.signals.iter().find(|s| s.identity() == identity).copied())
    }
}
