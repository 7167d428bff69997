//! The [`TypeRegistry`] and the [`TypeFactory`] builder used to describe a type.

// -----------------------------------------------------------------------------
// Modules

mod factory;

// -----------------------------------------------------------------------------
// Exports

pub use factory::TypeFactory;

// -----------------------------------------------------------------------------
// Imports

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;
use std::sync::{PoisonError, RwLock};
use std::thread;

use vc_utils::TypeIdMap;
use vc_utils::hash::{HashMap, HashedName, NoOpHashState};

use crate::descriptor::{Type, TypeDescriptor};
use crate::error::MetaError;
use crate::member::{ArgList, ConstructorEntry};
use crate::signal::DelayedQueue;
use crate::value::Value;
use crate::variant::Variant;

// -----------------------------------------------------------------------------
// TypeRegistry

/// Owns every [`TypeDescriptor`] and indexes the named ones.
///
/// A descriptor is created the first time its type is
/// [`resolve`](Self::resolve)d and is never freed, so [`Type`] handles and
/// member entries stay valid for the rest of the process. Registration
/// gives a type a [`HashedName`] and returns a [`TypeFactory`] to describe
/// it. Registration is a setup phase; lookups, invocations and signals may
/// then be used from any thread.
///
/// # Examples
///
/// ```
/// use vc_meta::{MetaError, TypeRegistry};
///
/// #[derive(Default, Clone)]
/// struct Counter {
///     value: i32,
/// }
///
/// # fn main() -> Result<(), MetaError> {
/// let registry = TypeRegistry::new();
/// registry
///     .register::<Counter>("Counter")?
///     .with_default()
///     .constructor(|value: i32| Counter { value })?
///     .method_mut("bump", |c: &mut Counter, by: i32| c.value += by)?;
///
/// let ty = registry.find_type("Counter").unwrap();
/// let mut counter = ty.find_constructor(&[registry.resolve::<i32>()]).unwrap()
///     .invoke(&mut [registry.value(40i32)])?;
///
/// ty.find_function("bump").unwrap().invoke_mut(&mut counter, &mut [registry.value(2i32)])?;
/// assert_eq!(counter.cast::<Counter>()?.value, 42);
/// # Ok(())
/// # }
/// ```
pub struct TypeRegistry {
    ids: RwLock<TypeIdMap<Type>>,
    names: RwLock<HashMap<HashedName, Type, NoOpHashState>>,
    templates: RwLock<HashMap<HashedName, Vec<Type>, NoOpHashState>>,
    delayed: Arc<DelayedQueue>,
}

impl Default for TypeRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates an empty registry. Built-in types are added by
    /// [`register_builtins`](crate::register_builtins).
    pub fn new() -> Self {
        Self {
            ids: RwLock::new(TypeIdMap::new()),
            names: RwLock::new(HashMap::with_hasher(NoOpHashState)),
            templates: RwLock::new(HashMap::with_hasher(NoOpHashState)),
            delayed: Arc::new(DelayedQueue::default()),
        }
    }

    pub(crate) fn delayed_queue(&self) -> &Arc<DelayedQueue> {
        &self.delayed
    }

    /// The descriptor of `T`, created on first use.
    pub fn resolve<T: Value>(&self) -> Type {
        let id = TypeId::of::<T>();
        if let Some(&ty) = self.ids.read().unwrap_or_else(PoisonError::into_inner).get(&id) {
            return ty;
        }
        *self
            .ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(id, || {
                Type::from_static(Box::leak(Box::new(TypeDescriptor::new::<T>())))
            })
    }

    /// The descriptor of `()`, used as the return type of void functions.
    #[inline]
    pub fn void(&self) -> Type {
        self.resolve::<()>()
    }

    /// Names `T` and returns a factory to describe it.
    ///
    /// When two types share a hashed name, name lookup keeps the first.
    ///
    /// # Errors
    ///
    /// [`MetaError::AlreadyRegistered`] if `T` already has a name.
    pub fn register<T: Value>(
        &self,
        name: impl Into<HashedName>,
    ) -> Result<TypeFactory<'_, T>, MetaError> {
        let name = name.into();
        let ty = self.resolve::<T>();
        ty.assign_name(name)?;
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_insert(ty);

        log::debug!("registered `{}` as {name}", ty.type_name());
        Ok(TypeFactory::new(self, ty))
    }

    /// Registers `T` as a specialization of the template named `template`.
    ///
    /// # Errors
    ///
    /// As [`register`](Self::register).
    pub fn register_specialization<T: Value>(
        &self,
        name: impl Into<HashedName>,
        template: impl Into<HashedName>,
    ) -> Result<TypeFactory<'_, T>, MetaError> {
        let factory = self.register::<T>(name)?;
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(template.into())
            .or_default()
            .push(factory.ty());
        Ok(factory)
    }

    /// Registered specializations of a template, in registration order.
    pub fn specializations(&self, template: impl Into<HashedName>) -> Vec<Type> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&template.into())
            .cloned()
            .unwrap_or_default()
    }

    /// A factory for `T` without naming it.
    #[inline]
    pub fn factory<T: Value>(&self) -> TypeFactory<'_, T> {
        TypeFactory::new(self, self.resolve::<T>())
    }

    /// A registered type by name.
    pub fn find_type(&self, name: impl Into<HashedName>) -> Option<Type> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.into())
            .copied()
    }

    /// A resolved type by id.
    pub fn find_type_by_id(&self, id: TypeId) -> Option<Type> {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    /// Every type that currently has a name.
    pub fn types(&self) -> Vec<Type> {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .copied()
            .filter(|ty| ty.is_registered())
            .collect()
    }

    /// An owned variant holding `value`.
    #[inline]
    pub fn value<T: Value>(&self, value: T) -> Variant<'static> {
        Variant::with_value(self.resolve::<T>(), value)
    }

    /// A variant referencing `value` immutably.
    #[inline]
    pub fn reference<'a, T: Value>(&self, value: &'a T) -> Variant<'a> {
        Variant::from_ref(self.resolve::<T>(), value)
    }

    /// A variant referencing `value` mutably.
    #[inline]
    pub fn reference_mut<'a, T: Value>(&self, value: &'a mut T) -> Variant<'a> {
        Variant::from_mut(self.resolve::<T>(), value)
    }

    /// Best-match constructor of `T` for the argument tuple `Args`.
    pub fn find_constructor<T: Value, Args: ArgList>(&self) -> Option<&'static ConstructorEntry> {
        self.resolve::<T>().find_constructor(&Args::types(self))
    }

    /// Number of delayed slot calls queued for the current thread.
    pub fn pending_delayed_slots(&self) -> usize {
        self.delayed.pending(thread::current().id())
    }

    /// Runs every slot call queued for the current thread by other threads.
    ///
    /// Calls whose connection was removed in the meantime are skipped
    /// silently. A failing slot is logged and does not stop the others.
    ///
    /// # Errors
    ///
    /// The first error returned by a slot. Otherwise the number of slots run.
    pub fn process_delayed_slots(&self) -> Result<usize, MetaError> {
        let calls = self.delayed.take(thread::current().id());
        let mut ran = 0;
        let mut first_error = None;

        for call in calls {
            match call.signal.invoke_slot(call.slot, &call.args) {
                None => {}
                Some(Ok(())) => ran += 1,
                Some(Err(err)) => {
                    log::error!("delayed slot of signal {} failed: {err}", call.signal.name());
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(ran), Err)
    }

    /// Forgets every name, member, template group and queued delayed call.
    ///
    /// Descriptors stay allocated and keep their operation tables, so
    /// existing [`Type`] handles remain valid and types can be registered
    /// again.
    pub fn clear(&self) {
        for ty in self.ids.read().unwrap_or_else(PoisonError::into_inner).values() {
            ty.clear();
        }
        self.names.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.templates.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.delayed.clear();
        log::debug!("type registry cleared");
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::TypeRegistry;
    use crate::MetaError;

    struct Vec2;
    struct Vec3;

    #[test]
    fn resolve_returns_one_descriptor_per_type() {
        let registry = TypeRegistry::new();
        let a = registry.resolve::<String>();
        assert_eq!(a, registry.resolve::<String>());
        assert_ne!(a, registry.resolve::<u32>());
        assert!(!a.is_registered());
    }

    #[test]
    fn registering_twice_fails() {
        let registry = TypeRegistry::new();
        assert!(registry.register::<Vec2>("Vec2").is_ok());
        assert!(matches!(
            registry.register::<Vec2>("Other"),
            Err(MetaError::AlreadyRegistered { .. })
        ));
        assert_eq!(registry.find_type("Vec2"), Some(registry.resolve::<Vec2>()));
        assert_eq!(registry.find_type("Other"), None);
    }

    #[test]
    fn specializations_are_grouped_by_template() {
        let registry = TypeRegistry::new();
        registry.register_specialization::<Vec2>("Vec2", "Vec").unwrap();
        registry.register_specialization::<Vec3>("Vec3", "Vec").unwrap();

        assert_eq!(
            registry.specializations("Vec"),
            [registry.resolve::<Vec2>(), registry.resolve::<Vec3>()]
        );
        assert!(registry.specializations("Mat").is_empty());
    }

    #[test]
    fn clear_allows_registering_again() {
        let registry = TypeRegistry::new();
        let ty = registry.register::<Vec2>("Vec2").unwrap().ty();
        registry.clear();

        assert!(!ty.is_registered());
        assert_eq!(registry.find_type("Vec2"), None);
        assert!(registry.types().is_empty());

        registry.register::<Vec2>("Vec2").unwrap();
        assert_eq!(registry.find_type("Vec2"), Some(ty));
    }

    #[test]
    fn void_is_flagged() {
        let registry = TypeRegistry::new();
        assert!(registry.void().is_void());
    }
}
