#![expect(unsafe_code, reason = "Accessor thunks reinterpret their receiver.")]

use alloc::boxed::Box;
use core::fmt;

use vc_utils::hash::HashedName;

use super::{Receiver, exclusive_receiver, shared_receiver, take_arg, wrap_return};
use crate::descriptor::Type;
use crate::error::MetaError;
use crate::registry::TypeRegistry;
use crate::signal::SignalEntry;
use crate::value::{ObjectId, Value};
use crate::variant::Variant;

type GetFn = dyn for<'r> Fn(Receiver<'r>) -> Result<Variant<'static>, MetaError> + Send + Sync;
type SetFn =
    dyn for<'r> Fn(Receiver<'r>, &mut Variant<'_>) -> Result<(), MetaError> + Send + Sync;

/// A named value read and written through accessor functions.
///
/// Setter and getter share the value type. Without a setter the property
/// is read-only. A property linked to a signal emits it with the new value
/// after every successful set; the sender is the instance, or
/// [`ObjectId::NONE`] for static properties.
pub struct PropertyEntry {
    name: HashedName,
    owner: Type,
    value_type: Type,
    is_static: bool,
    getter: Box<GetFn>,
    setter: Option<Box<SetFn>>,
    signal: Option<&'static SignalEntry>,
}

impl PropertyEntry {
    pub(crate) fn instance<T, P>(
        registry: &TypeRegistry,
        owner: Type,
        name: HashedName,
        get: impl Fn(&T) -> P + Send + Sync + 'static,
    ) -> Self
    where
        T: Value,
        P: Value,
    {
        let value_type = registry.resolve::<P>();
        Self {
            name,
            owner,
            value_type,
            is_static: false,
            getter: Box::new(
                move |receiver: Receiver<'_>| -> Result<Variant<'static>, MetaError> {
                    // SAFETY: receivers are projected to `owner`, which describes `T`.
                    let this = unsafe { receiver.shared::<T>(name)? };
                    Ok(wrap_return(value_type, get(this)))
                },
            ),
            setter: None,
            signal: None,
        }
    }

    pub(crate) fn with_instance_setter<T, P>(
        mut self,
        set: impl Fn(&mut T, P) + Send + Sync + 'static,
    ) -> Self
    where
        T: Value,
        P: Value,
    {
        let name = self.name;
        self.setter = Some(Box::new(
            move |receiver: Receiver<'_>, value: &mut Variant<'_>| -> Result<(), MetaError> {
                let value = take_arg::<P>(value, 0)?;
                // SAFETY: receivers are projected to `owner`, which describes `T`.
                let this = unsafe { receiver.exclusive::<T>(name)? };
                set(this, value);
                Ok(())
            },
        ));
        self
    }

    pub(crate) fn global<P: Value>(
        registry: &TypeRegistry,
        owner: Type,
        name: HashedName,
        get: impl Fn() -> P + Send + Sync + 'static,
    ) -> Self {
        let value_type = registry.resolve::<P>();
        Self {
            name,
            owner,
            value_type,
            is_static: true,
            getter: Box::new(
                move |_: Receiver<'_>| -> Result<Variant<'static>, MetaError> {
                    Ok(wrap_return(value_type, get()))
                },
            ),
            setter: None,
            signal: None,
        }
    }

    pub(crate) fn with_global_setter<P: Value>(
        mut self,
        set: impl Fn(P) + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Box::new(
            move |_: Receiver<'_>, value: &mut Variant<'_>| -> Result<(), MetaError> {
                set(take_arg::<P>(value, 0)?);
                Ok(())
            },
        ));
        self
    }

    pub(crate) fn with_signal(mut self, signal: &'static SignalEntry) -> Self {
        self.signal = Some(signal);
        self
    }

    /// The hashed name.
    #[inline]
    pub fn name(&self) -> HashedName {
        self.name
    }

    /// The type the property was registered on.
    #[inline]
    pub fn owner(&self) -> Type {
        self.owner
    }

    /// Type returned by the getter and taken by the setter.
    #[inline]
    pub fn value_type(&self) -> Type {
        self.value_type
    }

    /// Needs no instance.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Has no setter.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// The signal emitted after a set, if any.
    #[inline]
    pub fn signal(&self) -> Option<&'static SignalEntry> {
        self.signal
    }

    /// Reads the property. Static properties ignore `instance`.
    ///
    /// # Errors
    ///
    /// [`MetaError::InstanceRequired`] or [`MetaError::BadCast`].
    pub fn get(&self, instance: &Variant<'_>) -> Result<Variant<'static>, MetaError> {
        let receiver = if self.is_static {
            Receiver::None
        } else {
            shared_receiver(instance, self.owner, self.name)?
        };
        (self.getter)(receiver)
    }

    /// Reads a static property.
    ///
    /// # Errors
    ///
    /// [`MetaError::InstanceRequired`] for instance properties.
    pub fn get_static(&self) -> Result<Variant<'static>, MetaError> {
        (self.getter)(Receiver::None)
    }

    /// Writes the property, converting `value` if needed, then emits the
    /// linked signal.
    ///
    /// # Errors
    ///
    /// [`MetaError::ReadOnlyProperty`], a receiver error, an argument
    /// error, or an error from the linked signal.
    pub fn set(&self, instance: &mut Variant<'_>, mut value: Variant<'_>) -> Result<(), MetaError> {
        let setter = self
            .setter
            .as_ref()
            .ok_or(MetaError::ReadOnlyProperty { name: self.name })?;
        if self.is_static {
            setter(Receiver::None, &mut value)?;
            return self.notify(ObjectId::NONE, Receiver::None);
        }
        setter(exclusive_receiver(instance, self.owner, self.name)?, &mut value)?;
        let sender = instance.object_id();
        self.notify(sender, shared_receiver(instance, self.owner, self.name)?)
    }

    /// Writes a static property.
    ///
    /// # Errors
    ///
    /// As [`set`](Self::set), plus [`MetaError::InstanceRequired`] for
    /// instance properties.
    pub fn set_static(&self, mut value: Variant<'_>) -> Result<(), MetaError> {
        if !self.is_static {
            return Err(MetaError::InstanceRequired { name: self.name });
        }
        let setter = self
            .setter
            .as_ref()
            .ok_or(MetaError::ReadOnlyProperty { name: self.name })?;
        setter(Receiver::None, &mut value)?;
        self.notify(ObjectId::NONE, Receiver::None)
    }

    fn notify(&self, sender: ObjectId, receiver: Receiver<'_>) -> Result<(), MetaError> {
        let Some(signal) = self.signal else {
            return Ok(());
        };
        let current = (self.getter)(receiver)?;
        signal.emit(sender, core::slice::from_ref(&current))
    }
}

impl fmt::Debug for PropertyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyEntry")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("value_type", &self.value_type)
            .field("is_static", &self.is_static)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
