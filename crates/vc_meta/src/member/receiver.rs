#![expect(unsafe_code, reason = "Receivers reinterpret erased instance storage.")]

use vc_ptr::{Ptr, PtrMut};
use vc_utils::hash::HashedName;

use crate::descriptor::Type;
use crate::error::MetaError;
use crate::variant::Variant;

/// The instance an erased member thunk runs on.
///
/// Built only by [`shared_receiver`] and [`exclusive_receiver`], which
/// project the instance to the member's owner type first.
pub(crate) enum Receiver<'r> {
    None,
    Shared(Ptr<'r>),
    Exclusive(PtrMut<'r>),
}

impl<'r> Receiver<'r> {
    /// # Safety
    ///
    /// The receiver must have been built for owner type `T`.
    pub(crate) unsafe fn shared<T>(self, member: HashedName) -> Result<&'r T, MetaError> {
        match self {
            // SAFETY: guaranteed by the caller.
            Self::Shared(ptr) => Ok(unsafe { ptr.as_ref::<T>() }),
            // SAFETY: guaranteed by the caller.
            Self::Exclusive(ptr) => Ok(unsafe { ptr.consume::<T>() }),
            Self::None => Err(MetaError::InstanceRequired { name: member }),
        }
    }

    /// # Safety
    ///
    /// The receiver must have been built for owner type `T`.
    pub(crate) unsafe fn exclusive<T>(self, member: HashedName) -> Result<&'r mut T, MetaError> {
        match self {
            // SAFETY: guaranteed by the caller.
            Self::Exclusive(ptr) => Ok(unsafe { ptr.consume::<T>() }),
            Self::Shared(_) => Err(MetaError::ConstViolation {
                type_name: core::any::type_name::<T>(),
            }),
            Self::None => Err(MetaError::InstanceRequired { name: member }),
        }
    }
}

pub(crate) fn shared_receiver<'v>(
    instance: &'v Variant<'_>,
    owner: Type,
    member: HashedName,
) -> Result<Receiver<'v>, MetaError> {
    let (Some(ty), Some(ptr)) = (instance.ty(), instance.data()) else {
        return Err(MetaError::InstanceRequired { name: member });
    };
    ty.upcast(ptr, owner.type_id())
        .map(Receiver::Shared)
        .ok_or(MetaError::BadCast {
            from: ty.type_name(),
            to: owner.type_name(),
        })
}

pub(crate) fn exclusive_receiver<'v>(
    instance: &'v mut Variant<'_>,
    owner: Type,
    member: HashedName,
) -> Result<Receiver<'v>, MetaError> {
    let ty = instance
        .ty()
        .ok_or(MetaError::InstanceRequired { name: member })?;
    let ptr = instance.data_mut()?;
    ty.upcast_mut(ptr, owner.type_id())
        .map(Receiver::Exclusive)
        .ok_or(MetaError::BadCast {
            from: ty.type_name(),
            to: owner.type_name(),
        })
}
