use core::fmt;
use core::hash::BuildHasher;

use super::FixedHashState;

/// A deterministic 64-bit hash of an identifier.
///
/// Names are looked up by hash only; collisions are not detected, so
/// the first match wins. `0` is reserved for "no name" and never
/// produced by [`HashedName::new`].
///
/// # Examples
///
/// ```
/// use vc_utils::hash::HashedName;
///
/// let a = HashedName::new("position");
/// let b: HashedName = "position".into();
/// assert_eq!(a, b);
/// assert_ne!(a, HashedName::NONE);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct HashedName(u64);

impl HashedName {
    /// The hash of an unnamed entity.
    pub const NONE: Self = Self(0);

    /// Hashes `name` with [`FixedHashState`].
    #[inline]
    pub fn new(name: &str) -> Self {
        match FixedHashState.hash_one(name) {
            0 => Self(1),
            hash => Self(hash),
        }
    }

    /// Wraps an already computed hash.
    #[inline(always)]
    pub const fn from_raw(hash: u64) -> Self {
        Self(hash)
    }

    /// The raw hash value.
    #[inline(always)]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` for [`HashedName::NONE`].
    #[inline(always)]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<&str> for HashedName {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for HashedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashedName({:#018x})", self.0)
    }
}

impl fmt::Display for HashedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
