use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::error::MetaError;
use crate::variant::Variant;

/// An erased slot callable.
pub type SlotFn = dyn Fn(&mut [Variant<'_>]) -> Result<(), MetaError> + Send + Sync;

// -----------------------------------------------------------------------------
// SlotIndex

/// A packed, generation-stamped handle into a [`SlotArena`].
///
/// Bits 32..64 hold the page, 16..32 the slot within the page and 0..16
/// the generation. A handle whose generation no longer matches its slot
/// is stale: every arena operation treats it as absent.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotIndex(u64);

impl SlotIndex {
    #[inline]
    const fn pack(page: usize, slot: u16, generation: u16) -> Self {
        Self(((page as u64) << 32) | ((slot as u64) << 16) | generation as u64)
    }

    /// The page number.
    #[inline]
    pub const fn page(self) -> usize {
        (self.0 >> 32) as usize
    }

    /// The slot within its page.
    #[inline]
    pub const fn slot(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The generation the handle was issued with.
    #[inline]
    pub const fn generation(self) -> u16 {
        self.0 as u16
    }

    /// The packed bits.
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds a handle from [`to_bits`](Self::to_bits).
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotIndex({}:{}v{})", self.page(), self.slot(), self.generation())
    }
}

// -----------------------------------------------------------------------------
// Pages

#[derive(Default)]
struct Slot {
    callable: Option<Arc<SlotFn>>,
    generation: u16,
}

struct Page {
    slots: Box<[Slot]>,
    /// Slots `0..used` have been handed out at least once.
    used: usize,
    free: Vec<u16>,
}

impl Page {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            used: 0,
            free: Vec::new(),
        }
    }

    #[inline]
    fn is_insertable(&self) -> bool {
        self.used < self.slots.len() || !self.free.is_empty()
    }

    /// Fresh slots are taken before recycled ones.
    fn claim(&mut self) -> Option<u16> {
        if self.used < self.slots.len() {
            self.used += 1;
            Some((self.used - 1) as u16)
        } else {
            self.free.pop()
        }
    }
}

// -----------------------------------------------------------------------------
// SlotArena

/// Page-based storage for slot callables with generational handles.
///
/// Pages hold `PAGE_BYTES / size_of::<Slot>()` slots (at least one, at most
/// `u16::MAX`) and are never moved or freed once allocated, so handles stay
/// valid while the arena grows. Removing a slot bumps its generation, which
/// turns every outstanding handle to it into a silent no-op.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_meta::{MetaError, SlotArena, Variant};
///
/// let mut arena: SlotArena = SlotArena::new();
/// let index = arena.insert(Arc::new(|_: &mut [Variant<'_>]| -> Result<(), MetaError> { Ok(()) }));
///
/// assert!(arena.invoke(index, &mut []).is_some());
/// arena.remove(index);
/// assert!(arena.invoke(index, &mut []).is_none());
/// ```
pub struct SlotArena<const PAGE_BYTES: usize = 16384> {
    pages: Vec<Page>,
    last_insertable: usize,
    len: usize,
}

impl<const PAGE_BYTES: usize> SlotArena<PAGE_BYTES> {
    /// Slots per page.
    pub const PAGE_CAPACITY: usize = {
        let n = PAGE_BYTES / size_of::<Slot>();
        if n == 0 {
            1
        } else if n > u16::MAX as usize {
            u16::MAX as usize
        } else {
            n
        }
    };

    /// Creates an empty arena. No page is allocated until the first insert.
    pub const fn new() -> Self {
        Self {
            pages: Vec::new(),
            last_insertable: 0,
            len: 0,
        }
    }

    /// Number of live slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated pages.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Stores `callable` and returns its handle.
    ///
    /// The most recently used page is tried first, then every page in
    /// order, then a new page is appended.
    pub fn insert(&mut self, callable: Arc<SlotFn>) -> SlotIndex {
        let page_index = match self.pages.get(self.last_insertable) {
            Some(page) if page.is_insertable() => self.last_insertable,
            _ => match self.pages.iter().position(Page::is_insertable) {
                Some(index) => index,
                None => {
                    self.pages.push(Page::new(Self::PAGE_CAPACITY));
                    self.pages.len() - 1
                }
            },
        };
        self.last_insertable = page_index;

        let page = &mut self.pages[page_index];
        let Some(slot_index) = page.claim() else {
            unreachable!("page {page_index} was checked insertable");
        };
        let slot = &mut page.slots[slot_index as usize];
        slot.callable = Some(callable);
        self.len += 1;
        SlotIndex::pack(page_index, slot_index, slot.generation)
    }

    fn slot(&self, index: SlotIndex) -> Option<&Slot> {
        let slot = self.pages.get(index.page())?.slots.get(index.slot() as usize)?;
        (slot.generation == index.generation() && slot.callable.is_some()).then_some(slot)
    }

    /// The callable behind a live handle.
    #[inline]
    pub fn get(&self, index: SlotIndex) -> Option<&Arc<SlotFn>> {
        self.slot(index).and_then(|slot| slot.callable.as_ref())
    }

    /// Returns `true` if the handle is live.
    #[inline]
    pub fn contains(&self, index: SlotIndex) -> bool {
        self.slot(index).is_some()
    }

    /// Runs the callable behind `index`. `None` for a stale handle.
    pub fn invoke(
        &self,
        index: SlotIndex,
        args: &mut [Variant<'_>],
    ) -> Option<Result<(), MetaError>> {
        self.get(index).map(|callable| callable(args))
    }

    /// Releases a live slot and returns its callable.
    ///
    /// Stale handles, including a second removal, return `None`.
    pub fn remove(&mut self, index: SlotIndex) -> Option<Arc<SlotFn>> {
        let page_index = index.page();
        let page = self.pages.get_mut(page_index)?;
        let slot = page.slots.get_mut(index.slot() as usize)?;
        if slot.generation != index.generation() {
            return None;
        }
        let callable = slot.callable.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation == 0 {
            log::warn!("slot generation wrapped at {index:?}; very old handles may alias");
        }
        page.free.push(index.slot());
        self.len -= 1;
        if !self.pages[self.last_insertable].is_insertable() {
            self.last_insertable = page_index;
        }
        Some(callable)
    }

    /// Releases every slot. Existing handles become stale; pages are kept.
    pub fn clear(&mut self) {
        for page in &mut self.pages {
            for (index, slot) in page.slots[..page.used].iter_mut().enumerate() {
                if slot.callable.take().is_some() {
                    slot.generation = slot.generation.wrapping_add(1);
                    page.free.push(index as u16);
                }
            }
        }
        self.len = 0;
        self.last_insertable = 0;
    }
}

impl<const PAGE_BYTES: usize> Default for SlotArena<PAGE_BYTES> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<const PAGE_BYTES: usize> fmt::Debug for SlotArena<PAGE_BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArena")
            .field("len", &self.len)
            .field("pages", &self.pages.len())
            .field("page_capacity", &Self::PAGE_CAPACITY)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::{SlotArena, SlotFn, SlotIndex};
    use crate::{MetaError, Variant};

    fn counting(counter: &Arc<AtomicUsize>) -> Arc<SlotFn> {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &mut [Variant<'_>]| -> Result<(), MetaError> {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    #[test]
    fn index_packing_keeps_every_field() {
        let index = SlotIndex::pack(70_000, 513, 9);
        assert_eq!(index.page(), 70_000);
        assert_eq!(index.slot(), 513);
        assert_eq!(index.generation(), 9);
        assert_eq!(SlotIndex::from_bits(index.to_bits()), index);
    }

    #[test]
    fn removed_slots_do_not_run_even_after_reuse() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut arena: SlotArena<64> = SlotArena::new();

        let stale = arena.insert(counting(&first));
        assert_eq!(arena.invoke(stale, &mut []), Some(Ok(())));
        assert!(arena.remove(stale).is_some());
        assert!(arena.remove(stale).is_none());

        // Fill the page so the freed slot is recycled.
        let fresh: Vec<_> = (0..SlotArena::<64>::PAGE_CAPACITY)
            .map(|_| arena.insert(counting(&second)))
            .collect();
        assert!(fresh.iter().any(|i| i.page() == stale.page() && i.slot() == stale.slot()));

        assert_eq!(arena.invoke(stale, &mut []), None);
        assert_eq!(first.load(Ordering::Relaxed), 1);
        assert_eq!(second.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn fresh_slots_are_preferred_over_free_list() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut arena: SlotArena = SlotArena::new();

        let a = arena.insert(counting(&counter));
        arena.remove(a);
        let b = arena.insert(counting(&counter));
        assert_eq!(b.slot(), 1);
    }

    #[test]
    fn many_pages_stay_addressable() {
        type Small = SlotArena<128>;
        let counter = Arc::new(AtomicUsize::new(0));
        let mut arena = Small::new();
        let total = Small::PAGE_CAPACITY * 4 + 1;

        let indices: Vec<_> = (0..total).map(|_| arena.insert(counting(&counter))).collect();
        assert_eq!(arena.len(), total);
        assert_eq!(arena.page_count(), 5);

        for index in indices.iter().step_by(2) {
            arena.remove(*index);
        }
        for index in &indices {
            let _ = arena.invoke(*index, &mut []);
        }
        assert_eq!(counter.load(Ordering::Relaxed), total / 2);

        arena.clear();
        assert!(arena.is_empty());
        assert!(indices.iter().all(|i| !arena.contains(*i)));
    }

    #[test]
    fn page_capacity_is_clamped() {
        assert_eq!(SlotArena::<0>::PAGE_CAPACITY, 1);
        assert_eq!(SlotArena::<{ usize::MAX }>::PAGE_CAPACITY, u16::MAX as usize);
    }
}
