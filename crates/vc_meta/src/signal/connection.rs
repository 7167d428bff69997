use core::fmt;

use super::arena::SlotIndex;
use super::SignalEntry;

/// An active subscription. Dropping it disconnects the slot.
///
/// Disconnecting is idempotent, and a handle whose slot was already removed
/// through [`SignalEntry::disconnect`] does nothing.
#[must_use = "dropping a `Connection` disconnects it immediately"]
pub struct Connection {
    signal: Option<&'static SignalEntry>,
    slot: SlotIndex,
}

impl Connection {
    #[inline]
    pub(crate) fn new(signal: &'static SignalEntry, slot: SlotIndex) -> Self {
        Self {
            signal: Some(signal),
            slot,
        }
    }

    /// The arena handle of the slot.
    #[inline]
    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    /// The signal, until the handle is disconnected or detached.
    #[inline]
    pub fn signal(&self) -> Option<&'static SignalEntry> {
        self.signal
    }

    /// Returns `true` while the slot is still connected.
    pub fn is_connected(&self) -> bool {
        self.signal.is_some_and(|signal| signal.contains_slot(self.slot))
    }

    /// Removes the slot. Returns `true` if this call removed it.
    pub fn disconnect(&mut self) -> bool {
        self.signal
            .take()
            .is_some_and(|signal| signal.disconnect_slot(self.slot))
    }

    /// Keeps the slot connected past the handle's lifetime.
    ///
    /// The slot can still be removed with [`SignalEntry::disconnect`] or
    /// [`SignalEntry::disconnect_slot`].
    pub fn detach(mut self) -> SlotIndex {
        self.signal = None;
        self.slot
    }
}

impl Drop for Connection {
    #[inline]
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("signal", &self.signal.map(SignalEntry::name))
            .field("slot", &self.slot)
            .finish()
    }
}
