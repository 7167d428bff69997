use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::{Mutex, PoisonError};
use std::thread::ThreadId;

use vc_utils::hash::HashMap;

use super::arena::SlotIndex;
use super::SignalEntry;
use crate::variant::Variant;

/// One slot invocation waiting for its thread to drain.
pub(crate) struct DelayedCall {
    pub signal: &'static SignalEntry,
    pub slot: SlotIndex,
    pub args: Arc<[Variant<'static>]>,
}

/// Per-thread queues of slot invocations emitted from other threads.
#[derive(Default)]
pub(crate) struct DelayedQueue {
    queues: Mutex<HashMap<ThreadId, Vec<DelayedCall>>>,
}

impl DelayedQueue {
    pub fn push(&self, thread: ThreadId, call: DelayedCall) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.entry(thread).or_default().push(call);
    }

    /// Removes and returns everything queued for `thread`, in emission order.
    pub fn take(&self, thread: ThreadId) -> Vec<DelayedCall> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.remove(&thread).unwrap_or_default()
    }

    pub fn pending(&self, thread: ThreadId) -> usize {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.get(&thread).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
