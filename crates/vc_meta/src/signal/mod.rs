//! Signals: typed events declared on a type, with generational slot
//! storage and cross-thread delayed delivery.
//!
//! A connection remembers the thread that made it. Emitting on that thread
//! runs the slot inline with borrowed arguments. Emitting anywhere else
//! deep-copies the arguments once per emission and queues the call for the
//! owning thread, which runs it from
//! [`TypeRegistry::process_delayed_slots`](crate::TypeRegistry::process_delayed_slots).

// -----------------------------------------------------------------------------
// Modules

mod arena;
mod connection;
mod delayed;

// -----------------------------------------------------------------------------
// Exports

pub use arena::{SlotArena, SlotFn, SlotIndex};
pub use connection::Connection;

pub(crate) use delayed::{DelayedCall, DelayedQueue};

// -----------------------------------------------------------------------------
// Imports

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};

use vc_utils::hash::HashedName;

use crate::descriptor::Type;
use crate::error::{MetaError, check_arity};
use crate::member::{ArgList, StaticFunction};
use crate::registry::TypeRegistry;
use crate::value::ObjectId;
use crate::variant::Variant;

// -----------------------------------------------------------------------------
// SignalSignature

/// Declares a signal. The implementing marker type is the signal's identity.
///
/// # Examples
///
/// ```
/// use vc_meta::SignalSignature;
///
/// struct Resized;
///
/// impl SignalSignature for Resized {
///     type Args = (u32, u32);
/// }
/// ```
pub trait SignalSignature: 'static {
    /// Argument types carried by each emission.
    type Args: ArgList;
}

// -----------------------------------------------------------------------------
// SignalEntry

struct ConnectionRecord {
    sender: ObjectId,
    receiver: ObjectId,
    slot: SlotIndex,
    thread: ThreadId,
}

#[derive(Default)]
struct ConnectionTable {
    arena: SlotArena,
    /// In connection order.
    records: Vec<ConnectionRecord>,
}

/// A signal registered on a type.
///
/// Connections are guarded by one reader/writer lock: connecting and
/// disconnecting take it exclusively, emitting takes it shared only long
/// enough to collect the targets. Slots never run under the lock, so a slot
/// may connect, disconnect or emit freely.
pub struct SignalEntry {
    name: HashedName,
    owner: Type,
    identity: TypeId,
    arg_types: Vec<Type>,
    arg_names: Vec<HashedName>,
    table: RwLock<ConnectionTable>,
    delayed: Arc<DelayedQueue>,
}

impl SignalEntry {
    pub(crate) fn new<S: SignalSignature>(
        registry: &TypeRegistry,
        owner: Type,
        name: HashedName,
        arg_names: &[&str],
    ) -> Result<Self, MetaError> {
        if !arg_names.is_empty() {
            check_arity(S::Args::ARITY, arg_names.len())?;
        }
        Ok(Self {
            name,
            owner,
            identity: TypeId::of::<S>(),
            arg_types: S::Args::types(registry),
            arg_names: arg_names.iter().map(|n| HashedName::new(n)).collect(),
            table: RwLock::new(ConnectionTable::default()),
            delayed: Arc::clone(registry.delayed_queue()),
        })
    }

    fn table(&self) -> RwLockReadGuard<'_, ConnectionTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn table_mut(&self) -> RwLockWriteGuard<'_, ConnectionTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The hashed name.
    #[inline]
    pub fn name(&self) -> HashedName {
        self.name
    }

    /// The type the signal was registered on.
    #[inline]
    pub fn owner(&self) -> Type {
        self.owner
    }

    /// The [`TypeId`] of the declaring [`SignalSignature`] marker.
    #[inline]
    pub fn identity(&self) -> TypeId {
        self.identity
    }

    /// Returns `true` if `S` declared this signal.
    #[inline]
    pub fn is<S: SignalSignature>(&self) -> bool {
        self.identity == TypeId::of::<S>()
    }

    /// Number of arguments per emission.
    #[inline]
    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    /// Argument types in order.
    #[inline]
    pub fn arg_types(&self) -> &[Type] {
        &self.arg_types
    }

    /// Argument names, empty if none were given.
    #[inline]
    pub fn arg_names(&self) -> &[HashedName] {
        &self.arg_names
    }

    /// Number of live connections, over all senders.
    pub fn connection_count(&self) -> usize {
        self.table().arena.len()
    }

    /// Connects `slot` to emissions from `sender`.
    ///
    /// # Errors
    ///
    /// [`MetaError::ArityMismatch`] if the slot takes a different number of
    /// arguments than the signal carries.
    pub fn connect<F, M>(&'static self, sender: ObjectId, slot: F) -> Result<Connection, MetaError>
    where
        F: StaticFunction<M>,
    {
        self.connect_to(sender, ObjectId::NONE, slot)
    }

    /// Like [`connect`](Self::connect), also recording a receiver so the
    /// connection can be removed with [`disconnect`](Self::disconnect).
    ///
    /// # Errors
    ///
    /// [`MetaError::ArityMismatch`].
    pub fn connect_to<F, M>(
        &'static self,
        sender: ObjectId,
        receiver: ObjectId,
        slot: F,
    ) -> Result<Connection, MetaError>
    where
        F: StaticFunction<M>,
    {
        check_arity(self.arg_count(), F::ARITY)?;
        let callable: Arc<SlotFn> =
            Arc::new(move |args: &mut [Variant<'_>]| -> Result<(), MetaError> {
                slot.call(args).map(drop)
            });

        let mut table = self.table_mut();
        let index = table.arena.insert(callable);
        table.records.push(ConnectionRecord {
            sender,
            receiver,
            slot: index,
            thread: thread::current().id(),
        });
        Ok(Connection::new(self, index))
    }

    /// Removes every connection from `sender` to `receiver`.
    /// Returns how many were removed.
    pub fn disconnect(&self, sender: ObjectId, receiver: ObjectId) -> usize {
        self.disconnect_where(|r| r.sender == sender && r.receiver == receiver)
    }

    /// Removes every connection from `sender`. Returns how many were removed.
    pub fn disconnect_sender(&self, sender: ObjectId) -> usize {
        self.disconnect_where(|r| r.sender == sender)
    }

    /// Removes one connection. `false` if it was already gone.
    pub fn disconnect_slot(&self, slot: SlotIndex) -> bool {
        self.disconnect_where(|r| r.slot == slot) != 0
    }

    fn disconnect_where(&self, mut matches: impl FnMut(&ConnectionRecord) -> bool) -> usize {
        let mut table = self.table_mut();
        let ConnectionTable { arena, records } = &mut *table;
        let before = records.len();
        records.retain(|record| {
            if matches(record) {
                arena.remove(record.slot);
                false
            } else {
                true
            }
        });
        before - records.len()
    }

    /// Returns `true` if `slot` is still connected.
    pub fn contains_slot(&self, slot: SlotIndex) -> bool {
        self.table().arena.contains(slot)
    }

    /// Emits from `sender`.
    ///
    /// Each connection from `sender` receives the arguments in connection
    /// order: inline if it was made on this thread, otherwise queued for
    /// its thread. Queued calls share one deep copy of `args`. A failing
    /// slot is logged and does not stop the others.
    ///
    /// # Errors
    ///
    /// [`MetaError::ArityMismatch`] for a wrong argument count, before any
    /// slot runs. Otherwise the first error returned by an inline slot or
    /// raised while copying arguments for another thread.
    pub fn emit(&'static self, sender: ObjectId, args: &[Variant<'_>]) -> Result<(), MetaError> {
        check_arity(self.arg_count(), args.len())?;

        let targets: Vec<(SlotIndex, ThreadId, Arc<SlotFn>)> = {
            let table = self.table();
            table
                .records
                .iter()
                .filter(|record| record.sender == sender)
                .filter_map(|record| {
                    let callable = table.arena.get(record.slot)?;
                    Some((record.slot, record.thread, Arc::clone(callable)))
                })
                .collect()
        };

        let current = thread::current().id();
        let mut payload: Option<Arc<[Variant<'static>]>> = None;
        let mut first_error = None;

        for (slot, thread, callable) in targets {
            if thread == current {
                let mut views: Vec<Variant<'_>> = args.iter().map(Variant::borrow).collect();
                if let Err(err) = callable(&mut views) {
                    log::error!("{slot:?} of signal {} failed: {err}", self.name);
                    first_error.get_or_insert(err);
                }
                continue;
            }
            let args = match &payload {
                Some(payload) => Arc::clone(payload),
                None => {
                    let copies = args.iter().map(Variant::try_clone).collect::<Result<Vec<_>, _>>();
                    match copies {
                        Ok(copies) => Arc::clone(payload.insert(copies.into())),
                        Err(err) => {
                            log::error!("cannot copy arguments of signal {}: {err}", self.name);
                            first_error.get_or_insert(err);
                            continue;
                        }
                    }
                }
            };
            log::trace!("queued {slot:?} of signal {} for {thread:?}", self.name);
            self.delayed.push(thread, DelayedCall { signal: self, slot, args });
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Runs one slot if it is still connected. `None` for a stale slot.
    pub(crate) fn invoke_slot(
        &self,
        slot: SlotIndex,
        args: &[Variant<'_>],
    ) -> Option<Result<(), MetaError>> {
        let callable = Arc::clone(self.table().arena.get(slot)?);
        let mut views: Vec<Variant<'_>> = args.iter().map(Variant::borrow).collect();
        Some(callable(&mut views))
    }
}

impl fmt::Debug for SignalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalEntry")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("arg_types", &self.arg_types)
            .field("connections", &self.connection_count())
            .finish()
    }
}
