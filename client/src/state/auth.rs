//! Auth-session state for the current client process.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthStore` is the single source of truth for who is logged in. Route
//! guards and user-aware components subscribe to it and re-read the full
//! `AuthState` snapshot on every notification; they never receive deltas.
//!
//! DESIGN
//! ======
//! One store is constructed per process and shared through `Rc`. Everything
//! is single-threaded: mutations and notifications run synchronously on the
//! caller's stack, so there are no locks, only `RefCell` borrows that are
//! always released before a listener runs. Listeners may therefore read the
//! store, call its operations, or drop subscriptions from inside a
//! notification.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::net::types::User;
use crate::util::storage::{self, CredentialStorage};

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

// =============================================================================
// LISTENERS
// =============================================================================

type Listener = Rc<dyn Fn()>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

impl Listeners {
    fn insert(&mut self, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    fn remove(&mut self, id: u64) -> Option<Listener> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    fn get(&self, id: u64) -> Option<Listener> {
        self.entries.iter().find(|(entry_id, _)| *entry_id == id).map(|(_, l)| Rc::clone(l))
    }

    fn ids(&self) -> Vec<u64> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }
}

/// Registration handle returned by [`AuthStore::subscribe`].
///
/// Dropping the handle deregisters the listener, so a consumer that owns its
/// subscription cannot leak it.
#[must_use = "dropping a Subscription immediately unsubscribes it"]
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl Subscription {
    /// Deregister now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        // The removed closure may own other subscriptions; drop it only after
        // the borrow is released.
        let removed = listeners.borrow_mut().remove(self.id);
        drop(removed);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadPhase {
    /// No read of persisted credentials has happened yet.
    Pending,
    /// A read is running; further reads are suppressed.
    InFlight,
    /// State reflects a completed read or an explicit login/logout.
    Settled,
}

pub struct AuthStore {
    state: RefCell<AuthState>,
    phase: Cell<ReadPhase>,
    /// Bumped by every explicit login or logout.
    generation: Cell<u64>,
    /// Nesting depth of notification passes currently running.
    notifying: Cell<u32>,
    storage: Rc<dyn CredentialStorage>,
    listeners: Rc<RefCell<Listeners>>,
}

impl AuthStore {
    /// Build a store over `storage`. The store reports `loading = true` until
    /// `initialize`, `login`, or `logout` runs.
    #[must_use]
    pub fn new(storage: Rc<dyn CredentialStorage>) -> Self {
        Self {
            state: RefCell::new(AuthState { user: None, loading: true }),
            phase: Cell::new(ReadPhase::Pending),
            generation: Cell::new(0),
            notifying: Cell::new(0),
            storage,
            listeners: Rc::new(RefCell::new(Listeners::default())),
        }
    }

    /// The credential storage this store reads at initialization and clears
    /// at logout.
    pub fn storage(&self) -> &dyn CredentialStorage {
        &*self.storage
    }

    /// Current state without triggering a read.
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// Read persisted credentials once. Calls made while the read is in
    /// flight (from a listener) or after it settled are no-ops.
    pub fn initialize(&self) {
        if self.phase.get() != ReadPhase::Pending {
            tracing::trace!(phase = ?self.phase.get(), "auth store already initialized");
            return;
        }
        self.read_persisted();
    }

    /// Re-read persisted credentials, e.g. after another process logged in.
    /// Suppressed while a read is in flight or listeners are being notified.
    pub fn refresh(&self) {
        if self.phase.get() == ReadPhase::InFlight {
            tracing::debug!("auth refresh suppressed: read already in flight");
            return;
        }
        if self.notifying.get() > 0 {
            tracing::debug!("auth refresh suppressed: called from a listener");
            return;
        }
        self.read_persisted();
    }

    /// Record a successful login. Persisting the token and snapshot is the
    /// login flow's job, not the store's.
    pub fn login(&self, user: User) {
        tracing::info!(user_id = user.id, username = %user.username, "session started");
        self.settle(Some(user));
        self.notify();
    }

    /// Drop the current user and clear persisted credentials.
    pub fn logout(&self) {
        self.settle(None);
        if let Err(e) = storage::clear_credentials(&*self.storage) {
            tracing::warn!(error = %e, "failed to clear persisted credentials");
        }
        tracing::info!("session ended");
        self.notify();
    }

    /// Register a zero-argument listener. Listeners are notified in
    /// registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        let id = self.listeners.borrow_mut().insert(Rc::new(listener));
        Subscription { id, listeners: Rc::downgrade(&self.listeners) }
    }

    fn settle(&self, user: Option<User>) {
        self.generation.set(self.generation.get() + 1);
        {
            let mut state = self.state.borrow_mut();
            state.user = user;
            state.loading = false;
        }
        if self.phase.get() == ReadPhase::Pending {
            self.phase.set(ReadPhase::Settled);
        }
    }

    fn read_persisted(&self) {
        self.phase.set(ReadPhase::InFlight);
        self.state.borrow_mut().loading = true;
        let generation = self.generation.get();
        self.notify();

        if self.generation.get() != generation {
            // A listener logged in or out while the read was pending; that
            // state is newer than anything on disk.
            tracing::debug!("persisted read superseded by explicit login/logout");
            self.phase.set(ReadPhase::Settled);
            return;
        }

        let token = storage::load_token(&*self.storage);
        let user = storage::load_user(&*self.storage);
        let user = match (token, user) {
            (Some(_), Some(user)) => Some(user),
            _ => None,
        };
        tracing::debug!(authenticated = user.is_some(), "persisted credentials read");

        {
            let mut state = self.state.borrow_mut();
            state.user = user;
            state.loading = false;
        }
        self.phase.set(ReadPhase::Settled);
        self.notify();
    }

    fn notify(&self) {
        self.notifying.set(self.notifying.get() + 1);
        let ids = self.listeners.borrow().ids();
        for id in ids {
            // Re-check membership so a listener removed earlier in this pass
            // is skipped.
            let listener = self.listeners.borrow().get(id);
            if let Some(listener) = listener {
                listener();
            }
        }
        self.notifying.set(self.notifying.get() - 1);
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("state", &self.state.borrow())
            .field("phase", &self.phase.get())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}
