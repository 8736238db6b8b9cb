//! Multicast notification with weakly held observers.
//!
//! A [`MulticastNotifier`] fans a value out to every live subscriber. Each
//! subscription is scoped to an *owner* that the notifier only holds through a
//! [`Weak`] reference: the notifier is never the reason an owner stays alive,
//! and a dropped owner never receives another callback.
//!
//! Stale registrations are pruned lazily at the start of each
//! [`MulticastNotifier::notify`] call, never eagerly.

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Stable identity token for a single registration.
///
/// Returned by [`MulticastNotifier::subscribe`] and accepted by
/// [`MulticastNotifier::unsubscribe`] for early opt-out of one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Observer<T> {
    id: SubscriptionId,
    owner: Weak<dyn Any + Send + Sync>,
    handler: Handler<T>,
}

// Derived Clone would require `T: Clone`.
impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> Observer<T> {
    fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn is_owned_by(&self, owner: *const ()) -> bool {
        std::ptr::eq(Weak::as_ptr(&self.owner) as *const (), owner)
    }
}

/// One-to-many delivery of `T` values to weakly owned handlers.
///
/// Handlers run in registration order against a snapshot taken when
/// [`notify`](Self::notify) starts, without any internal lock held. A handler
/// may therefore subscribe, unsubscribe or notify again without deadlocking;
/// such changes take effect from the next delivery on.
///
/// A panicking handler is not caught. Delivery safety is the handler's
/// responsibility.
pub struct MulticastNotifier<T> {
    observers: Mutex<Vec<Observer<T>>>,
    next_id: AtomicU64,
}

impl<T> MulticastNotifier<T> {
    /// Create a notifier with no subscribers
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` for future payloads, scoped to the lifetime of `owner`.
    ///
    /// Only a weak reference to `owner` is kept. The same owner may subscribe
    /// any number of times; registrations are never deduplicated.
    pub fn subscribe<O, F>(&self, owner: &Arc<O>, handler: F) -> SubscriptionId
    where
        O: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let owner: Weak<O> = Arc::downgrade(owner);
        let owner: Weak<dyn Any + Send + Sync> = owner;
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.observers.lock().push(Observer {
            id,
            owner,
            handler: Arc::new(handler),
        });

        id
    }

    /// Deliver `payload` to every handler whose owner is still alive.
    pub fn notify(&self, payload: &T) {
        let snapshot = {
            let mut observers = self.observers.lock();
            let before = observers.len();
            observers.retain(Observer::is_live);

            let pruned = before - observers.len();
            if pruned > 0 {
                debug!(pruned, remaining = observers.len(), "Pruned stale observers");
            }

            observers.clone()
        };

        for observer in snapshot {
            // An earlier handler may have released the last strong reference.
            let Some(_owner) = observer.owner.upgrade() else {
                continue;
            };
            (observer.handler)(payload);
        }
    }

    /// Remove every registration belonging to `owner`, compared by identity.
    ///
    /// Returns the number of registrations removed.
    pub fn unregister<O>(&self, owner: &Arc<O>) -> usize
    where
        O: ?Sized,
    {
        let target = Arc::as_ptr(owner) as *const ();
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|observer| !observer.is_owned_by(target));
        before - observers.len()
    }

    /// Remove a single registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|observer| observer.id != id);
        observers.len() != before
    }

    /// Number of registrations whose owner is still alive
    pub fn subscriber_count(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|observer| observer.is_live())
            .count()
    }

    /// Check whether any live registration exists
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl<T> Default for MulticastNotifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MulticastNotifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastNotifier")
            .field("registrations", &self.observers.lock().len())
            .finish()
    }
}
