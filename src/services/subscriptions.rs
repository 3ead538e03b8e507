//! Typed event subscriptions.
//!
//! Callbacks are stored behind `Arc` so that [`Subscribers::notify`] can take
//! a snapshot of the list and release the lock before calling out. A
//! callback may therefore subscribe or unsubscribe (itself or others)
//! while being notified; the change takes effect from the next
//! notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A list of callbacks interested in events of type `E`.
pub struct Subscribers<E> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: Mutex::new(Vec::new()),
        }
    }
}

impl<E> std::fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<E> Subscribers<E> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push((id, Arc::new(callback)));
        }
        metrics::counter!("subscriptions_added_total").increment(1);
        id
    }

    /// Removes a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut callbacks) = self.callbacks.lock() else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() < before
    }

    /// Calls every callback registered at the time of the call.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = match self.callbacks.lock() {
            Ok(callbacks) => callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => return,
        };
        for callback in snapshot {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.lock().map_or(0, |callbacks| callbacks.len())
    }

    /// Returns `true` if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every callback.
    pub fn clear(&self) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_notify_reaches_all() {
        let subscribers = Subscribers::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let total = Arc::clone(&total);
            subscribers.subscribe(move |n| {
                total.fetch_add(*n as usize, Ordering::SeqCst);
            });
        }
        subscribers.notify(&2);
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_unsubscribe() {
        let subscribers = Subscribers::<()>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = subscribers.subscribe(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.notify(&());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_during_notify() {
        let subscribers = Arc::new(Subscribers::<()>::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));

        let list = Arc::clone(&subscribers);
        let slot = Arc::clone(&own_id);
        let counter = Arc::clone(&hits);
        let id = subscribers.subscribe(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *slot.lock().unwrap() {
                list.unsubscribe(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        let counter = Arc::clone(&hits);
        subscribers.subscribe(move |()| {
            counter.fetch_add(10, Ordering::SeqCst);
        });

        // Both callbacks run on the first pass; the self-removing one is gone after.
        subscribers.notify(&());
        assert_eq!(hits.load(Ordering::SeqCst), 11);
        assert_eq!(subscribers.len(), 1);

        subscribers.notify(&());
        assert_eq!(hits.load(Ordering::SeqCst), 21);
    }
}
