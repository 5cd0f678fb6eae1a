use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Inner<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

/// A value with replay-latest subscriptions.
///
/// Every `set` replaces the whole value and pushes a clone to each live
/// subscriber, so readers only ever see complete snapshots. New subscribers
/// immediately receive the current value. Disconnected receivers are dropped
/// on the next publish.
pub struct Observable<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest published value.
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    pub fn set(&self, value: T) {
        let mut inner = self.lock();
        inner.value = value;
        let snapshot = inner.value.clone();
        inner
            .subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Apply `f` to a copy of the current value and publish the result.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        let mut inner = self.lock();
        let mut next = inner.value.clone();
        f(&mut next);
        inner.value = next.clone();
        inner.subscribers.retain(|tx| tx.send(next.clone()).is_ok());
    }

    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.lock();
        if tx.send(inner.value.clone()).is_ok() {
            inner.subscribers.push(tx);
        }
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

impl<T: Clone + Send + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_subscriber_sees_latest_value() {
        let obs = Observable::new(1);
        obs.set(5);
        let rx = obs.subscribe();
        assert_eq!(rx.try_recv().unwrap(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn updates_are_pushed_in_order() {
        let obs = Observable::new(0u32);
        let rx = obs.subscribe();
        obs.set(1);
        obs.update(|v| *v += 10);
        let seen: Vec<u32> = rx.try_iter().collect();
        assert_eq!(seen, vec![0, 1, 11]);
        assert_eq!(obs.get(), 11);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let obs = Observable::new(String::from("a"));
        let rx = obs.subscribe();
        let _keep = obs.subscribe();
        assert_eq!(obs.subscriber_count(), 2);
        drop(rx);
        obs.set("b".into());
        assert_eq!(obs.subscriber_count(), 1);
    }

    #[test]
    fn clones_share_the_same_cell() {
        let obs = Observable::new(0u32);
        let writer = obs.clone();
        let handle = thread::spawn(move || {
            for i in 1..=100 {
                writer.set(i);
            }
        });
        handle.join().unwrap();
        assert_eq!(obs.get(), 100);
    }
}
