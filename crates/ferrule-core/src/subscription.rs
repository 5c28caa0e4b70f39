// crates/ferrule-core/src/subscription.rs
//
// Cancellable event streams returned by subscription endpoints.
//
// A subscription owns the receiving half of a channel and an optional
// teardown callback. The teardown releases whatever the handler acquired
// and runs exactly once: on `unsubscribe`, or on drop otherwise.

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// A live stream of JSON events produced by a subscription endpoint.
pub struct Subscription {
    events: mpsc::Receiver<Value>,
    teardown: Option<Teardown>,
}

impl Subscription {
    /// Wrap an event receiver without any teardown.
    pub fn new(events: mpsc::Receiver<Value>) -> Self {
        Self {
            events,
            teardown: None,
        }
    }

    /// Create a bounded channel and the subscription reading from it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Value>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    /// Attach the callback run when the consumer is done.
    pub fn on_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Wait for the next event. `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<Value> {
        self.events.recv().await
    }

    /// Stop receiving and release the handler's resources.
    pub fn unsubscribe(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        self.events.close();
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_receives_events_in_order() {
        let (tx, mut sub) = Subscription::channel(4);
        tx.send(json!(1)).await.unwrap();
        tx.send(json!(2)).await.unwrap();
        drop(tx);

        assert_eq!(sub.next().await, Some(json!(1)));
        assert_eq!(sub.next().await, Some(json!(2)));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_teardown_runs_once_on_unsubscribe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_tx, sub) = Subscription::channel(1);
        let sub = sub.on_teardown(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_teardown_runs_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        {
            let (_tx, sub) = Subscription::channel(1);
            let _sub = sub.on_teardown(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_producer_sees_closed_channel_after_unsubscribe() {
        let (tx, sub) = Subscription::channel(1);
        sub.unsubscribe();
        assert!(tx.send(json!("late")).await.is_err());
    }
}
