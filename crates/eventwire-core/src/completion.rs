//! One-shot completion marker
//!
//! Fired at most once by the task that owns it; any number of waiters observe
//! it, including waiters that subscribe after it fired.

use tokio::sync::watch;

/// Firing side of a one-shot marker
#[derive(Debug)]
pub struct CompletionMarker {
    sender: watch::Sender<bool>,
}

/// Observing side of a one-shot marker
#[derive(Debug, Clone)]
pub struct CompletionWaiter {
    receiver: watch::Receiver<bool>,
}

impl CompletionMarker {
    pub fn new() -> (Self, CompletionWaiter) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CompletionWaiter { receiver })
    }

    /// Fire the marker. Returns false if it had already fired.
    pub fn fire(&self) -> bool {
        self.sender.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        })
    }

}

impl CompletionWaiter {
    pub fn is_fired(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the marker has fired. Also resolves if the marker was
    /// dropped without firing, since it can then never fire.
    pub async fn wait(&mut self) {
        let _ = self.receiver.wait_for(|done| *done).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fires_once() {
        let (marker, waiter) = CompletionMarker::new();
        assert!(!waiter.is_fired());
        assert!(marker.fire());
        assert!(!marker.fire());
        assert!(waiter.is_fired());
    }

    #[tokio::test]
    async fn test_late_waiter_sees_fired_marker() {
        let (marker, waiter) = CompletionMarker::new();
        marker.fire();
        let mut late = waiter.clone();
        tokio::time::timeout(Duration::from_millis(50), late.wait())
            .await
            .expect("fired marker should resolve immediately");
    }

    #[tokio::test]
    async fn test_many_waiters_wake() {
        let (marker, waiter) = CompletionMarker::new();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let mut waiter = waiter.clone();
                tokio::spawn(async move { waiter.wait().await })
            })
            .collect();

        marker.fire();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_dropped_marker_releases_waiters() {
        let (marker, mut waiter) = CompletionMarker::new();
        drop(marker);
        tokio::time::timeout(Duration::from_millis(50), waiter.wait())
            .await
            .expect("dropped marker should not block forever");
        assert!(!waiter.is_fired());
    }
}
