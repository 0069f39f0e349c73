//! Fan-out of "data changed" wakes to live subscribers.
//!
//! One shared [`tokio::sync::broadcast`] channel carries a unit message
//! per change event; every subscriber holds its own cloned receiver, so
//! each event reaches each currently-registered subscriber exactly once
//! and a receiver created after an event never sees it. This realizes the
//! edge-triggered wake the viewers depend on without any manually reset
//! flag.
//!
//! Subscriber lifecycle: Connected → WaitingForChange → Notifying →
//! Closed. The first [`Subscription::changed`] call resolves immediately
//! (the connect-time push), so a freshly connected viewer fetches current
//! data without waiting for a future change. The global stop token moves
//! every waiting subscriber to Closed; a dropped `Subscription` simply
//! leaves the set.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the shared wake channel. Wakes carry no payload, so a
/// lagged receiver collapses the missed burst into one wake.
const WAKE_BUFFER: usize = 16;

/// Outcome of waiting on a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// New data may be available; the subscriber should re-fetch.
    Refresh,
    /// The service is shutting down; the subscriber must exit.
    Closed,
}

/// Owns the shared wake channel and hands out subscriptions.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<()>,
    stop: CancellationToken,
}

impl Broadcaster {
    pub fn new(stop: CancellationToken) -> Self {
        let (tx, _) = broadcast::channel(WAKE_BUFFER);
        Self { tx, stop }
    }

    /// Register a new live subscriber.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            stop: self.stop.clone(),
            pushed_initial: false,
        }
    }

    /// Wake every currently-registered subscriber once.
    ///
    /// A send with no subscribers is not an error; the event is simply
    /// unobserved.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }

    /// Number of currently-registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscriber's handle: a private wake receiver plus the global
/// stop token. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<()>,
    stop: CancellationToken,
    pushed_initial: bool,
}

impl Subscription {
    /// Suspend until the next wake.
    ///
    /// The first call returns [`Wake::Refresh`] immediately; afterwards
    /// each broadcast event produces exactly one `Refresh`, and the stop
    /// token produces `Closed`.
    pub async fn changed(&mut self) -> Wake {
        if !self.pushed_initial {
            self.pushed_initial = true;
            return Wake::Refresh;
        }

        tokio::select! {
            biased;

            res = self.rx.recv() => match res {
                Ok(()) => Wake::Refresh,
                // Missed wakes coalesce; one refresh covers them all
                Err(broadcast::error::RecvError::Lagged(_)) => Wake::Refresh,
                Err(broadcast::error::RecvError::Closed) => Wake::Closed,
            },

            _ = self.stop.cancelled() => Wake::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_time_push() {
        let broadcaster = Broadcaster::new(CancellationToken::new());
        let mut sub = broadcaster.subscribe();

        // First wait resolves without any event having been broadcast
        assert_eq!(sub.changed().await, Wake::Refresh);
    }

    #[tokio::test]
    async fn test_each_event_wakes_each_subscriber_once() {
        const EVENTS: usize = 4;
        const SUBSCRIBERS: usize = 3;

        let broadcaster = Broadcaster::new(CancellationToken::new());

        let mut tasks = Vec::new();
        for _ in 0..SUBSCRIBERS {
            let mut sub = broadcaster.subscribe();
            tasks.push(tokio::spawn(async move {
                let mut wakes = 0usize;
                // Connect push plus one wake per event
                for _ in 0..EVENTS + 1 {
                    assert_eq!(sub.changed().await, Wake::Refresh);
                    wakes += 1;
                }
                wakes
            }));
        }

        // Let every subscriber reach its wait before the first event
        tokio::time::sleep(Duration::from_millis(50)).await;
        for _ in 0..EVENTS {
            broadcaster.notify();
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), EVENTS + 1);
        }
    }

    #[tokio::test]
    async fn test_no_retroactive_wake_for_past_events() {
        let broadcaster = Broadcaster::new(CancellationToken::new());

        broadcaster.notify();
        broadcaster.notify();

        let mut sub = broadcaster.subscribe();
        // Connect push arrives...
        assert_eq!(sub.changed().await, Wake::Refresh);
        // ...but the pre-subscription events do not
        let extra = tokio::time::timeout(Duration::from_millis(100), sub.changed()).await;
        assert!(extra.is_err(), "subscriber saw a wake for a past event");
    }

    #[tokio::test]
    async fn test_stop_releases_waiting_subscriber() {
        let stop = CancellationToken::new();
        let broadcaster = Broadcaster::new(stop.clone());
        let mut sub = broadcaster.subscribe();

        assert_eq!(sub.changed().await, Wake::Refresh);

        let waiter = tokio::spawn(async move { sub.changed().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel();

        let wake = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("stop should release the subscriber")
            .unwrap();
        assert_eq!(wake, Wake::Closed);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let broadcaster = Broadcaster::new(CancellationToken::new());
        let sub = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(sub);
        assert_eq!(broadcaster.subscriber_count(), 0);

        // Broadcasting to no subscribers must not fail
        broadcaster.notify();
    }

    #[tokio::test]
    async fn test_lagged_subscriber_coalesces_burst() {
        let broadcaster = Broadcaster::new(CancellationToken::new());
        let mut sub = broadcaster.subscribe();
        assert_eq!(sub.changed().await, Wake::Refresh);

        // Overflow the wake buffer while the subscriber is not waiting
        for _ in 0..WAKE_BUFFER * 4 {
            broadcaster.notify();
        }

        // The burst still surfaces as refreshes, never as an error
        assert_eq!(sub.changed().await, Wake::Refresh);
    }
}
