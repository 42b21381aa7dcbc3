//! Push-notification fan-out.
//!
//! The bridge hands every [`Notification`] to a [`Notifier`]. The shipped
//! [`Broadcaster`] serializes it once and pushes the JSON text to every
//! subscriber over a bounded crossbeam channel. A subscriber whose receiver
//! was dropped is pruned on the next send; a subscriber whose queue is full
//! misses that message.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;

use crate::messages::Notification;

/// Messages queued per subscriber before new ones are dropped.
pub const SUBSCRIBER_QUEUE: usize = 64;

/// Sink for bridge notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Never fails; delivery problems are logged.
    fn notify(&self, notification: &Notification);
}

/// Fan-out to channel subscribers.
#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<Sender<String>>>,
}

impl Broadcaster {
    /// No subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<String> {
        let (tx, rx) = bounded(SUBSCRIBER_QUEUE);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Subscribers registered (including ones not yet pruned).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Send raw text to every subscriber, returning how many got it.
    pub fn broadcast(&self, text: &str) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|tx| match tx.try_send(text.to_string()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::debug!("Subscriber queue full, dropping message");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }
}

impl Notifier for Broadcaster {
    fn notify(&self, notification: &Notification) {
        match notification.to_json() {
            Ok(text) => {
                let delivered = self.broadcast(&text);
                log::debug!(
                    "Sent {} to {} subscribers",
                    notification.kind(),
                    delivered
                );
            }
            Err(e) => log::error!("Failed to serialize {}: {}", notification.kind(), e),
        }
    }
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.to_json() {
            Ok(text) => log::info!("Notification: {}", text),
            Err(e) => log::error!("Failed to serialize {}: {}", notification.kind(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out() {
        let b = Broadcaster::new();
        let rx1 = b.subscribe();
        let rx2 = b.subscribe();
        b.notify(&Notification::map_update("/map_live.png", None));

        let m1 = rx1.try_recv().unwrap();
        let m2 = rx2.try_recv().unwrap();
        assert_eq!(m1, m2);
        assert!(m1.contains("\"map_update\""));
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let b = Broadcaster::new();
        let rx = b.subscribe();
        drop(b.subscribe());
        assert_eq!(b.subscriber_count(), 2);

        assert_eq!(b.broadcast("x"), 1);
        assert_eq!(b.subscriber_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), "x");
    }

    #[test]
    fn test_full_queue_drops_but_keeps_subscriber() {
        let b = Broadcaster::new();
        let rx = b.subscribe();
        for i in 0..SUBSCRIBER_QUEUE + 5 {
            b.broadcast(&i.to_string());
        }
        assert_eq!(b.subscriber_count(), 1);
        assert_eq!(rx.len(), SUBSCRIBER_QUEUE);
        assert_eq!(rx.try_recv().unwrap(), "0");
    }
}
