//! Push-notification plumbing
//!
//! The wallet subscribes every generated address on the node's push
//! channel and receives conflict-resolution notifications back. Both
//! sides are injected: components talk to an [`AddressSubscriber`]
//! handle, never to a global connection.

use std::collections::BTreeSet;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::node::types::ConflictEvent;

pub trait AddressSubscriber: Send + Sync {
    fn subscribe(&self, address: &str);
}

/// In-process bus: records subscriptions and fans conflict events out to
/// the single consumer (the wallet manager's event loop). The network
/// layer publishes into it, tests publish directly.
pub struct EventBus {
    subscriptions: Mutex<BTreeSet<String>>,
    events: mpsc::UnboundedSender<ConflictEvent>,
}

impl EventBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConflictEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                subscriptions: Mutex::new(BTreeSet::new()),
                events: tx,
            },
            rx,
        )
    }

    pub fn publish(&self, event: ConflictEvent) {
        // The receiver going away just means the wallet is shutting down
        let _ = self.events.send(event);
    }

    pub fn is_subscribed(&self, address: &str) -> bool {
        self.subscriptions.lock().unwrap().contains(address)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl AddressSubscriber for EventBus {
    fn subscribe(&self, address: &str) {
        let mut subs = self.subscriptions.lock().unwrap();
        if subs.insert(address.to_string()) {
            log::debug!("subscribed address {}", address);
        }
    }
}

/// Subscriber that drops every request, for contexts with no push channel.
pub struct NullSubscriber;

impl AddressSubscriber for NullSubscriber {
    fn subscribe(&self, _address: &str) {}
}
