use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{trace, warn};

use phantom_types::events::ChatEvent;

const BUS_CAPACITY: usize = 256;

/// In-process publish/subscribe for chat events.
///
/// Cloning is cheap; every clone publishes into the same channel. Handed to
/// the tutorial engine, chat views and the conversation list instead of any
/// ambient global.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    tx: broadcast::Sender<ChatEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            inner: Arc::new(BusInner { tx }),
        }
    }

    /// Subscribe to every event. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.tx.subscribe()
    }

    /// Subscribe to the events that concern one user.
    pub fn subscribe_user(&self, user_id: impl Into<String>) -> UserSubscription {
        UserSubscription {
            user_id: user_id.into(),
            rx: self.subscribe(),
        }
    }

    /// Publish to all current subscribers. Nobody listening is not an error.
    pub fn publish(&self, event: ChatEvent) {
        trace!("bus publish: {:?}", event);
        let _ = self.inner.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

pub struct UserSubscription {
    user_id: String,
    rx: broadcast::Receiver<ChatEvent>,
}

impl UserSubscription {
    /// Next event for this user. `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.user_id() == self.user_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("Bus subscriber for {} lagged by {} events", self.user_id, n);
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
