//! In-process event bus for entity change notifications.
//!
//! Wraps a tokio broadcast channel. Every subscriber sees every event
//! published after it subscribed; slow subscribers may lag and lose events.

use tokio::sync::broadcast;

use crate::event::{EventMetadata, RepoEvent};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Broadcast event bus.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<(RepoEvent, EventMetadata)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// The capacity determines how many events are buffered for slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish with default metadata. Returns `true` if there was at least
    /// one subscriber.
    pub fn publish(&self, event: RepoEvent) -> bool {
        self.publish_with_metadata(event, EventMetadata::new("system"))
    }

    pub fn publish_with_metadata(&self, event: RepoEvent, metadata: EventMetadata) -> bool {
        self.tx.send((event, metadata)).is_ok()
    }

    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe to events for which `filter` returns `true`.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&RepoEvent) -> bool + Send + 'static,
    {
        FilteredReceiver {
            rx: self.tx.subscribe(),
            filter,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for all events from the event bus.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<(RepoEvent, EventMetadata)>,
}

impl EventBusReceiver {
    /// Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<(RepoEvent, EventMetadata)> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event bus receiver lagged, {} events dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<(RepoEvent, EventMetadata)> {
        self.rx.try_recv().ok()
    }
}

/// Receiver for filtered events from the event bus.
pub struct FilteredReceiver<F>
where
    F: Fn(&RepoEvent) -> bool + Send,
{
    rx: broadcast::Receiver<(RepoEvent, EventMetadata)>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&RepoEvent) -> bool + Send,
{
    /// Receive the next event matching the filter. Lag gaps are skipped
    /// silently; use [`recv_or_lagged`](Self::recv_or_lagged) to observe them.
    pub async fn recv(&mut self) -> Option<(RepoEvent, EventMetadata)> {
        loop {
            match self.recv_or_lagged().await {
                Some(Some(event)) => return Some(event),
                Some(None) => continue,
                None => return None,
            }
        }
    }

    /// Like [`recv`](Self::recv) but yields `Some(None)` when events were dropped.
    pub async fn recv_or_lagged(&mut self) -> Option<Option<(RepoEvent, EventMetadata)>> {
        loop {
            match self.rx.recv().await {
                Ok((event, meta)) => {
                    if (self.filter)(&event) {
                        return Some(Some((event, meta)));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(None),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
