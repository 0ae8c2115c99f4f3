// File: monitor/src/web/broadcaster.rs
//! Fans bus events out to streaming API clients

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{EventBus, Subscription};

/// Event kind and JSON-encoded envelope
pub type EventMessage = (&'static str, String);

pub struct EventBroadcaster {
    tx: broadcast::Sender<EventMessage>,
    _subscription: Subscription,
}

impl EventBroadcaster {
    /// Subscribe to every event on the bus and forward it as JSON
    pub fn attach(bus: &EventBus, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let sender = tx.clone();

        let subscription = bus.subscribe_all(move |envelope| {
            let json = serde_json::to_string(envelope)?;
            // No connected clients is not a failure
            if sender.send((envelope.event.kind().as_str(), json)).is_err() {
                debug!("No stream clients for {}", envelope.correlation_id);
            }
            Ok(())
        });

        Self {
            tx,
            _subscription: subscription,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventMessage> {
        self.tx.subscribe()
    }
}
