//! Collects every event published on a bus

use std::sync::{Arc, Mutex};
use std::time::Duration;

use monitor::events::{EventBus, EventEnvelope, EventKind, MonitorEvent};

pub struct EventRecorder {
    seen: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl EventRecorder {
    pub fn attach(bus: &EventBus) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        // The subscription handle is dropped; the handler stays registered
        let _ = bus.subscribe_all(move |envelope| {
            sink.lock().unwrap().push(envelope.clone());
            Ok(())
        });
        Self { seen }
    }

    pub fn all(&self) -> Vec<EventEnvelope> {
        self.seen.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.all().iter().map(|e| e.event.kind()).collect()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<MonitorEvent> {
        self.all()
            .into_iter()
            .filter(|e| e.event.kind() == kind)
            .map(|e| e.event)
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).len()
    }

    /// Poll until `count` events of `kind` were seen. Panics after `limit`.
    pub async fn wait_for(&self, kind: EventKind, count: usize, limit: Duration) {
        let waited = tokio::time::timeout(limit, async {
            while self.count(kind) < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if waited.is_err() {
            panic!(
                "expected {} {} event(s), saw {}",
                count,
                kind.as_str(),
                self.count(kind)
            );
        }
    }
}
