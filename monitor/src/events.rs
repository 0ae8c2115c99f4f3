//! Typed event bus announcing check outcomes and lifecycle changes
//!
//! The bus is constructed explicitly and injected into the components that
//! publish. Every event is wrapped in an [`EventEnvelope`] carrying metadata
//! the publisher never supplies: the bus id, a per-publish correlation id
//! and the emission timestamp.
//!
//! Handlers run synchronously, one after another, on the publishing task.
//! A failing or panicking handler is logged and does not affect the others.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::{debug, error};
use uuid::Uuid;

use crate::types::{CheckKind, CheckResult, MonitorStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    CheckCompleted,
    StatusChanged,
    MonitoringStarted,
    MonitoringStopped,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CheckCompleted => "check-completed",
            EventKind::StatusChanged => "status-changed",
            EventKind::MonitoringStarted => "monitoring-started",
            EventKind::MonitoringStopped => "monitoring-stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckCompletedEvent {
    pub monitor_id: String,
    pub site_id: Option<String>,
    pub check_kind: CheckKind,
    pub result: CheckResult,
    pub applied: bool,
    pub timestamp: DateTime<Utc>,
    /// Only for joining with other events while debugging
    pub operation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChangedEvent {
    pub monitor_id: String,
    pub previous_status: MonitorStatus,
    pub new_status: MonitorStatus,
    pub timestamp: DateTime<Utc>,
    pub operation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum MonitorEvent {
    CheckCompleted(CheckCompletedEvent),
    StatusChanged(StatusChangedEvent),
    MonitoringStarted { monitor_count: usize },
    MonitoringStopped { remaining_active: usize },
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::CheckCompleted(_) => EventKind::CheckCompleted,
            MonitorEvent::StatusChanged(_) => EventKind::StatusChanged,
            MonitorEvent::MonitoringStarted { .. } => EventKind::MonitoringStarted,
            MonitorEvent::MonitoringStopped { .. } => EventKind::MonitoringStopped,
        }
    }

    pub fn monitor_id(&self) -> Option<&str> {
        match self {
            MonitorEvent::CheckCompleted(e) => Some(&e.monitor_id),
            MonitorEvent::StatusChanged(e) => Some(&e.monitor_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub bus_id: Uuid,
    pub correlation_id: Uuid,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: MonitorEvent,
}

pub type EventHandler = dyn Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync;

type HandlerList = Vec<(u64, Arc<EventHandler>)>;

struct BusInner {
    handlers: RwLock<HashMap<Option<EventKind>, HandlerList>>, // None = all events
    next_id: AtomicU64,
}

pub struct EventBus {
    id: Uuid,
    inner: Arc<BusInner>,
}

/// Handle returned by `subscribe`; call `unsubscribe` to stop receiving events
pub struct Subscription {
    id: u64,
    kind: Option<EventKind>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };
        let mut handlers = inner
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match handlers.get_mut(&self.kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(id, _)| *id != self.id);
                before != list.len()
            }
            None => false,
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Arc::new(BusInner {
                handlers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Receive every event regardless of kind
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, kind: Option<EventKind>, handler: Arc<EventHandler>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self
            .inner
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.entry(kind).or_default().push((id, handler));

        Subscription {
            id,
            kind,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Decorate and deliver an event. Returns the envelope that was delivered.
    pub fn publish(&self, event: MonitorEvent) -> EventEnvelope {
        let envelope = EventEnvelope {
            bus_id: self.id,
            correlation_id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            event,
        };

        let kind = envelope.event.kind();
        // Snapshot handlers so they may (un)subscribe while being called
        let targets: Vec<Arc<EventHandler>> = {
            let handlers = self
                .inner
                .handlers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            handlers
                .get(&Some(kind))
                .into_iter()
                .chain(handlers.get(&None))
                .flat_map(|list| list.iter().map(|(_, h)| h.clone()))
                .collect()
        };

        debug!(
            "Publishing {} ({}) to {} handler(s)",
            kind.as_str(),
            envelope.correlation_id,
            targets.len()
        );

        for handler in targets {
            match catch_unwind(AssertUnwindSafe(|| handler(&envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    "Event handler for {} failed ({}): {}",
                    kind.as_str(),
                    envelope.correlation_id,
                    e
                ),
                Err(_) => error!(
                    "Event handler for {} panicked ({})",
                    kind.as_str(),
                    envelope.correlation_id
                ),
            }
        }

        envelope
    }

    pub fn handler_count(&self) -> usize {
        let handlers = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.values().map(|list| list.len()).sum()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
