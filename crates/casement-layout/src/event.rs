//! Pane lifecycle notifications.
//!
//! The engine never requires a listener. Sinks registered on an
//! [`EventBus`] are called synchronously, in registration order, after the
//! mutation that produced the event has been committed.

use casement_core::geometry::Rect;
use serde::Serialize;

use crate::minimize::RestorePlacement;
use crate::sash::{SashId, SashPosition, SashRecord};

/// ID, geometry and title of a pane at the time of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaneSnapshot {
    pub id: SashId,
    pub rect: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PaneSnapshot {
    #[must_use]
    pub fn of(record: &SashRecord) -> Self {
        Self {
            id: record.id,
            rect: record.rect,
            title: record.store().and_then(|store| store.title.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SashEvent {
    PaneAdded {
        pane: PaneSnapshot,
        target: SashId,
        position: SashPosition,
    },
    PaneRemoved {
        pane: PaneSnapshot,
    },
    PaneResized {
        id: SashId,
        before: Rect,
        after: Rect,
    },
    PaneMinimized {
        pane: PaneSnapshot,
    },
    PaneRestored {
        pane: PaneSnapshot,
        placement: RestorePlacement,
    },
    PaneFocused {
        pane: PaneSnapshot,
        previous: Option<SashId>,
    },
    PaneTitleChanged {
        id: SashId,
        previous: Option<String>,
        current: Option<String>,
    },
    PanesSwapped {
        first: SashId,
        second: SashId,
    },
    PaneMoved {
        pane: PaneSnapshot,
        target: SashId,
        position: SashPosition,
    },
    PaneMaximized {
        pane: PaneSnapshot,
    },
    PaneUnmaximized {
        pane: PaneSnapshot,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SashEventKind {
    PaneAdded,
    PaneRemoved,
    PaneResized,
    PaneMinimized,
    PaneRestored,
    PaneFocused,
    PaneTitleChanged,
    PanesSwapped,
    PaneMoved,
    PaneMaximized,
    PaneUnmaximized,
}

impl SashEvent {
    #[must_use]
    pub const fn kind(&self) -> SashEventKind {
        match self {
            Self::PaneAdded { .. } => SashEventKind::PaneAdded,
            Self::PaneRemoved { .. } => SashEventKind::PaneRemoved,
            Self::PaneResized { .. } => SashEventKind::PaneResized,
            Self::PaneMinimized { .. } => SashEventKind::PaneMinimized,
            Self::PaneRestored { .. } => SashEventKind::PaneRestored,
            Self::PaneFocused { .. } => SashEventKind::PaneFocused,
            Self::PaneTitleChanged { .. } => SashEventKind::PaneTitleChanged,
            Self::PanesSwapped { .. } => SashEventKind::PanesSwapped,
            Self::PaneMoved { .. } => SashEventKind::PaneMoved,
            Self::PaneMaximized { .. } => SashEventKind::PaneMaximized,
            Self::PaneUnmaximized { .. } => SashEventKind::PaneUnmaximized,
        }
    }

    /// The pane the event is about.
    #[must_use]
    pub fn sash(&self) -> SashId {
        match self {
            Self::PaneAdded { pane, .. }
            | Self::PaneRemoved { pane }
            | Self::PaneMinimized { pane }
            | Self::PaneRestored { pane, .. }
            | Self::PaneFocused { pane, .. }
            | Self::PaneMoved { pane, .. }
            | Self::PaneMaximized { pane }
            | Self::PaneUnmaximized { pane } => pane.id,
            Self::PaneResized { id, .. } | Self::PaneTitleChanged { id, .. } => *id,
            Self::PanesSwapped { first, .. } => *first,
        }
    }
}

/// Receiver of lifecycle events.
pub trait EventSink {
    fn on_event(&mut self, event: &SashEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&SashEvent),
{
    fn on_event(&mut self, event: &SashEvent) {
        self(event);
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of event sinks.
#[derive(Default)]
pub struct EventBus {
    next: u64,
    sinks: Vec<(SubscriptionId, Box<dyn EventSink>)>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sinks.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next);
        self.next += 1;
        self.sinks.push((id, Box::new(sink)));
        id
    }

    /// Drop a sink. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(candidate, _)| *candidate != id);
        self.sinks.len() != before
    }

    pub fn emit(&mut self, event: &SashEvent) {
        tracing::trace!(kind = ?event.kind(), sash = %event.sash(), "emit sash event");
        for (_, sink) in &mut self.sinks {
            sink.on_event(event);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }
}
