//! Callback events queued between ticks.
//!
//! The collision layer, discharge-capable entities, and the raycast system
//! call back at arbitrary points between ticks. Their notifications are
//! pushed here and drained at the start of the next update, before any
//! admission evaluation runs, so a tick always sees every zone change
//! delivered before it.

use std::collections::VecDeque;

use loadgate_types::{EntityId, RaycastHit, ZoneId, ZoneKind};

/// A callback notification for one agent's controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A sub-entity of the agent started overlapping a zone.
    ZoneEnter {
        /// The zone.
        zone: ZoneId,
        /// Zone kind as reported by the trigger.
        kind: ZoneKind,
        /// The agent's overlapping sub-entity.
        entity: EntityId,
        /// Collision shape that fired.
        shape: u32,
    },
    /// A sub-entity of the agent stopped overlapping a zone.
    ZoneLeave {
        /// The zone.
        zone: ZoneId,
        /// The agent's sub-entity.
        entity: EntityId,
        /// Collision shape that fired.
        shape: u32,
    },
    /// A sub-entity is still overlapping a zone.
    ZoneStay {
        /// The zone.
        zone: ZoneId,
        /// Zone kind as reported by the trigger.
        kind: ZoneKind,
        /// The agent's sub-entity.
        entity: EntityId,
        /// Collision shape that fired.
        shape: u32,
    },
    /// A compartment's ability to discharge into a target changed.
    DischargeStateChanged {
        /// Entity owning the compartment.
        entity: EntityId,
        /// Compartment index.
        compartment: usize,
        /// The discharge point it can reach.
        target: EntityId,
        /// The zone the discharge point belongs to, if any.
        zone: Option<ZoneId>,
        /// Whether discharging into the target is possible now.
        can_discharge: bool,
    },
    /// A line-of-sight query resolved.
    Raycast(RaycastHit),
}

/// FIFO of pending events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: VecDeque<ControllerEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event.
    pub fn push(&mut self, event: ControllerEvent) {
        self.pending.push_back(event);
    }

    /// Take every pending event in arrival order.
    pub fn drain(&mut self) -> Vec<ControllerEvent> {
        self.pending.drain(..).collect()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
