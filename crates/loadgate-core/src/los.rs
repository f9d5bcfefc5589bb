//! Asynchronous line-of-sight tracking.
//!
//! A query is issued on one tick and its result arrives through an event on
//! a later one. Only the most recent query counts: a result whose query id
//! no longer matches (the compartment or target changed in between) is
//! dropped. "Not resolved yet" is a state of its own and never reads as
//! "clear".

use loadgate_types::{EntityId, QueryId, RaycastHit};
use tracing::debug;

use crate::compartments::CompartmentRef;

/// Resolution state of the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOfSight {
    /// No query is outstanding.
    Idle,
    /// A query is outstanding.
    Unresolved,
    /// The ray reached the target (or nothing in between).
    Clear,
    /// Something other than the target was hit first.
    Obstructed {
        /// The obstructing entity.
        by: EntityId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    query: QueryId,
    from: CompartmentRef,
    target: EntityId,
}

/// Tracks the latest line-of-sight query.
#[derive(Debug, Clone)]
pub struct LineOfSightTracker {
    pending: Option<Pending>,
    state: LineOfSight,
}

impl Default for LineOfSightTracker {
    fn default() -> Self {
        Self {
            pending: None,
            state: LineOfSight::Idle,
        }
    }
}

impl LineOfSightTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly issued query, superseding any earlier one.
    pub fn issued(&mut self, query: QueryId, from: CompartmentRef, target: EntityId) {
        self.pending = Some(Pending {
            query,
            from,
            target,
        });
        self.state = LineOfSight::Unresolved;
    }

    /// Apply a result. Returns the compartment and target it resolved for,
    /// or `None` if the result was stale.
    pub fn resolve(&mut self, hit: &RaycastHit) -> Option<(CompartmentRef, EntityId, LineOfSight)> {
        let pending = self.pending.filter(|p| p.query == hit.query);
        let Some(pending) = pending else {
            debug!(query = %hit.query, "Stale line-of-sight result dropped");
            return None;
        };
        self.state = match hit.hit {
            Some(entity) if entity != pending.target => LineOfSight::Obstructed { by: entity },
            _ => LineOfSight::Clear,
        };
        self.pending = None;
        Some((pending.from, pending.target, self.state))
    }

    /// Whether a query for exactly this compartment and target is
    /// outstanding.
    pub fn is_pending_for(&self, from: CompartmentRef, target: EntityId) -> bool {
        self.pending
            .is_some_and(|p| p.from == from && p.target == target)
    }

    /// Current state.
    pub const fn state(&self) -> LineOfSight {
        self.state
    }

    /// Forget the outstanding query.
    pub fn reset(&mut self) {
        self.pending = None;
        self.state = LineOfSight::Idle;
    }
}
