//! Zone tracking and point-source discovery.
//!
//! The collision layer reports overlap per sub-entity: a tractor with two
//! trailers can be inside the same silo zone three times over. A zone counts
//! as entered on its first sub-entity and as left only once its sub-entity
//! set is empty again.
//!
//! Point sources (pickup points, bale stations) have no trigger volume the
//! agent drives into; they report themselves activatable and must be
//! activated explicitly. [`ZoneTracker::discover`] scans the injected
//! registry for them, at most one activation per tick.

use std::collections::{BTreeMap, BTreeSet};

use loadgate_types::{AgentId, EntityId, ZoneId, ZoneKind};
use tracing::{debug, info};

use crate::host::ResourceRegistry;

/// What happened to the zone set on an enter notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// First sub-entity of the agent inside this zone.
    ZoneEntered,
    /// Another sub-entity joined a zone the agent already occupies.
    EntityAdded,
    /// The notification repeated a known overlap.
    Duplicate,
}

/// What happened to the zone set on a leave notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The last sub-entity left; the zone is no longer active.
    ZoneLeft,
    /// One sub-entity left; others remain inside.
    EntityRemoved,
    /// The overlap was not tracked.
    Unknown,
}

#[derive(Debug, Clone)]
struct TrackedZone {
    kind: ZoneKind,
    entities: BTreeSet<EntityId>,
    entered_seq: u64,
}

/// Zones currently overlapping the agent.
#[derive(Debug, Clone, Default)]
pub struct ZoneTracker {
    zones: BTreeMap<ZoneId, TrackedZone>,
    next_seq: u64,
    last_used_point: Option<EntityId>,
}

impl ZoneTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entity` now overlaps `zone`.
    pub fn on_zone_enter(&mut self, zone: ZoneId, kind: ZoneKind, entity: EntityId) -> EnterOutcome {
        if let Some(tracked) = self.zones.get_mut(&zone) {
            return if tracked.entities.insert(entity) {
                EnterOutcome::EntityAdded
            } else {
                EnterOutcome::Duplicate
            };
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.zones.insert(
            zone,
            TrackedZone {
                kind,
                entities: BTreeSet::from([entity]),
                entered_seq: seq,
            },
        );
        debug!(zone = %zone, ?kind, entity = %entity, "Zone entered");
        EnterOutcome::ZoneEntered
    }

    /// Record that `entity` no longer overlaps `zone`.
    pub fn on_zone_leave(&mut self, zone: ZoneId, entity: EntityId) -> LeaveOutcome {
        let Some(tracked) = self.zones.get_mut(&zone) else {
            return LeaveOutcome::Unknown;
        };
        if !tracked.entities.remove(&entity) {
            return LeaveOutcome::Unknown;
        }
        if tracked.entities.is_empty() {
            self.zones.remove(&zone);
            debug!(zone = %zone, "Zone left");
            LeaveOutcome::ZoneLeft
        } else {
            LeaveOutcome::EntityRemoved
        }
    }

    /// A stay notification. Treated as an enter so an overlap whose enter
    /// was missed (e.g. the agent spawned inside the zone) is still tracked.
    pub fn on_zone_stay(&mut self, zone: ZoneId, kind: ZoneKind, entity: EntityId) -> EnterOutcome {
        self.on_zone_enter(zone, kind, entity)
    }

    /// Whether the agent overlaps any zone.
    pub fn is_any_zone_active(&self) -> bool {
        !self.zones.is_empty()
    }

    /// Whether the agent overlaps this zone.
    pub fn contains(&self, zone: ZoneId) -> bool {
        self.zones.contains_key(&zone)
    }

    /// The kind recorded for a zone.
    pub fn kind_of(&self, zone: ZoneId) -> Option<ZoneKind> {
        self.zones.get(&zone).map(|z| z.kind)
    }

    /// Sub-entities of the agent inside a zone.
    pub fn entities_in(&self, zone: ZoneId) -> impl Iterator<Item = EntityId> + '_ {
        self.zones
            .get(&zone)
            .into_iter()
            .flat_map(|z| z.entities.iter().copied())
    }

    /// Whether any overlapped zone is a pipe zone.
    pub fn in_pipe_zone(&self) -> bool {
        self.zones.values().any(|z| z.kind == ZoneKind::Pipe)
    }

    /// Source zones in priority order: `preferred` first if tracked, then
    /// by the order they were entered.
    pub fn source_zones(&self, preferred: Option<ZoneId>) -> Vec<ZoneId> {
        let mut zones: Vec<(u64, ZoneId)> = self
            .zones
            .iter()
            .filter(|(_, z)| z.kind.is_source())
            .map(|(id, z)| (z.entered_seq, *id))
            .collect();
        zones.sort_unstable();
        let mut ordered: Vec<ZoneId> = zones.into_iter().map(|(_, id)| id).collect();
        if let Some(pos) = preferred.and_then(|p| ordered.iter().position(|z| *z == p)) {
            let first = ordered.remove(pos);
            ordered.insert(0, first);
        }
        ordered
    }

    /// Forget every zone (used on start).
    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// Remember the point source used last so discovery skips it.
    pub fn set_last_used_point(&mut self, point: Option<EntityId>) {
        self.last_used_point = point;
    }

    /// The point source used last.
    pub const fn last_used_point(&self) -> Option<EntityId> {
        self.last_used_point
    }

    /// Discovery pass over point sources.
    ///
    /// Activates the first registered source that is activatable for the
    /// agent and is not the most recently used point, unless the agent is
    /// back within that point's proximity. Registry order decides; at most
    /// one source is activated per call.
    pub fn discover<R: ResourceRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        agent: AgentId,
    ) -> Option<EntityId> {
        let last_used = self.last_used_point;
        for source in registry.list_activatable() {
            let id = source.source_id();
            if !source.is_activatable_for(agent) {
                continue;
            }
            if last_used == Some(id) && !source.is_within_proximity(agent) {
                continue;
            }
            source.activate(agent);
            info!(agent = %agent, source = %id, "Point source activated");
            self.last_used_point = Some(id);
            return Some(id);
        }
        None
    }
}
