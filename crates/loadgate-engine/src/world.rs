//! In-memory simulation world the engine drives a controller against.
//!
//! [`World`] implements every host trait the controller needs. Material
//! moves once per tick in [`World::advance`]: active fills draw from depot
//! stock, active discharges empty into discharge points, rival agents draw
//! from finite depots, and depots refill. Line-of-sight queries issued
//! during a tick resolve on the next one, like an asynchronous physics
//! raycast would.

use std::collections::BTreeMap;

use loadgate_core::compartments::CompartmentRef;
use loadgate_core::events::ControllerEvent;
use loadgate_core::host::{
    Activatable, Dischargeable, FillUnitHost, ReplicationSink, ResourceRegistry, StatusSurface,
};
use loadgate_types::{
    AgentId, CompartmentSnapshot, EntityId, MaterialType, QueryId, RaycastHit, StatusKey,
    VehicleDescriptor, ZoneId, ZoneKind, ZoneLevel, ZoneOffer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::scenario::{RivalSpec, Scenario};

/// Collision shape index reported for every trigger overlap.
const TRIGGER_SHAPE: u32 = 0;

// ---------------------------------------------------------------------------
// World entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Vehicle {
    entity: EntityId,
    parent: Option<EntityId>,
    discharge_node: bool,
    compartments: Vec<CompartmentSnapshot>,
}

#[derive(Debug, Clone)]
struct Stock {
    material: MaterialType,
    level: Option<Decimal>,
    refill: Decimal,
}

impl Stock {
    fn zone_level(&self) -> ZoneLevel {
        self.level.map_or(ZoneLevel::Unlimited, ZoneLevel::Remaining)
    }

    /// Take up to `wanted`; returns what was actually taken.
    fn draw(&mut self, wanted: Decimal) -> Decimal {
        match &mut self.level {
            None => wanted,
            Some(level) => {
                let taken = wanted.min(*level).max(Decimal::ZERO);
                *level = level.saturating_sub(taken);
                taken
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Idle,
    Requested,
    Active,
}

/// A material source. Point depots double as [`Activatable`] sources.
#[derive(Debug, Clone)]
struct Depot {
    name: String,
    entity: EntityId,
    zone: ZoneId,
    kind: ZoneKind,
    opens_covers: bool,
    point: bool,
    stock: Vec<Stock>,
    present: bool,
    activation: Activation,
}

impl Activatable for Depot {
    fn source_id(&self) -> EntityId {
        self.entity
    }

    fn is_activatable_for(&self, _agent: AgentId) -> bool {
        self.present && self.activation == Activation::Idle
    }

    fn is_within_proximity(&self, _agent: AgentId) -> bool {
        self.present
    }

    fn activate(&mut self, agent: AgentId) {
        debug!(agent = %agent, depot = %self.name, "Point depot activation requested");
        self.activation = Activation::Requested;
    }
}

#[derive(Debug, Clone)]
struct DischargePoint {
    name: String,
    entity: EntityId,
    zone: ZoneId,
    obstructed: bool,
}

#[derive(Debug, Clone)]
enum Flow {
    Fill {
        at: CompartmentRef,
        source: EntityId,
        material: MaterialType,
    },
    Discharge {
        at: CompartmentRef,
        target: EntityId,
    },
}

impl Flow {
    const fn at(&self) -> CompartmentRef {
        match self {
            Self::Fill { at, .. } | Self::Discharge { at, .. } => *at,
        }
    }
}

/// What a route stop resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// A depot entered by driving into its trigger zone.
    Depot,
    /// A depot that must be activated.
    PointDepot,
    /// A discharge point.
    Discharge,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counters collected over a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorldTotals {
    /// Units loaded, per material.
    pub loaded: BTreeMap<String, Decimal>,
    /// Units delivered to discharge points, per material.
    pub delivered: BTreeMap<String, Decimal>,
    /// Units drawn by rival agents, per material.
    pub drawn_by_rivals: BTreeMap<String, Decimal>,
    /// Fill commands that started a flow.
    pub fills_started: u32,
    /// Discharge commands that started a flow.
    pub discharges_started: u32,
    /// Line-of-sight queries issued.
    pub line_of_sight_queries: u32,
    /// Status lines shown.
    pub status_shown: BTreeMap<String, u32>,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The simulated surroundings of one agent.
#[derive(Debug)]
pub struct World {
    agent: AgentId,
    vehicles: Vec<Vehicle>,
    depots: Vec<Depot>,
    discharge_points: Vec<DischargePoint>,
    flows: Vec<Flow>,
    pending_rays: Vec<(QueryId, EntityId)>,
    resolved_rays: Vec<RaycastHit>,
    outbox: Vec<String>,
    status: Option<StatusKey>,
    fill_rate: Decimal,
    discharge_rate: Decimal,
    rivals: RivalSpec,
    rng: StdRng,
    totals: WorldTotals,
}

impl World {
    /// Build the world a scenario describes. Vehicle parents are resolved
    /// by name; the scenario is expected to be validated.
    pub fn from_scenario(agent: AgentId, scenario: &Scenario) -> Self {
        let names: BTreeMap<&str, EntityId> = scenario
            .vehicles
            .iter()
            .map(|v| (v.name.as_str(), EntityId::new()))
            .collect();
        let vehicles = scenario
            .vehicles
            .iter()
            .filter_map(|spec| {
                let entity = *names.get(spec.name.as_str())?;
                let parent = spec
                    .parent
                    .as_deref()
                    .and_then(|p| names.get(p).copied());
                let compartments = spec
                    .compartments
                    .iter()
                    .enumerate()
                    .map(|(index, c)| CompartmentSnapshot {
                        index,
                        capacity: c.capacity,
                        level: c.level,
                        material: c.material.clone(),
                        supported: c.supported.clone(),
                        cover_closing: false,
                    })
                    .collect();
                Some(Vehicle {
                    entity,
                    parent,
                    discharge_node: spec.discharge_node,
                    compartments,
                })
            })
            .collect();

        let depots = scenario
            .depots
            .iter()
            .map(|spec| Depot {
                name: spec.name.clone(),
                entity: EntityId::new(),
                zone: ZoneId::new(),
                kind: spec.kind,
                opens_covers: spec.opens_covers,
                point: spec.point,
                stock: spec
                    .stock
                    .iter()
                    .map(|s| Stock {
                        material: s.material.clone(),
                        level: s.level,
                        refill: s.refill,
                    })
                    .collect(),
                present: false,
                activation: Activation::Idle,
            })
            .collect();

        let discharge_points = scenario
            .discharge_points
            .iter()
            .map(|spec| DischargePoint {
                name: spec.name.clone(),
                entity: EntityId::new(),
                zone: ZoneId::new(),
                obstructed: spec.obstructed,
            })
            .collect();

        Self {
            agent,
            vehicles,
            depots,
            discharge_points,
            flows: Vec::new(),
            pending_rays: Vec::new(),
            resolved_rays: Vec::new(),
            outbox: Vec::new(),
            status: None,
            fill_rate: scenario.fill_rate,
            discharge_rate: scenario.discharge_rate,
            rivals: scenario.rivals.clone(),
            rng: StdRng::seed_from_u64(scenario.seed),
            totals: WorldTotals::default(),
        }
    }

    /// What kind of stop a route name refers to.
    pub fn stop_kind(&self, name: &str) -> Option<StopKind> {
        if let Some(depot) = self.depots.iter().find(|d| d.name == name) {
            return Some(if depot.point {
                StopKind::PointDepot
            } else {
                StopKind::Depot
            });
        }
        self.discharge_points
            .iter()
            .any(|d| d.name == name)
            .then_some(StopKind::Discharge)
    }

    /// Every entity making up the agent's vehicle.
    pub fn vehicle_entities(&self) -> Vec<EntityId> {
        self.vehicles.iter().map(|v| v.entity).collect()
    }

    /// Compartments that hold material, as `(ref, fill percent)`.
    pub fn laden_compartments(&self) -> Vec<(CompartmentRef, Decimal)> {
        self.vehicles
            .iter()
            .flat_map(|v| {
                v.compartments.iter().filter(|c| !c.is_empty()).map(|c| {
                    (
                        CompartmentRef {
                            entity: v.entity,
                            index: c.index,
                        },
                        c.fill_percent(),
                    )
                })
            })
            .collect()
    }

    /// Arrive at a stop. Returns the collision and discharge events the
    /// arrival produces.
    pub fn arrive(&mut self, stop: &str) -> Vec<ControllerEvent> {
        let entities = self.vehicle_entities();
        if let Some(depot) = self.depots.iter_mut().find(|d| d.name == stop) {
            depot.present = true;
            if depot.point {
                return Vec::new();
            }
            info!(depot = %depot.name, "Arrived at depot");
            return enter_events(depot.zone, depot.kind, &entities);
        }
        if let Some(point) = self.discharge_points.iter().find(|d| d.name == stop) {
            info!(discharge_point = %point.name, "Arrived at discharge point");
            return enter_events(point.zone, ZoneKind::Discharge, &entities);
        }
        Vec::new()
    }

    /// Discharge opportunities at a discharge stop for every laden
    /// compartment.
    pub fn discharge_offers(&self, stop: &str, can_discharge: bool) -> Vec<ControllerEvent> {
        let Some(point) = self.discharge_points.iter().find(|d| d.name == stop) else {
            return Vec::new();
        };
        self.laden_compartments()
            .into_iter()
            .map(|(at, _)| ControllerEvent::DischargeStateChanged {
                entity: at.entity,
                compartment: at.index,
                target: point.entity,
                zone: Some(point.zone),
                can_discharge,
            })
            .collect()
    }

    /// Leave a stop. Returns the leave events for every zone the vehicle
    /// occupied there.
    pub fn depart(&mut self, stop: &str) -> Vec<ControllerEvent> {
        let entities = self.vehicle_entities();
        if let Some(depot) = self.depots.iter_mut().find(|d| d.name == stop) {
            depot.present = false;
            let entered = !depot.point || depot.activation != Activation::Idle;
            depot.activation = Activation::Idle;
            info!(depot = %depot.name, "Left depot");
            return if entered {
                leave_events(depot.zone, &entities)
            } else {
                Vec::new()
            };
        }
        if let Some(point) = self.discharge_points.iter().find(|d| d.name == stop) {
            let zone = point.zone;
            let mut events = self.discharge_offers(stop, false);
            events.extend(leave_events(zone, &entities));
            info!(discharge_point = %stop, "Left discharge point");
            return events;
        }
        Vec::new()
    }

    /// Callbacks that became due since the last tick: zone entries for
    /// freshly activated point depots and resolved raycasts.
    pub fn take_callbacks(&mut self) -> Vec<ControllerEvent> {
        let entities = self.vehicle_entities();
        let mut events = Vec::new();
        for depot in &mut self.depots {
            if depot.activation == Activation::Requested {
                depot.activation = Activation::Active;
                info!(depot = %depot.name, "Point depot activated");
                events.extend(enter_events(depot.zone, depot.kind, &entities));
            }
        }
        events.extend(self.resolved_rays.drain(..).map(ControllerEvent::Raycast));
        events
    }

    /// State tokens published since the last call.
    pub fn take_published(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    /// Advance the world by one tick.
    pub fn advance(&mut self) {
        for vehicle in &mut self.vehicles {
            for compartment in &mut vehicle.compartments {
                compartment.cover_closing = false;
            }
        }

        let flows = self.flows.clone();
        for flow in &flows {
            match flow {
                Flow::Fill {
                    at,
                    source,
                    material,
                } => self.fill_step(*at, *source, material),
                Flow::Discharge { at, target } => self.discharge_step(*at, *target),
            }
        }

        self.rivals_draw();
        for depot in &mut self.depots {
            for stock in &mut depot.stock {
                if let Some(level) = &mut stock.level {
                    *level = level.saturating_add(stock.refill);
                }
            }
        }

        let rays = std::mem::take(&mut self.pending_rays);
        for (query, target) in rays {
            let hit = if self.is_obstructed(target) {
                Some(EntityId::new())
            } else {
                Some(target)
            };
            self.resolved_rays.push(RaycastHit {
                query,
                hit,
                point: [0.0; 3],
                distance: 1.0,
                normal: [0.0, 1.0, 0.0],
                shape_index: TRIGGER_SHAPE,
            });
        }
    }

    /// Run counters.
    pub const fn totals(&self) -> &WorldTotals {
        &self.totals
    }

    /// Remaining depot stock as `depot/material -> level`; unlimited stock
    /// is omitted.
    pub fn depot_levels(&self) -> BTreeMap<String, Decimal> {
        self.depots
            .iter()
            .flat_map(|d| {
                d.stock.iter().filter_map(move |s| {
                    s.level.map(|level| (format!("{}/{}", d.name, s.material), level))
                })
            })
            .collect()
    }

    /// Current status line, if any.
    pub const fn status(&self) -> Option<StatusKey> {
        self.status
    }

    fn compartment_mut(&mut self, at: CompartmentRef) -> Option<&mut CompartmentSnapshot> {
        self.vehicles
            .iter_mut()
            .find(|v| v.entity == at.entity)?
            .compartments
            .get_mut(at.index)
    }

    fn fill_step(&mut self, at: CompartmentRef, source: EntityId, material: &MaterialType) {
        let rate = self.fill_rate;
        let Some(room) = self
            .compartment_mut(at)
            .map(|c| c.capacity.saturating_sub(c.level).max(Decimal::ZERO))
        else {
            return;
        };
        let Some(stock) = self
            .depots
            .iter_mut()
            .find(|d| d.entity == source)
            .and_then(|d| d.stock.iter_mut().find(|s| &s.material == material))
        else {
            return;
        };
        let taken = stock.draw(rate.min(room));
        if taken <= Decimal::ZERO {
            return;
        }
        if let Some(compartment) = self.compartment_mut(at) {
            compartment.level = compartment.level.saturating_add(taken);
            compartment.material = Some(material.clone());
        }
        add_to(&mut self.totals.loaded, material, taken);
    }

    fn discharge_step(&mut self, at: CompartmentRef, target: EntityId) {
        let rate = self.discharge_rate;
        let Some(compartment) = self.compartment_mut(at) else {
            return;
        };
        let Some(material) = compartment.material.clone() else {
            return;
        };
        let moved = rate.min(compartment.level).max(Decimal::ZERO);
        compartment.level = compartment.level.saturating_sub(moved);
        if compartment.level <= Decimal::ZERO {
            compartment.material = None;
            debug!(entity = %at.entity, compartment = at.index, target = %target, "Compartment discharged");
        }
        add_to(&mut self.totals.delivered, &material, moved);
    }

    fn rivals_draw(&mut self) {
        if self.rivals.count == 0 || self.rivals.max_draw == 0 {
            return;
        }
        for depot in &mut self.depots {
            for stock in &mut depot.stock {
                if stock.level.is_none() {
                    continue;
                }
                for _ in 0..self.rivals.count {
                    let wanted = Decimal::from(self.rng.random_range(0..=self.rivals.max_draw));
                    let taken = stock.draw(wanted);
                    add_to(&mut self.totals.drawn_by_rivals, &stock.material, taken);
                }
            }
        }
    }

    fn is_obstructed(&self, target: EntityId) -> bool {
        self.discharge_points
            .iter()
            .any(|d| d.entity == target && d.obstructed)
    }

    fn stop_flow(&mut self, at: CompartmentRef) {
        self.flows.retain(|f| f.at() != at);
    }
}

fn enter_events(zone: ZoneId, kind: ZoneKind, entities: &[EntityId]) -> Vec<ControllerEvent> {
    entities
        .iter()
        .map(|&entity| ControllerEvent::ZoneEnter {
            zone,
            kind,
            entity,
            shape: TRIGGER_SHAPE,
        })
        .collect()
}

fn leave_events(zone: ZoneId, entities: &[EntityId]) -> Vec<ControllerEvent> {
    entities
        .iter()
        .map(|&entity| ControllerEvent::ZoneLeave {
            zone,
            entity,
            shape: TRIGGER_SHAPE,
        })
        .collect()
}

fn add_to(totals: &mut BTreeMap<String, Decimal>, material: &MaterialType, amount: Decimal) {
    if amount <= Decimal::ZERO {
        return;
    }
    let entry = totals.entry(material.to_string()).or_default();
    *entry = entry.saturating_add(amount);
}

// ---------------------------------------------------------------------------
// Host traits
// ---------------------------------------------------------------------------

impl ResourceRegistry for World {
    fn list_activatable(&mut self) -> Vec<&mut dyn Activatable> {
        self.depots
            .iter_mut()
            .filter(|d| d.point)
            .map(|d| d as &mut dyn Activatable)
            .collect()
    }

    fn zone_offer(&self, zone: ZoneId) -> Option<ZoneOffer> {
        if let Some(depot) = self.depots.iter().find(|d| d.zone == zone) {
            return Some(ZoneOffer {
                entity: depot.entity,
                kind: depot.kind,
                levels: depot
                    .stock
                    .iter()
                    .map(|s| (s.material.clone(), s.zone_level()))
                    .collect(),
                opens_covers: depot.opens_covers,
            });
        }
        self.discharge_points
            .iter()
            .find(|d| d.zone == zone)
            .map(|d| ZoneOffer {
                entity: d.entity,
                kind: ZoneKind::Discharge,
                levels: Vec::new(),
                opens_covers: false,
            })
    }
}

impl FillUnitHost for World {
    fn vehicle_tree(&self, agent: AgentId) -> Vec<VehicleDescriptor> {
        if agent != self.agent {
            return Vec::new();
        }
        self.vehicles
            .iter()
            .map(|v| VehicleDescriptor {
                entity: v.entity,
                parent: v.parent,
                compartments: v.compartments.clone(),
            })
            .collect()
    }

    fn set_cover_open(&mut self, at: CompartmentRef, open: bool) {
        debug!(entity = %at.entity, compartment = at.index, open, "Cover moved");
        if open {
            return;
        }
        if let Some(compartment) = self.compartment_mut(at) {
            compartment.cover_closing = true;
        }
    }

    fn set_filling(&mut self, at: CompartmentRef, source: EntityId, material: &MaterialType, on: bool) {
        self.stop_flow(at);
        if on {
            self.flows.push(Flow::Fill {
                at,
                source,
                material: material.clone(),
            });
            self.totals.fills_started = self.totals.fills_started.saturating_add(1);
        }
    }
}

impl Dischargeable for World {
    fn set_discharging(&mut self, at: CompartmentRef, target: EntityId, on: bool) {
        self.stop_flow(at);
        if on {
            self.flows.push(Flow::Discharge { at, target });
            self.totals.discharges_started = self.totals.discharges_started.saturating_add(1);
        }
    }

    fn reset_discharge_point(&mut self, target: EntityId) {
        if let Some(point) = self.discharge_points.iter().find(|d| d.entity == target) {
            debug!(discharge_point = %point.name, "Discharge point reset");
        }
    }

    fn issue_line_of_sight(&mut self, at: CompartmentRef, target: EntityId) -> Option<QueryId> {
        let vehicle = self.vehicles.iter().find(|v| v.entity == at.entity)?;
        if !vehicle.discharge_node {
            return None;
        }
        let query = QueryId::new();
        self.pending_rays.push((query, target));
        self.totals.line_of_sight_queries = self.totals.line_of_sight_queries.saturating_add(1);
        Some(query)
    }
}

impl StatusSurface for World {
    fn show_status(&mut self, agent: AgentId, status: StatusKey) {
        info!(agent = %agent, status = %status, "Status shown");
        self.status = Some(status);
        let count = self.totals.status_shown.entry(status.key().to_owned()).or_default();
        *count = count.saturating_add(1);
    }

    fn clear_status(&mut self, agent: AgentId) {
        if self.status.take().is_some() {
            debug!(agent = %agent, "Status cleared");
        }
    }
}

impl ReplicationSink for World {
    fn publish_state(&mut self, _agent: AgentId, token: &str) {
        self.outbox.push(token.to_owned());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const SCENARIO: &str = r"
seed: 7
fill_rate: 100
discharge_rate: 300
vehicles:
  - name: truck
    compartments:
      - capacity: 1000
        supported: [WHEAT]
depots:
  - name: silo
    stock:
      - material: WHEAT
        level: 250
        refill: 10
  - name: pallets
    point: true
    stock:
      - material: BOARDS
discharge_points:
  - name: mill
    obstructed: true
route:
  - stop: silo
  - stop: mill
";

    fn world() -> World {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        World::from_scenario(AgentId::new(), &scenario)
    }

    fn first_compartment(world: &World) -> CompartmentRef {
        CompartmentRef {
            entity: world.vehicle_entities()[0],
            index: 0,
        }
    }

    #[test]
    fn filling_is_capped_by_depot_stock() {
        let mut world = world();
        let at = first_compartment(&world);
        let silo = world.depots[0].entity;
        let wheat = MaterialType::from("WHEAT");
        world.set_filling(at, silo, &wheat, true);

        world.advance();
        world.advance();
        world.advance();

        // 100 + 100 + (50 left + 10 + 10 refill)
        let tree = world.vehicle_tree(world.agent);
        assert_eq!(tree[0].compartments[0].level, dec!(270));
        assert_eq!(world.totals().loaded.get("WHEAT"), Some(&dec!(270)));
        assert_eq!(world.depot_levels().get("silo/WHEAT"), Some(&dec!(10)));
    }

    #[test]
    fn stopping_a_fill_ends_the_flow() {
        let mut world = world();
        let at = first_compartment(&world);
        let silo = world.depots[0].entity;
        let wheat = MaterialType::from("WHEAT");
        world.set_filling(at, silo, &wheat, true);
        world.advance();
        world.set_filling(at, silo, &wheat, false);
        world.advance();

        assert_eq!(world.totals().loaded.get("WHEAT"), Some(&dec!(100)));
        assert_eq!(world.totals().fills_started, 1);
    }

    #[test]
    fn discharge_empties_and_clears_material() {
        let mut world = world();
        let at = first_compartment(&world);
        let silo = world.depots[0].entity;
        let wheat = MaterialType::from("WHEAT");
        world.set_filling(at, silo, &wheat, true);
        world.advance();
        world.set_filling(at, silo, &wheat, false);

        let mill = world.discharge_points[0].entity;
        world.set_discharging(at, mill, true);
        world.advance();

        assert!(world.laden_compartments().is_empty());
        assert_eq!(world.totals().delivered.get("WHEAT"), Some(&dec!(100)));
    }

    #[test]
    fn line_of_sight_resolves_on_next_tick() {
        let mut world = world();
        let at = first_compartment(&world);
        let mill = world.discharge_points[0].entity;
        let query = world.issue_line_of_sight(at, mill).unwrap();

        assert!(world.take_callbacks().is_empty());
        world.advance();
        let callbacks = world.take_callbacks();
        let [ControllerEvent::Raycast(hit)] = callbacks.as_slice() else {
            panic!("expected one raycast, got {callbacks:?}");
        };
        assert_eq!(hit.query, query);
        assert_ne!(hit.hit, Some(mill), "mill is configured as obstructed");
    }

    #[test]
    fn point_depot_enters_only_after_activation() {
        let mut world = world();
        assert_eq!(world.stop_kind("pallets"), Some(StopKind::PointDepot));
        assert!(world.arrive("pallets").is_empty());

        let agent = world.agent;
        let mut sources = world.list_activatable();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].is_activatable_for(agent));
        sources[0].activate(agent);

        let callbacks = world.take_callbacks();
        assert_eq!(callbacks.len(), 1);
        assert!(matches!(callbacks[0], ControllerEvent::ZoneEnter { .. }));
        assert_eq!(world.depart("pallets").len(), 1);
    }

    #[test]
    fn unactivated_point_depot_departs_silently() {
        let mut world = world();
        world.arrive("pallets");
        assert!(world.depart("pallets").is_empty());
    }

    #[test]
    fn unlimited_stock_reports_unlimited() {
        let world = world();
        let offer = world.zone_offer(world.depots[1].zone).unwrap();
        assert_eq!(
            offer.level_of(&MaterialType::from("BOARDS")),
            Some(ZoneLevel::Unlimited)
        );
    }
}
