//! Interface contracts between the core and the surrounding simulation.
//!
//! The core never reaches into simulation objects directly. The integration
//! layer implements these traits (usually on one adapter type) and passes
//! itself into the controller's lifecycle hooks.

use loadgate_types::{
    AgentId, EntityId, MaterialType, QueryId, StatusKey, VehicleDescriptor, ZoneId, ZoneOffer,
};

use crate::compartments::CompartmentRef;

/// A point source that must be explicitly activated instead of being driven
/// into (pickup points, bale stations).
pub trait Activatable {
    /// The source entity.
    fn source_id(&self) -> EntityId;

    /// Whether the source would accept an activation from this agent now.
    fn is_activatable_for(&self, agent: AgentId) -> bool;

    /// Whether the agent is within the source's activation radius.
    fn is_within_proximity(&self, agent: AgentId) -> bool;

    /// Activate the source for the agent.
    fn activate(&mut self, agent: AgentId);
}

/// Queryable view of the simulation's resources.
pub trait ResourceRegistry {
    /// Every registered activatable source, in registry order.
    fn list_activatable(&mut self) -> Vec<&mut dyn Activatable>;

    /// What a zone currently offers, or `None` if the zone is unknown.
    fn zone_offer(&self, zone: ZoneId) -> Option<ZoneOffer>;
}

/// The agent's vehicle and attached implements as fill units.
pub trait FillUnitHost {
    /// Flat description of the vehicle and everything attached to it.
    fn vehicle_tree(&self, agent: AgentId) -> Vec<VehicleDescriptor>;

    /// Open or close the intake cover on a compartment.
    fn set_cover_open(&mut self, at: CompartmentRef, open: bool);

    /// Start or stop filling a compartment from a source.
    fn set_filling(&mut self, at: CompartmentRef, source: EntityId, material: &MaterialType, on: bool);
}

/// Discharge control on the agent's compartments.
pub trait Dischargeable {
    /// Start or stop discharging a compartment into a target.
    fn set_discharging(&mut self, at: CompartmentRef, target: EntityId, on: bool);

    /// Reset any state the discharge point keeps for this agent.
    fn reset_discharge_point(&mut self, target: EntityId);

    /// Issue an asynchronous line-of-sight query from the compartment's
    /// discharge node towards the target. `None` means the ray node does
    /// not exist.
    fn issue_line_of_sight(&mut self, at: CompartmentRef, target: EntityId) -> Option<QueryId>;
}

/// The shared on-screen notification surface.
pub trait StatusSurface {
    /// Request a status line for the agent.
    fn show_status(&mut self, agent: AgentId, status: StatusKey);

    /// Withdraw the agent's status line.
    fn clear_status(&mut self, agent: AgentId);
}

/// Outbound channel for state replication.
pub trait ReplicationSink {
    /// Send the state token to observers.
    fn publish_state(&mut self, agent: AgentId, token: &str);
}

/// Everything the controller needs from the simulation.
pub trait Host: FillUnitHost + Dischargeable + ResourceRegistry + StatusSurface + ReplicationSink {}

impl<T> Host for T where
    T: FillUnitHost + Dischargeable + ResourceRegistry + StatusSurface + ReplicationSink
{
}
