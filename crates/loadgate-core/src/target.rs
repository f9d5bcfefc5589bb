//! The single binding between the agent and the entity it transfers with.

use loadgate_types::{EntityId, LoadingState, MaterialType, TransferDirection, ZoneId};

use crate::compartments::CompartmentRef;

/// The agent's current transfer binding. At most one exists per agent.
///
/// A loading target may be bound without transferring: the agent holds at
/// a depot that does not yet have enough material ("wait here").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTarget {
    /// The agent's compartment involved in the transfer.
    pub at: CompartmentRef,
    /// The material moved.
    pub material: MaterialType,
    /// The depot or discharge point on the other side.
    pub counterpart: EntityId,
    /// The zone the binding belongs to, if any.
    pub source_zone: Option<ZoneId>,
    /// Loading or unloading.
    pub direction: TransferDirection,
    /// Whether material is currently flowing.
    pub transferring: bool,
}

impl ActiveTarget {
    /// A loading binding.
    pub const fn loading(
        at: CompartmentRef,
        material: MaterialType,
        counterpart: EntityId,
        source_zone: Option<ZoneId>,
        transferring: bool,
    ) -> Self {
        Self {
            at,
            material,
            counterpart,
            source_zone,
            direction: TransferDirection::Loading,
            transferring,
        }
    }

    /// An unloading binding. Unloading bindings always start flowing.
    pub const fn unloading(
        at: CompartmentRef,
        material: MaterialType,
        counterpart: EntityId,
        source_zone: Option<ZoneId>,
    ) -> Self {
        Self {
            at,
            material,
            counterpart,
            source_zone,
            direction: TransferDirection::Unloading,
            transferring: true,
        }
    }

    /// The controller state this binding implies.
    pub const fn state(&self) -> LoadingState {
        self.direction.state()
    }

    /// Whether the binding was made inside `zone`.
    pub fn belongs_to(&self, zone: ZoneId) -> bool {
        self.source_zone == Some(zone)
    }
}
