//! Shared type definitions for the Loadgate transfer arbitration core.
//!
//! These types cross every boundary of the workspace: the collision layer
//! reports zones and raycast hits with them, the host describes compartments
//! with them, and the controller replicates [`LoadingState`] by name.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, entities, zones, queries
//! - [`enums`] -- Controller state, admission decisions, status keys, zone kinds
//! - [`structs`] -- Materials, quota entries, compartments, zone offers

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AdmissionDecision, LoadingState, StatusKey, TransferDirection, ZoneKind};
pub use ids::{AgentId, EntityId, QueryId, ZoneId};
pub use structs::{
    CompartmentSnapshot, DEFAULT_MAX_FILL_PERCENT, HUNDRED, MaterialType, QuotaEntry, RaycastHit,
    VehicleDescriptor, ZoneLevel, ZoneOffer,
};
