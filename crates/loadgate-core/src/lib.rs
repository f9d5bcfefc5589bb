//! Trigger arbitration and the loading/unloading state machine for an
//! autonomous vehicle agent.
//!
//! This crate decides *when* an agent may load, unload, idle, or hand
//! control back to the operator, and *which* material it selects. It never
//! touches simulation objects directly: everything it needs from the world
//! comes through the traits in [`host`].
//!
//! # Modules
//!
//! - [`admission`] -- Layered capacity, repetition, alternation, and
//!   starvation checks for one candidate material.
//! - [`compartments`] -- Arena tree of the agent's fillable compartments.
//! - [`config`] -- Configuration loading from `loadgate-config.yaml` into
//!   strongly-typed structs.
//! - [`controller`] -- [`TransferController`], the per-agent state machine.
//! - [`error`] -- Controller error types.
//! - [`events`] -- Callback events queued between ticks.
//! - [`history`] -- Bounded history of recently started materials.
//! - [`host`] -- Interface contracts the integration layer implements.
//! - [`los`] -- Asynchronous line-of-sight tracking for discharge.
//! - [`quota`] -- The ordered per-material quota table.
//! - [`replication`] -- State token publishing and replica mirroring.
//! - [`safety`] -- Per-tick checks that end a running transfer.
//! - [`selection`] -- Mapping an admission pass onto a controller action.
//! - [`target`] -- The agent's single transfer binding.
//! - [`zones`] -- Zone tracking and point-source discovery.
//!
//! [`TransferController`]: controller::TransferController

pub mod admission;
pub mod compartments;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod host;
pub mod los;
pub mod quota;
pub mod replication;
pub mod safety;
pub mod selection;
pub mod target;
pub mod zones;

pub use controller::{ControllerRole, DriveProgress, TransferController};
pub use error::ControllerError;
