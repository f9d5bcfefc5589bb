//! Enumeration types shared by the arbitration core and its integrations.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Controller state
// ---------------------------------------------------------------------------

/// The loading/unloading state of one agent.
///
/// Exactly one value holds per agent at any time. The authoritative
/// instance replicates it to observers by [`name`](Self::name); replicas
/// resolve the token back with [`from_name`](Self::from_name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoadingState {
    /// No active transfer.
    Idle,
    /// Bound to a source and filling (or waiting to fill) a compartment.
    Loading,
    /// Bound to a discharge point and emptying a compartment.
    Unloading,
    /// A human took over; automatic transitions are suspended.
    ManualOverride,
    /// Explicitly halted by the driving controller.
    Stopped,
}

impl LoadingState {
    /// All states, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Idle,
        Self::Loading,
        Self::Unloading,
        Self::ManualOverride,
        Self::Stopped,
    ];

    /// The replication token for this state.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Unloading => "Unloading",
            Self::ManualOverride => "ManualOverride",
            Self::Stopped => "Stopped",
        }
    }

    /// Resolve a replication token. Matching is exact; unknown tokens
    /// return `None` and must not be coerced to a default.
    pub fn from_name(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == token)
    }

    /// Whether a transfer binding is expected in this state.
    pub const fn is_transferring(self) -> bool {
        matches!(self, Self::Loading | Self::Unloading)
    }
}

impl core::fmt::Display for LoadingState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which way material flows for an active target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransferDirection {
    /// From a source depot into the agent.
    Loading,
    /// From the agent into a discharge point.
    Unloading,
}

impl TransferDirection {
    /// The controller state that corresponds to this direction.
    pub const fn state(self) -> LoadingState {
        match self {
            Self::Loading => LoadingState::Loading,
            Self::Unloading => LoadingState::Unloading,
        }
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Outcome of evaluating one candidate material against current conditions.
///
/// These are ordinary control-flow values. "No admission this tick" is
/// frequent and expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionDecision {
    /// The compartment is already at or above the configured ceiling.
    CapacityExceeded,
    /// The material's repetition counter is used up.
    RepetitionBlocked,
    /// The alternation rule forbids this material right now.
    AlternationBlocked,
    /// The floor cannot be reached from what the depot currently holds.
    StarvationBlocked {
        /// `true` when the depot reported an exhausted level; the caller
        /// should wait for replenishment rather than abandon the depot.
        zone_empty: bool,
    },
    /// Start or continue the transfer.
    Admit,
    /// Not applicable; try the next material.
    SkipCandidate,
    /// The compartment already holds enough of this material.
    TargetSatisfied,
}

impl AdmissionDecision {
    /// Whether this decision ends the selection pass (the first such entry
    /// in priority order is the one the controller applies).
    pub const fn is_actionable(self) -> bool {
        matches!(
            self,
            Self::Admit | Self::CapacityExceeded | Self::StarvationBlocked { .. } | Self::TargetSatisfied
        )
    }
}

// ---------------------------------------------------------------------------
// Status surface
// ---------------------------------------------------------------------------

/// Human-readable status keys requested on the shared notification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKey {
    /// Nothing loadable is available at the depot.
    DepotEmpty,
    /// The repetition counter for the selected material is used up.
    QuotaExhausted,
    /// The depot has material but not enough to start; holding.
    WaitingOnDepot,
}

impl StatusKey {
    /// The display key handed to the notification surface.
    pub const fn key(self) -> &'static str {
        match self {
            Self::DepotEmpty => "DEPOT EMPTY",
            Self::QuotaExhausted => "QUOTA EXHAUSTED",
            Self::WaitingOnDepot => "WAITING ON DEPOT",
        }
    }
}

impl core::fmt::Display for StatusKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// The kind of resource zone the collision layer reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    /// A material source (silo, heap, pickup point).
    Loading,
    /// A fuel source; always available regardless of the quota table.
    Fuel,
    /// A liquid source fed through a pipe; loading semantics, flagged to
    /// the driving controller.
    Pipe,
    /// A destination that accepts material.
    Discharge,
}

impl ZoneKind {
    /// Whether material can be loaded from this zone.
    pub const fn is_source(self) -> bool {
        matches!(self, Self::Loading | Self::Fuel | Self::Pipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_round_trip() {
        for state in LoadingState::ALL {
            assert_eq!(LoadingState::from_name(state.name()), Some(state));
        }
    }

    #[test]
    fn unknown_state_token_is_not_coerced() {
        assert_eq!(LoadingState::from_name("idle"), None);
        assert_eq!(LoadingState::from_name(""), None);
        assert_eq!(LoadingState::from_name("Paused"), None);
    }

    #[test]
    fn only_transfer_states_bind_targets() {
        assert!(LoadingState::Loading.is_transferring());
        assert!(LoadingState::Unloading.is_transferring());
        assert!(!LoadingState::Idle.is_transferring());
        assert!(!LoadingState::ManualOverride.is_transferring());
        assert!(!LoadingState::Stopped.is_transferring());
    }

    #[test]
    fn actionable_decisions() {
        assert!(AdmissionDecision::Admit.is_actionable());
        assert!(AdmissionDecision::StarvationBlocked { zone_empty: true }.is_actionable());
        assert!(AdmissionDecision::StarvationBlocked { zone_empty: false }.is_actionable());
        assert!(!AdmissionDecision::SkipCandidate.is_actionable());
        assert!(!AdmissionDecision::RepetitionBlocked.is_actionable());
        assert!(!AdmissionDecision::AlternationBlocked.is_actionable());
    }

    #[test]
    fn status_keys_match_surface_strings() {
        assert_eq!(StatusKey::DepotEmpty.key(), "DEPOT EMPTY");
        assert_eq!(StatusKey::QuotaExhausted.to_string(), "QUOTA EXHAUSTED");
    }
}
