//! Mapping an admission pass onto a controller action.
//!
//! The first actionable outcome wins:
//!
//! | Decision            | Action                                     |
//! |---------------------|--------------------------------------------|
//! | `Admit`             | start (or keep) the transfer               |
//! | `CapacityExceeded`  | stop, clear target, idle, no status        |
//! | `StarvationBlocked` | hold at the depot, "WAITING ON DEPOT"      |
//! | `TargetSatisfied`   | stop, clear target, idle, no status        |
//!
//! Without an actionable outcome only the last evaluated candidate counts:
//! `RepetitionBlocked` holds with "QUOTA EXHAUSTED"; `SkipCandidate` and
//! `AlternationBlocked` hold with "DEPOT EMPTY".

use loadgate_types::{AdmissionDecision, MaterialType, StatusKey};

use crate::admission::AdmissionPass;

/// Why a transfer is being ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The compartment reached its ceiling.
    CapacityReached,
    /// The compartment already holds enough and the depot is empty.
    TargetSatisfied,
}

/// What the controller should do after a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    /// Start (or continue) transferring this material.
    Start {
        /// The admitted material.
        material: MaterialType,
    },
    /// End the transfer for this material and return to idle.
    Stop {
        /// The material whose transfer ends.
        material: MaterialType,
        /// Why.
        reason: StopReason,
    },
    /// Stay bound to the depot and wait for it to refill.
    WaitHere {
        /// The material being waited for.
        material: MaterialType,
        /// Status to surface.
        status: StatusKey,
    },
    /// Hold pending without binding a target.
    Hold {
        /// Status to surface.
        status: StatusKey,
    },
    /// Nothing was evaluated.
    Nothing,
}

/// Resolve a pass into an action.
pub fn resolve(pass: &AdmissionPass) -> SelectionAction {
    let decisive = pass.outcomes().iter().find_map(|outcome| {
        let material = outcome.material.clone();
        match outcome.decision {
            AdmissionDecision::Admit => Some(SelectionAction::Start { material }),
            AdmissionDecision::CapacityExceeded => Some(SelectionAction::Stop {
                material,
                reason: StopReason::CapacityReached,
            }),
            AdmissionDecision::TargetSatisfied => Some(SelectionAction::Stop {
                material,
                reason: StopReason::TargetSatisfied,
            }),
            AdmissionDecision::StarvationBlocked { .. } => Some(SelectionAction::WaitHere {
                material,
                status: StatusKey::WaitingOnDepot,
            }),
            AdmissionDecision::RepetitionBlocked
            | AdmissionDecision::AlternationBlocked
            | AdmissionDecision::SkipCandidate => None,
        }
    });
    if let Some(action) = decisive {
        return action;
    }

    match pass.outcomes().last().map(|o| o.decision) {
        Some(AdmissionDecision::RepetitionBlocked) => SelectionAction::Hold {
            status: StatusKey::QuotaExhausted,
        },
        Some(_) => SelectionAction::Hold {
            status: StatusKey::DepotEmpty,
        },
        None => SelectionAction::Nothing,
    }
}
