//! Admission decision engine.
//!
//! For one compartment and one candidate material, decide whether a
//! transfer may start or continue. The checks run in a fixed order and
//! short-circuit on the first that does not pass:
//!
//! 1. **Capacity** -- the compartment's fill percentage must be strictly
//!    below the entry's ceiling.
//! 2. **Repetition** -- an active repetition limit must still be positive.
//! 3. **Alternation** -- when alternation is required and the depot offers
//!    more than one material, a switch away from the previous selection is
//!    blocked while the history is shorter than the configured limit.
//! 4. **Zone has material** (positive, unlimited, or unknown level) -- admit
//!    unless a floor is configured and the zone cannot cover it.
//! 5. **Zone exhausted** -- decide between "already satisfied", "wait for
//!    replenishment", and "try the next material".
//!
//! The engine is a pure function of its inputs plus the caller-owned
//! [`SelectionHistory`].

use loadgate_types::{
    AdmissionDecision, CompartmentSnapshot, HUNDRED, MaterialType, QuotaEntry, ZoneLevel,
};
use rust_decimal::Decimal;

use crate::history::SelectionHistory;

/// Policy knobs for the alternation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlternationPolicy {
    /// Whether alternation is enforced at all.
    pub required: bool,
    /// History length below which a switch is blocked.
    pub limit: usize,
}

impl AlternationPolicy {
    /// No alternation enforcement (fuel, single-material depots).
    pub const OFF: Self = Self {
        required: false,
        limit: 0,
    };
}

/// Everything about the agent side of one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext<'a> {
    /// The compartment being filled.
    pub compartment: &'a CompartmentSnapshot,
    /// How many materials the depot offers.
    pub offered_count: usize,
    /// Recently started materials.
    pub history: &'a SelectionHistory,
    /// Alternation settings.
    pub alternation: AlternationPolicy,
}

/// One material offered by the zone together with its quota.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// The quota entry (its `material` is the candidate).
    pub quota: &'a QuotaEntry,
    /// What the zone reports for this material.
    pub zone_level: ZoneLevel,
}

impl Candidate<'_> {
    /// The candidate material.
    pub const fn material(&self) -> &MaterialType {
        &self.quota.material
    }
}

/// Evaluate a single candidate.
pub fn evaluate(ctx: &AdmissionContext<'_>, candidate: &Candidate<'_>) -> AdmissionDecision {
    let compartment = ctx.compartment;
    let quota = candidate.quota;
    let fill = compartment.fill_percent();

    // Step 1: capacity, independent of everything else
    if fill >= quota.ceiling() {
        return AdmissionDecision::CapacityExceeded;
    }

    // Step 2: repetition counter
    if quota.repetition_limit.is_some_and(|n| n <= 0) {
        return AdmissionDecision::RepetitionBlocked;
    }

    // Step 3: alternation
    if alternation_blocked(ctx, candidate.material()) {
        return AdmissionDecision::AlternationBlocked;
    }

    // Step 4: zone still has material (or does not say)
    let level = match candidate.zone_level {
        ZoneLevel::Unlimited | ZoneLevel::Unknown => return AdmissionDecision::Admit,
        ZoneLevel::Remaining(level) => level,
    };
    if level > Decimal::ZERO {
        if !quota.has_floor() || level > floor_shortfall(compartment, quota) {
            return AdmissionDecision::Admit;
        }
        return AdmissionDecision::StarvationBlocked { zone_empty: false };
    }

    // Step 5: zone exhausted
    if compartment.is_empty() {
        return AdmissionDecision::SkipCandidate;
    }
    if fill >= quota.min_fill_percent {
        if compartment.holds(candidate.material()) {
            AdmissionDecision::TargetSatisfied
        } else {
            AdmissionDecision::SkipCandidate
        }
    } else {
        AdmissionDecision::StarvationBlocked { zone_empty: true }
    }
}

/// Quantity still needed to lift the compartment to the entry's floor.
/// Negative when the floor is already met. An overflow saturates to
/// `Decimal::MAX` so no zone level can cover it.
pub fn floor_shortfall(compartment: &CompartmentSnapshot, quota: &QuotaEntry) -> Decimal {
    quota
        .min_fill_percent
        .checked_div(HUNDRED)
        .and_then(|share| share.checked_mul(compartment.capacity))
        .and_then(|needed| needed.checked_sub(compartment.level))
        .unwrap_or(Decimal::MAX)
}

fn alternation_blocked(ctx: &AdmissionContext<'_>, material: &MaterialType) -> bool {
    ctx.alternation.required
        && ctx.offered_count > 1
        && ctx.history.last().is_some_and(|prev| prev != material)
        && ctx.history.len() < ctx.alternation.limit
}

/// The decision reached for one candidate during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    /// The candidate material.
    pub material: MaterialType,
    /// The decision.
    pub decision: AdmissionDecision,
}

/// Result of evaluating candidates in priority order.
///
/// The pass stops at the first actionable decision, so lower-priority
/// candidates after it are never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionPass {
    outcomes: Vec<CandidateOutcome>,
}

impl AdmissionPass {
    /// Run the engine over `candidates` in the given order.
    pub fn run<'a>(
        ctx: &AdmissionContext<'_>,
        candidates: impl IntoIterator<Item = Candidate<'a>>,
    ) -> Self {
        let mut outcomes = Vec::new();
        for candidate in candidates {
            let decision = evaluate(ctx, &candidate);
            outcomes.push(CandidateOutcome {
                material: candidate.material().clone(),
                decision,
            });
            if decision.is_actionable() {
                break;
            }
        }
        Self { outcomes }
    }

    /// Every evaluated candidate, in evaluation order.
    pub fn outcomes(&self) -> &[CandidateOutcome] {
        &self.outcomes
    }

    /// Whether no candidate was evaluated.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The decision that governs the whole pass: the first actionable one,
    /// otherwise the last evaluated.
    pub fn dominant(&self) -> Option<&CandidateOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.decision.is_actionable())
            .or_else(|| self.outcomes.last())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn compartment(capacity: Decimal, level: Decimal, material: Option<&str>) -> CompartmentSnapshot {
        CompartmentSnapshot {
            index: 0,
            capacity,
            level,
            material: material.map(MaterialType::from),
            supported: vec![MaterialType::from("WHEAT"), MaterialType::from("CORN")],
            cover_closing: false,
        }
    }

    fn ctx<'a>(c: &'a CompartmentSnapshot, history: &'a SelectionHistory) -> AdmissionContext<'a> {
        AdmissionContext {
            compartment: c,
            offered_count: 1,
            history,
            alternation: AlternationPolicy::OFF,
        }
    }

    fn decide(c: &CompartmentSnapshot, quota: &QuotaEntry, level: ZoneLevel) -> AdmissionDecision {
        let history = SelectionHistory::new(4);
        evaluate(
            &ctx(c, &history),
            &Candidate {
                quota,
                zone_level: level,
            },
        )
    }

    #[test]
    fn capacity_boundary_is_strict() {
        let quota = QuotaEntry::new("WHEAT").with_max(dec!(90));
        let full = compartment(dec!(1000), dec!(900), Some("WHEAT"));
        assert_eq!(
            decide(&full, &quota, ZoneLevel::Unlimited),
            AdmissionDecision::CapacityExceeded
        );
        let almost = compartment(dec!(1000), dec!(899.99), Some("WHEAT"));
        assert_eq!(decide(&almost, &quota, ZoneLevel::Unlimited), AdmissionDecision::Admit);
    }

    #[test]
    fn capacity_checked_before_repetition() {
        let quota = QuotaEntry::new("WHEAT").with_max(dec!(50)).with_repetitions(0);
        let c = compartment(dec!(100), dec!(60), Some("WHEAT"));
        assert_eq!(
            decide(&c, &quota, ZoneLevel::Unlimited),
            AdmissionDecision::CapacityExceeded
        );
    }

    #[test]
    fn zero_or_negative_repetition_blocks() {
        let c = compartment(dec!(100), Decimal::ZERO, None);
        for limit in [0, -1] {
            let quota = QuotaEntry::new("WHEAT").with_repetitions(limit);
            assert_eq!(
                decide(&c, &quota, ZoneLevel::Unlimited),
                AdmissionDecision::RepetitionBlocked
            );
        }
        let quota = QuotaEntry::new("WHEAT").with_repetitions(1);
        assert_eq!(decide(&c, &quota, ZoneLevel::Unlimited), AdmissionDecision::Admit);
    }

    #[test]
    fn starvation_floor_uses_strict_greater() {
        let quota = QuotaEntry::new("WHEAT").with_min(dec!(20));
        let c = compartment(dec!(1000), dec!(100), Some("WHEAT"));
        assert_eq!(floor_shortfall(&c, &quota), dec!(100));
        assert_eq!(
            decide(&c, &quota, ZoneLevel::Remaining(dec!(100))),
            AdmissionDecision::StarvationBlocked { zone_empty: false }
        );
        assert_eq!(
            decide(&c, &quota, ZoneLevel::Remaining(dec!(100.01))),
            AdmissionDecision::Admit
        );
    }

    #[test]
    fn no_floor_admits_any_positive_level() {
        let quota = QuotaEntry::new("WHEAT");
        let c = compartment(dec!(1000), Decimal::ZERO, None);
        assert_eq!(
            decide(&c, &quota, ZoneLevel::Remaining(dec!(0.001))),
            AdmissionDecision::Admit
        );
    }

    #[test]
    fn unknown_and_unlimited_levels_admit_even_with_floor() {
        let quota = QuotaEntry::new("WHEAT").with_min(dec!(80));
        let c = compartment(dec!(1000), Decimal::ZERO, None);
        assert_eq!(decide(&c, &quota, ZoneLevel::Unknown), AdmissionDecision::Admit);
        assert_eq!(decide(&c, &quota, ZoneLevel::Unlimited), AdmissionDecision::Admit);
    }

    #[test]
    fn exhausted_zone_branches() {
        let quota = QuotaEntry::new("WHEAT").with_min(dec!(20));
        let empty = ZoneLevel::Remaining(Decimal::ZERO);

        let satisfied = compartment(dec!(1000), dec!(300), Some("WHEAT"));
        assert_eq!(decide(&satisfied, &quota, empty), AdmissionDecision::TargetSatisfied);

        let other = compartment(dec!(1000), dec!(300), Some("CORN"));
        assert_eq!(decide(&other, &quota, empty), AdmissionDecision::SkipCandidate);

        let partial = compartment(dec!(1000), dec!(100), Some("WHEAT"));
        assert_eq!(
            decide(&partial, &quota, empty),
            AdmissionDecision::StarvationBlocked { zone_empty: true }
        );

        let bare = compartment(dec!(1000), Decimal::ZERO, None);
        assert_eq!(decide(&bare, &quota, empty), AdmissionDecision::SkipCandidate);
    }

    #[test]
    fn alternation_blocks_switch_while_history_is_short() {
        let c = compartment(dec!(1000), Decimal::ZERO, None);
        let mut history = SelectionHistory::new(4);
        history.record(MaterialType::from("WHEAT"));
        let corn = QuotaEntry::new("CORN");
        let wheat = QuotaEntry::new("WHEAT");
        let context = AdmissionContext {
            compartment: &c,
            offered_count: 2,
            history: &history,
            alternation: AlternationPolicy {
                required: true,
                limit: 2,
            },
        };
        let level = ZoneLevel::Remaining(dec!(500));
        assert_eq!(
            evaluate(&context, &Candidate { quota: &corn, zone_level: level }),
            AdmissionDecision::AlternationBlocked
        );
        assert_eq!(
            evaluate(&context, &Candidate { quota: &wheat, zone_level: level }),
            AdmissionDecision::Admit
        );

        // A single-material depot never blocks.
        let single = AdmissionContext {
            offered_count: 1,
            ..context
        };
        assert_eq!(
            evaluate(&single, &Candidate { quota: &corn, zone_level: level }),
            AdmissionDecision::Admit
        );
    }

    #[test]
    fn alternation_released_once_history_reaches_limit() {
        let c = compartment(dec!(1000), Decimal::ZERO, None);
        let mut history = SelectionHistory::new(4);
        history.record(MaterialType::from("WHEAT"));
        history.record(MaterialType::from("WHEAT"));
        let corn = QuotaEntry::new("CORN");
        let context = AdmissionContext {
            compartment: &c,
            offered_count: 2,
            history: &history,
            alternation: AlternationPolicy {
                required: true,
                limit: 2,
            },
        };
        assert_eq!(
            evaluate(
                &context,
                &Candidate {
                    quota: &corn,
                    zone_level: ZoneLevel::Unlimited
                }
            ),
            AdmissionDecision::Admit
        );
    }

    #[test]
    fn pass_stops_at_first_admit() {
        let c = compartment(dec!(1000), Decimal::ZERO, None);
        let history = SelectionHistory::new(4);
        let wheat = QuotaEntry::new("WHEAT").with_max(dec!(90));
        let corn = QuotaEntry::new("CORN").with_max(dec!(90)).with_min(dec!(20));
        let full = ZoneLevel::Remaining(dec!(10000));
        let pass = AdmissionPass::run(
            &AdmissionContext {
                offered_count: 2,
                ..ctx(&c, &history)
            },
            [
                Candidate { quota: &wheat, zone_level: full },
                Candidate { quota: &corn, zone_level: full },
            ],
        );
        assert_eq!(pass.outcomes().len(), 1);
        let dominant = pass.dominant();
        assert_eq!(dominant.map(|o| o.material.as_str()), Some("WHEAT"));
        assert_eq!(dominant.map(|o| o.decision), Some(AdmissionDecision::Admit));
    }

    #[test]
    fn pass_dominant_falls_back_to_last() {
        let c = compartment(dec!(1000), Decimal::ZERO, None);
        let history = SelectionHistory::new(4);
        let wheat = QuotaEntry::new("WHEAT");
        let corn = QuotaEntry::new("CORN").with_repetitions(0);
        let empty = ZoneLevel::Remaining(Decimal::ZERO);
        let pass = AdmissionPass::run(
            &ctx(&c, &history),
            [
                Candidate { quota: &wheat, zone_level: empty },
                Candidate { quota: &corn, zone_level: ZoneLevel::Unlimited },
            ],
        );
        assert_eq!(pass.outcomes().len(), 2);
        assert_eq!(
            pass.dominant().map(|o| o.decision),
            Some(AdmissionDecision::RepetitionBlocked)
        );
    }
}
