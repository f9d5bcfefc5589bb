//! Per-tick safety nets for an in-flight transfer.
//!
//! Admission decides whether a transfer may start; these checks end one
//! that should no longer run. They never fail: a target that can no longer
//! be read is reported as stale and the controller drops it.

use loadgate_types::CompartmentSnapshot;
use rust_decimal::Decimal;

/// Outcome of a safety check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// Keep going.
    Continue,
    /// The compartment is at or over its ceiling.
    CeilingReached,
    /// The compartment is effectively empty.
    Emptied,
    /// The bound compartment is gone or reports no capacity.
    Stale,
}

/// Loading check: stop once the fill percentage reaches `ceiling`.
pub fn check_loading(compartment: Option<&CompartmentSnapshot>, ceiling: Decimal) -> SafetyVerdict {
    match compartment {
        None => SafetyVerdict::Stale,
        Some(c) if c.capacity <= Decimal::ZERO => SafetyVerdict::Stale,
        Some(c) if c.fill_percent() >= ceiling => SafetyVerdict::CeilingReached,
        Some(_) => SafetyVerdict::Continue,
    }
}

/// Unloading check: stop once the fill percentage drops below
/// `empty_threshold`, unless a cover is still closing.
pub fn check_unloading(
    compartment: Option<&CompartmentSnapshot>,
    empty_threshold: Decimal,
) -> SafetyVerdict {
    match compartment {
        None => SafetyVerdict::Stale,
        Some(c) if c.capacity <= Decimal::ZERO => SafetyVerdict::Stale,
        Some(c) if c.fill_percent() < empty_threshold && !c.cover_closing => {
            SafetyVerdict::Emptied
        }
        Some(_) => SafetyVerdict::Continue,
    }
}

#[cfg(test)]
mod tests {
    use loadgate_types::MaterialType;
    use rust_decimal_macros::dec;

    use super::*;

    fn compartment(capacity: Decimal, level: Decimal, cover_closing: bool) -> CompartmentSnapshot {
        CompartmentSnapshot {
            index: 0,
            capacity,
            level,
            material: Some(MaterialType::from("WHEAT")),
            supported: vec![MaterialType::from("WHEAT")],
            cover_closing,
        }
    }

    #[test]
    fn loading_stops_at_ceiling() {
        let c = compartment(dec!(1000), dec!(990), false);
        assert_eq!(check_loading(Some(&c), dec!(99)), SafetyVerdict::CeilingReached);
        let c = compartment(dec!(1000), dec!(989.9), false);
        assert_eq!(check_loading(Some(&c), dec!(99)), SafetyVerdict::Continue);
    }

    #[test]
    fn unloading_waits_for_closing_cover() {
        let c = compartment(dec!(1000), dec!(4), true);
        assert_eq!(check_unloading(Some(&c), dec!(0.5)), SafetyVerdict::Continue);
        let c = compartment(dec!(1000), dec!(4), false);
        assert_eq!(check_unloading(Some(&c), dec!(0.5)), SafetyVerdict::Emptied);
        let c = compartment(dec!(1000), dec!(5), false);
        assert_eq!(check_unloading(Some(&c), dec!(0.5)), SafetyVerdict::Continue);
    }

    #[test]
    fn missing_or_capacityless_compartment_is_stale() {
        assert_eq!(check_loading(None, dec!(99)), SafetyVerdict::Stale);
        let c = compartment(Decimal::ZERO, Decimal::ZERO, false);
        assert_eq!(check_unloading(Some(&c), dec!(0.5)), SafetyVerdict::Stale);
    }
}
