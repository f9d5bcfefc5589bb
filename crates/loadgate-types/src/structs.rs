//! Core data structs: materials, quotas, compartments, zone offers.
//!
//! Quantities and percentages use [`Decimal`] so threshold comparisons
//! (`fill >= ceiling`, `level > floor`) are exact.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, QueryId};

/// Default ceiling, in percent, when a quota entry leaves it unset.
pub const DEFAULT_MAX_FILL_PERCENT: Decimal = Decimal::from_parts(99, 0, 0, false, 0);

/// One hundred, as a decimal.
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

/// A material type name as the simulation spells it (e.g. `WHEAT`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialType(String);

impl MaterialType {
    /// Wrap a material name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The material name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MaterialType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl core::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

/// Per-material transfer limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    /// The material this entry governs.
    pub material: MaterialType,
    /// Stop loading once the compartment reaches this fill percentage.
    #[serde(default = "default_max_fill_percent")]
    pub max_fill_percent: Decimal,
    /// Do not start unless this fill percentage is reachable. Zero means
    /// no floor.
    #[serde(default)]
    pub min_fill_percent: Decimal,
    /// Remaining loads allowed for this material; `None` is unlimited.
    #[serde(default)]
    pub repetition_limit: Option<i32>,
}

impl QuotaEntry {
    /// An entry with default ceiling, no floor, and no repetition limit.
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: MaterialType::new(material),
            max_fill_percent: DEFAULT_MAX_FILL_PERCENT,
            min_fill_percent: Decimal::ZERO,
            repetition_limit: None,
        }
    }

    /// Set the ceiling.
    #[must_use]
    pub fn with_max(mut self, percent: Decimal) -> Self {
        self.max_fill_percent = percent;
        self
    }

    /// Set the floor.
    #[must_use]
    pub fn with_min(mut self, percent: Decimal) -> Self {
        self.min_fill_percent = percent;
        self
    }

    /// Set the repetition limit.
    #[must_use]
    pub fn with_repetitions(mut self, limit: i32) -> Self {
        self.repetition_limit = Some(limit);
        self
    }

    /// The effective ceiling; a non-positive value falls back to the
    /// default of 99 %.
    pub fn ceiling(&self) -> Decimal {
        if self.max_fill_percent > Decimal::ZERO {
            self.max_fill_percent
        } else {
            DEFAULT_MAX_FILL_PERCENT
        }
    }

    /// Whether a floor applies.
    pub fn has_floor(&self) -> bool {
        self.min_fill_percent > Decimal::ZERO
    }
}

const fn default_max_fill_percent() -> Decimal {
    DEFAULT_MAX_FILL_PERCENT
}

// ---------------------------------------------------------------------------
// Compartments
// ---------------------------------------------------------------------------

/// Point-in-time view of one fillable compartment on the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentSnapshot {
    /// Index of the compartment on its owning entity.
    pub index: usize,
    /// Total capacity in simulation units.
    pub capacity: Decimal,
    /// Current fill level in simulation units.
    pub level: Decimal,
    /// Material currently held, if any.
    pub material: Option<MaterialType>,
    /// Materials this compartment accepts.
    pub supported: Vec<MaterialType>,
    /// A cover on this compartment is still moving towards closed.
    #[serde(default)]
    pub cover_closing: bool,
}

impl CompartmentSnapshot {
    /// Fill level as a percentage of capacity. A compartment that reports
    /// no capacity counts as full.
    pub fn fill_percent(&self) -> Decimal {
        if self.capacity <= Decimal::ZERO {
            return HUNDRED;
        }
        self.level
            .checked_div(self.capacity)
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .unwrap_or(HUNDRED)
    }

    /// Whether the compartment holds nothing.
    pub fn is_empty(&self) -> bool {
        self.level <= Decimal::ZERO
    }

    /// Whether the compartment accepts the material.
    pub fn supports(&self, material: &MaterialType) -> bool {
        self.supported.iter().any(|m| m == material)
    }

    /// Whether the compartment currently holds the material.
    pub fn holds(&self, material: &MaterialType) -> bool {
        self.material.as_ref() == Some(material)
    }
}

/// One vehicle or implement in the agent's attachment tree, as reported by
/// the host once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    /// The entity.
    pub entity: EntityId,
    /// The entity this one is attached to; `None` for the root vehicle.
    pub parent: Option<EntityId>,
    /// Fillable compartments on this entity.
    pub compartments: Vec<CompartmentSnapshot>,
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// The level a zone reports for one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneLevel {
    /// A finite remaining quantity.
    Remaining(Decimal),
    /// The zone never runs out.
    Unlimited,
    /// The zone does not publish a level.
    Unknown,
}

impl ZoneLevel {
    /// Whether the zone reports itself exhausted for this material.
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Remaining(level) if level <= Decimal::ZERO)
    }
}

/// What a zone offers, queried from the host at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOffer {
    /// The entity that owns the zone and receives transfer commands.
    pub entity: EntityId,
    /// Zone kind.
    pub kind: crate::enums::ZoneKind,
    /// Offered materials and their levels, in the zone's own order.
    pub levels: Vec<(MaterialType, ZoneLevel)>,
    /// The zone exposes per-compartment compatibility and opens covers on
    /// entry.
    #[serde(default)]
    pub opens_covers: bool,
}

impl ZoneOffer {
    /// The level offered for a material, if the zone offers it.
    pub fn level_of(&self, material: &MaterialType) -> Option<ZoneLevel> {
        self.levels
            .iter()
            .find(|(m, _)| m == material)
            .map(|(_, level)| *level)
    }

    /// Number of distinct materials offered.
    pub fn offered_count(&self) -> usize {
        self.levels.len()
    }

    /// Whether any offered material fits the compartment.
    pub fn fits(&self, compartment: &CompartmentSnapshot) -> bool {
        self.levels.iter().any(|(m, _)| compartment.supports(m))
    }
}

// ---------------------------------------------------------------------------
// Raycast
// ---------------------------------------------------------------------------

/// Result of an asynchronous line-of-sight query delivered by the physics
/// layer on a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit {
    /// The query this result answers.
    pub query: QueryId,
    /// The entity hit first, if any.
    pub hit: Option<EntityId>,
    /// World-space hit point.
    pub point: [f32; 3],
    /// Distance from the ray origin.
    pub distance: f32,
    /// Surface normal at the hit point.
    pub normal: [f32; 3],
    /// Index of the collision shape hit.
    pub shape_index: u32,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::enums::ZoneKind;

    fn compartment(capacity: Decimal, level: Decimal) -> CompartmentSnapshot {
        CompartmentSnapshot {
            index: 0,
            capacity,
            level,
            material: None,
            supported: vec![MaterialType::from("WHEAT")],
            cover_closing: false,
        }
    }

    #[test]
    fn fill_percent_is_exact() {
        assert_eq!(compartment(dec!(1000), dec!(900)).fill_percent(), dec!(90));
        assert_eq!(compartment(dec!(1000), dec!(5)).fill_percent(), dec!(0.5));
    }

    #[test]
    fn zero_capacity_counts_as_full() {
        assert_eq!(compartment(Decimal::ZERO, Decimal::ZERO).fill_percent(), HUNDRED);
    }

    #[test]
    fn default_ceiling_is_99() {
        let entry = QuotaEntry::new("WHEAT");
        assert_eq!(entry.ceiling(), dec!(99));
        assert_eq!(entry.with_max(Decimal::ZERO).ceiling(), dec!(99));
    }

    #[test]
    fn quota_entry_yaml_defaults() {
        let entry: Result<QuotaEntry, _> = serde_json::from_str(r#"{"material":"CORN"}"#);
        assert!(entry.is_ok());
        let entry = entry.unwrap_or_else(|_| QuotaEntry::new("X"));
        assert_eq!(entry.max_fill_percent, dec!(99));
        assert!(!entry.has_floor());
        assert_eq!(entry.repetition_limit, None);
    }

    #[test]
    fn exhausted_only_for_non_positive_remaining() {
        assert!(ZoneLevel::Remaining(Decimal::ZERO).is_exhausted());
        assert!(!ZoneLevel::Remaining(dec!(0.01)).is_exhausted());
        assert!(!ZoneLevel::Unlimited.is_exhausted());
        assert!(!ZoneLevel::Unknown.is_exhausted());
    }

    #[test]
    fn offer_lookup() {
        let offer = ZoneOffer {
            entity: EntityId::new(),
            kind: ZoneKind::Loading,
            levels: vec![
                (MaterialType::from("WHEAT"), ZoneLevel::Remaining(dec!(500))),
                (MaterialType::from("CORN"), ZoneLevel::Unlimited),
            ],
            opens_covers: true,
        };
        assert_eq!(offer.offered_count(), 2);
        assert_eq!(
            offer.level_of(&MaterialType::from("CORN")),
            Some(ZoneLevel::Unlimited)
        );
        assert_eq!(offer.level_of(&MaterialType::from("BARLEY")), None);
        assert!(offer.fits(&compartment(dec!(10), Decimal::ZERO)));
    }
}
