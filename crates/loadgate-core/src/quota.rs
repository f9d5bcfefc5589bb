//! The quota table: an ordered list of per-material transfer limits.
//!
//! Entry order is evaluation priority. The table never re-orders itself;
//! the only runtime mutation is the per-entry repetition counter, which is
//! decremented each time a load of that material completes.

use loadgate_types::{HUNDRED, MaterialType, QuotaEntry};
use rust_decimal::Decimal;
use tracing::debug;

/// Errors raised when building a quota table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    /// The same material appears twice.
    #[error("duplicate quota entry for material {material}")]
    DuplicateMaterial {
        /// The repeated material.
        material: MaterialType,
    },

    /// A percentage lies outside `0..=100`.
    #[error("quota percent out of range for {material}: {value}")]
    PercentOutOfRange {
        /// The material whose entry is invalid.
        material: MaterialType,
        /// The offending value.
        value: Decimal,
    },
}

/// Ordered per-material quota table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaTable {
    entries: Vec<QuotaEntry>,
}

impl QuotaTable {
    /// Build a table, validating uniqueness and percent ranges.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::DuplicateMaterial`] if a material repeats, or
    /// [`QuotaError::PercentOutOfRange`] if a ceiling or floor is outside
    /// `0..=100`.
    pub fn new(entries: Vec<QuotaEntry>) -> Result<Self, QuotaError> {
        for (i, entry) in entries.iter().enumerate() {
            for pct in [entry.max_fill_percent, entry.min_fill_percent] {
                if pct < Decimal::ZERO || pct > HUNDRED {
                    return Err(QuotaError::PercentOutOfRange {
                        material: entry.material.clone(),
                        value: pct,
                    });
                }
            }
            if entries
                .iter()
                .take(i)
                .any(|earlier| earlier.material == entry.material)
            {
                return Err(QuotaError::DuplicateMaterial {
                    material: entry.material.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// A table with no entries. Material transfers never admit against it.
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries in priority order.
    pub fn entries(&self) -> &[QuotaEntry] {
        &self.entries
    }

    /// Whether no material is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of configured materials.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The entry for a material, if configured.
    pub fn lookup(&self, material: &MaterialType) -> Option<&QuotaEntry> {
        self.entries.iter().find(|e| &e.material == material)
    }

    /// Record a completed load: decrement the material's repetition counter
    /// if it has one. Returns the remaining count.
    pub fn complete_load(&mut self, material: &MaterialType) -> Option<i32> {
        let entry = self.entries.iter_mut().find(|e| &e.material == material)?;
        let remaining = entry.repetition_limit?;
        let next = remaining.saturating_sub(1).max(0);
        entry.repetition_limit = Some(next);
        debug!(material = %material, remaining = next, "Repetition counter decremented");
        Some(next)
    }
}

/// The built-in quota applied to fuel: default-or-configured ceiling, no
/// floor, no repetition limit.
pub fn fuel_quota(material: &MaterialType, ceiling: Decimal) -> QuotaEntry {
    QuotaEntry {
        material: material.clone(),
        max_fill_percent: ceiling,
        min_fill_percent: Decimal::ZERO,
        repetition_limit: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn preserves_priority_order() {
        let table = QuotaTable::new(vec![QuotaEntry::new("WHEAT"), QuotaEntry::new("CORN")]).unwrap();
        let order: Vec<&str> = table.entries().iter().map(|e| e.material.as_str()).collect();
        assert_eq!(order, ["WHEAT", "CORN"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rejects_duplicates() {
        let result = QuotaTable::new(vec![QuotaEntry::new("WHEAT"), QuotaEntry::new("WHEAT")]);
        assert_eq!(
            result,
            Err(QuotaError::DuplicateMaterial {
                material: MaterialType::from("WHEAT")
            })
        );
    }

    #[test]
    fn rejects_out_of_range_percent() {
        let result = QuotaTable::new(vec![QuotaEntry::new("WHEAT").with_min(dec!(120))]);
        assert!(matches!(result, Err(QuotaError::PercentOutOfRange { .. })));
    }

    #[test]
    fn lookup_by_material() {
        let table = QuotaTable::new(vec![QuotaEntry::new("WHEAT").with_max(dec!(90))]).unwrap();
        assert_eq!(
            table.lookup(&MaterialType::from("WHEAT")).map(|e| e.max_fill_percent),
            Some(dec!(90))
        );
        assert!(table.lookup(&MaterialType::from("CORN")).is_none());
    }

    #[test]
    fn complete_load_counts_down_to_zero() {
        let mut table = QuotaTable::new(vec![QuotaEntry::new("WHEAT").with_repetitions(1)]).unwrap();
        let wheat = MaterialType::from("WHEAT");
        assert_eq!(table.complete_load(&wheat), Some(0));
        assert_eq!(table.complete_load(&wheat), Some(0));
    }

    #[test]
    fn unlimited_entries_are_not_counted() {
        let mut table = QuotaTable::new(vec![QuotaEntry::new("WHEAT")]).unwrap();
        assert_eq!(table.complete_load(&MaterialType::from("WHEAT")), None);
        assert_eq!(table.complete_load(&MaterialType::from("CORN")), None);
    }

    #[test]
    fn fuel_quota_has_no_floor() {
        let entry = fuel_quota(&MaterialType::from("DIESEL"), dec!(95));
        assert!(!entry.has_floor());
        assert_eq!(entry.ceiling(), dec!(95));
        assert_eq!(entry.repetition_limit, None);
    }
}
