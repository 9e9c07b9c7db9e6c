//! Composition ledger: which catalog items a kit is built from.
//!
//! Each entry also stands for a reservation: while the kit has target stock
//! `T`, the entry holds `quantity_per_kit * T` units of its item out of free
//! stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::CatalogItemId;
use storefront_core::{DomainError, DomainResult, Entity, aggregate_id_newtype};

use crate::kit::KitId;

aggregate_id_newtype!(
    /// Composition entry identifier.
    EntryId,
    "EntryId"
);

/// One line of a kit's bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionEntry {
    pub id: EntryId,
    pub kit_id: KitId,
    pub catalog_item_id: CatalogItemId,
    pub quantity_per_kit: i64,
    pub created_at: DateTime<Utc>,
}

impl CompositionEntry {
    /// Units this entry holds while the kit has `target_stock` kits offered.
    pub fn reserved_units(&self, target_stock: i64) -> DomainResult<i64> {
        reserved_units(self.quantity_per_kit, target_stock)
    }
}

impl Entity for CompositionEntry {
    const KIND: &'static str = "composition entry";
    type Id = EntryId;

    fn id(&self) -> EntryId {
        self.id
    }
}

pub fn validate_quantity_per_kit(quantity_per_kit: i64) -> DomainResult<()> {
    if quantity_per_kit < 1 {
        return Err(DomainError::validation(format!(
            "quantity per kit must be at least 1, got {quantity_per_kit}"
        )));
    }
    Ok(())
}

/// `quantity_per_kit * kits`, rejecting overflow.
pub fn reserved_units(quantity_per_kit: i64, kits: i64) -> DomainResult<i64> {
    quantity_per_kit
        .checked_mul(kits)
        .ok_or_else(|| DomainError::validation("reservation size overflows"))
}

/// An item may appear at most once per kit.
pub fn ensure_not_duplicate(entries: &[CompositionEntry], catalog_item_id: CatalogItemId) -> DomainResult<()> {
    if entries.iter().any(|e| e.catalog_item_id == catalog_item_id) {
        return Err(DomainError::validation(format!(
            "item {catalog_item_id} is already a component of this kit"
        )));
    }
    Ok(())
}

/// One stock movement of a multi-item reservation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationStep {
    pub catalog_item_id: CatalogItemId,
    /// Units to take out of free stock (negative gives them back).
    pub units: i64,
}

/// Per-item movements for changing a kit's target stock by `kit_delta`.
///
/// Steps are ordered by item id so concurrent changes touching overlapping
/// items always lock rows in the same order.
pub fn reservation_plan(entries: &[CompositionEntry], kit_delta: i64) -> DomainResult<Vec<ReservationStep>> {
    let mut steps = entries
        .iter()
        .map(|e| {
            Ok(ReservationStep {
                catalog_item_id: e.catalog_item_id,
                units: reserved_units(e.quantity_per_kit, kit_delta)?,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;
    steps.sort_by_key(|s| s.catalog_item_id);
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kit_id: KitId, item: CatalogItemId, qpk: i64) -> CompositionEntry {
        CompositionEntry {
            id: EntryId::generate(),
            kit_id,
            catalog_item_id: item,
            quantity_per_kit: qpk,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn quantity_per_kit_must_be_positive() {
        assert!(validate_quantity_per_kit(0).is_err());
        assert!(validate_quantity_per_kit(-2).is_err());
        assert!(validate_quantity_per_kit(1).is_ok());
    }

    #[test]
    fn reserved_units_checks_overflow() {
        assert_eq!(reserved_units(3, 4).unwrap(), 12);
        assert_eq!(reserved_units(3, -4).unwrap(), -12);
        assert!(reserved_units(i64::MAX, 2).is_err());
    }

    #[test]
    fn duplicates_are_rejected() {
        let kit = KitId::generate();
        let item = CatalogItemId::generate();
        let entries = vec![entry(kit, item, 2)];
        assert!(ensure_not_duplicate(&entries, item).is_err());
        assert!(ensure_not_duplicate(&entries, CatalogItemId::generate()).is_ok());
    }

    #[test]
    fn plan_scales_every_entry_and_sorts_by_item() {
        let kit = KitId::generate();
        let a = CatalogItemId::generate();
        let b = CatalogItemId::generate();
        let entries = vec![entry(kit, b, 1), entry(kit, a, 3)];

        let plan = reservation_plan(&entries, -2).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan[0].catalog_item_id < plan[1].catalog_item_id);
        let units_for = |item| plan.iter().find(|s| s.catalog_item_id == item).map(|s| s.units);
        assert_eq!(units_for(a), Some(-6));
        assert_eq!(units_for(b), Some(-2));
    }
}
