//! Surplus capacity: how many more kits the current free stock could back.
//!
//! Committed stock is already out of `stock_quantity`, so capacity looks at
//! free stock only. The kit's surplus is the minimum over its components of
//! `floor(free_stock / quantity_per_kit)`.

use serde::{Deserialize, Serialize};

use storefront_catalog::{CatalogItem, CatalogItemId};
use storefront_core::{DomainError, DomainResult, Money};

use crate::composition::{CompositionEntry, EntryId};
use crate::kit::{Kit, KitId};

/// A composition entry joined with its catalog item.
#[derive(Debug, Clone, Copy)]
pub struct CapacityLine<'a> {
    pub entry: &'a CompositionEntry,
    pub item: &'a CatalogItem,
}

/// Per-entry capacity and price figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCapacity {
    pub entry_id: EntryId,
    pub catalog_item_id: CatalogItemId,
    pub item_name: String,
    pub quantity_per_kit: i64,
    pub free_stock: i64,
    /// Additional kits this entry alone could back.
    pub capacity: i64,
    pub unit_price: Money,
    pub unit_alt_price: Money,
    /// Price of this entry within one kit.
    pub line_price: Money,
    pub line_alt_price: Money,
    /// Value of the units held for the current target stock.
    pub committed_value: Money,
    pub committed_alt_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub kit_id: KitId,
    pub target_stock_quantity: i64,
    /// Additional kits the free stock can back; 0 for a kit without components.
    pub kit_surplus_capacity: i64,
    pub max_possible_stock: i64,
    /// Component with the least capacity (first in entry order on ties).
    pub limiting_item: Option<CatalogItemId>,
    pub entries: Vec<EntryCapacity>,
    /// Undiscounted price of one kit.
    pub total_base_price: Money,
    pub total_base_alt_price: Money,
    pub total_committed_value: Money,
    pub total_committed_alt_value: Money,
}

/// `floor(free_stock / quantity_per_kit)`; negative stock counts as none.
pub fn per_item_capacity(free_stock: i64, quantity_per_kit: i64) -> i64 {
    if quantity_per_kit < 1 {
        return 0;
    }
    free_stock.max(0) / quantity_per_kit
}

pub fn compute_capacity(kit: &Kit, lines: &[CapacityLine<'_>]) -> DomainResult<CapacityReport> {
    let mut entries = Vec::with_capacity(lines.len());
    let mut surplus: Option<(i64, CatalogItemId)> = None;
    let mut total_base_price = Money::ZERO;
    let mut total_base_alt_price = Money::ZERO;
    let mut total_committed_value = Money::ZERO;
    let mut total_committed_alt_value = Money::ZERO;

    for CapacityLine { entry, item } in lines {
        if entry.kit_id != kit.id || entry.catalog_item_id != item.id {
            return Err(DomainError::invariant(format!(
                "entry {} does not belong to kit {} and item {}",
                entry.id, kit.id, item.id
            )));
        }

        let capacity = per_item_capacity(item.stock_quantity, entry.quantity_per_kit);
        if surplus.is_none_or(|(min, _)| capacity < min) {
            surplus = Some((capacity, item.id));
        }

        let unit_price = item.price;
        let unit_alt_price = item.effective_alt_price();
        let line_price = unit_price.times(entry.quantity_per_kit)?;
        let line_alt_price = unit_alt_price.times(entry.quantity_per_kit)?;
        let committed_value = line_price.times(kit.target_stock_quantity)?;
        let committed_alt_value = line_alt_price.times(kit.target_stock_quantity)?;

        total_base_price = total_base_price.checked_add(line_price)?;
        total_base_alt_price = total_base_alt_price.checked_add(line_alt_price)?;
        total_committed_value = total_committed_value.checked_add(committed_value)?;
        total_committed_alt_value = total_committed_alt_value.checked_add(committed_alt_value)?;

        entries.push(EntryCapacity {
            entry_id: entry.id,
            catalog_item_id: item.id,
            item_name: item.name.clone(),
            quantity_per_kit: entry.quantity_per_kit,
            free_stock: item.stock_quantity,
            capacity,
            unit_price,
            unit_alt_price,
            line_price,
            line_alt_price,
            committed_value,
            committed_alt_value,
        });
    }

    let kit_surplus_capacity = surplus.map(|(min, _)| min).unwrap_or(0);
    Ok(CapacityReport {
        kit_id: kit.id,
        target_stock_quantity: kit.target_stock_quantity,
        kit_surplus_capacity,
        max_possible_stock: kit.target_stock_quantity.saturating_add(kit_surplus_capacity),
        limiting_item: surplus.map(|(_, item)| item),
        entries,
        total_base_price,
        total_base_alt_price,
        total_committed_value,
        total_committed_alt_value,
    })
}
