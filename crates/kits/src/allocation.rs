//! Units of each catalog item committed to kits.
//!
//! `allocate` reports what offered (active, positive target) kits hold, which
//! is what operators see next to an item's free stock. `reserved_units_by_item`
//! counts every kit regardless of its flag, matching what was actually taken
//! out of free stock.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use storefront_catalog::CatalogItemId;
use storefront_core::{DomainError, DomainResult};

use crate::composition::CompositionEntry;
use crate::kit::{Kit, KitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitAllocation {
    pub kit_id: KitId,
    pub kit_name: String,
    pub quantity_per_kit: i64,
    pub target_stock_quantity: i64,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub catalog_item_id: CatalogItemId,
    pub allocated_in_kits: i64,
    pub kits: Vec<KitAllocation>,
}

impl ItemAllocation {
    pub fn empty(catalog_item_id: CatalogItemId) -> Self {
        Self {
            catalog_item_id,
            allocated_in_kits: 0,
            kits: Vec::new(),
        }
    }
}

fn add_units(total: i64, units: i64) -> DomainResult<i64> {
    total
        .checked_add(units)
        .ok_or_else(|| DomainError::validation("allocated units overflow"))
}

/// Allocation of offered kits, keyed by item. Items no offered kit uses are
/// absent.
pub fn allocate(kits: &[Kit], entries: &[CompositionEntry]) -> DomainResult<BTreeMap<CatalogItemId, ItemAllocation>> {
    let offered: HashMap<KitId, &Kit> = kits.iter().filter(|k| k.is_offered()).map(|k| (k.id, k)).collect();
    let mut out: BTreeMap<CatalogItemId, ItemAllocation> = BTreeMap::new();

    for entry in entries {
        let Some(kit) = offered.get(&entry.kit_id) else {
            continue;
        };
        let units = entry.reserved_units(kit.target_stock_quantity)?;
        let slot = out
            .entry(entry.catalog_item_id)
            .or_insert_with(|| ItemAllocation::empty(entry.catalog_item_id));
        slot.allocated_in_kits = add_units(slot.allocated_in_kits, units)?;
        slot.kits.push(KitAllocation {
            kit_id: kit.id,
            kit_name: kit.name.clone(),
            quantity_per_kit: entry.quantity_per_kit,
            target_stock_quantity: kit.target_stock_quantity,
            units,
        });
    }

    Ok(out)
}

/// Units held per item across all kits, active or not.
pub fn reserved_units_by_item(
    kits: &[Kit],
    entries: &[CompositionEntry],
) -> DomainResult<BTreeMap<CatalogItemId, i64>> {
    let targets: HashMap<KitId, i64> = kits.iter().map(|k| (k.id, k.target_stock_quantity)).collect();
    let mut out = BTreeMap::new();

    for entry in entries {
        let target = targets.get(&entry.kit_id).copied().unwrap_or(0);
        let units = entry.reserved_units(target)?;
        let total = out.entry(entry.catalog_item_id).or_insert(0);
        *total = add_units(*total, units)?;
    }

    Ok(out)
}
