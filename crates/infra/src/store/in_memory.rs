use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use storefront_catalog::{CatalogItem, CatalogItemId};
use storefront_core::{Entity, Money};
use storefront_kits::{
    CompositionEntry, DiscountPercent, EntryId, Kit, KitId, KitSettings, PriceComponent, ReservationStep,
    reservation_plan, reserved_units, synthesize,
};

use super::{AddedComponent, DeletedKit, KitStore, RemovedEntry, StockLevelChange, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<CatalogItemId, CatalogItem>,
    kits: BTreeMap<KitId, Kit>,
    entries: BTreeMap<EntryId, CompositionEntry>,
}

fn insert_row<E: Entity>(table: &mut BTreeMap<E::Id, E>, row: E) {
    table.insert(row.id(), row);
}

impl State {
    fn kit_entries(&self, kit_id: KitId) -> Vec<CompositionEntry> {
        self.entries.values().filter(|e| e.kit_id == kit_id).cloned().collect()
    }

    fn item_mut(&mut self, id: CatalogItemId) -> StoreResult<&mut CatalogItem> {
        self.items.get_mut(&id).ok_or(StoreError::NotFound(CatalogItem::KIND))
    }

    /// Free stock of every item a plan touches. Fails before anything is
    /// mutated when one is short (outgoing steps only) or missing.
    fn check_plan(&self, steps: &[ReservationStep]) -> StoreResult<Option<(CatalogItemId, i64, i64)>> {
        for step in steps {
            let item = self
                .items
                .get(&step.catalog_item_id)
                .ok_or_else(|| StoreError::Backend(format!("entry references missing item {}", step.catalog_item_id)))?;
            if item.stock_after(-step.units).is_none() {
                return Ok(Some((item.id, step.units, item.stock_quantity)));
            }
        }
        Ok(None)
    }

    /// Apply checked steps: positive units leave free stock, negative ones
    /// come back.
    fn apply_plan(&mut self, steps: &[ReservationStep]) -> StoreResult<()> {
        let now = Utc::now();
        for step in steps {
            let item = self.item_mut(step.catalog_item_id)?;
            item.stock_quantity = item
                .stock_after(-step.units)
                .ok_or_else(|| StoreError::Backend(format!("stock of item {} out of range", item.id)))?;
            item.updated_at = now;
        }
        Ok(())
    }
}

/// In-memory store for tests/dev.
///
/// A single lock serializes every transactional operation; each one checks
/// all of its preconditions before touching any row, so a failure leaves the
/// state exactly as it was.
#[derive(Debug, Default)]
pub struct InMemoryKitStore {
    state: RwLock<State>,
}

impl InMemoryKitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl KitStore for InMemoryKitStore {
    async fn create_item(&self, item: CatalogItem) -> StoreResult<CatalogItem> {
        let mut state = self.write()?;
        if state.items.values().any(|i| i.sku == item.sku) {
            return Err(StoreError::Conflict(format!("SKU {} already exists", item.sku)));
        }
        if let Some(parent) = item.parent_id {
            if !state.items.contains_key(&parent) {
                return Err(StoreError::NotFound("parent product"));
            }
        }
        insert_row(&mut state.items, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    async fn update_item_pricing(
        &self,
        id: CatalogItemId,
        price: Money,
        alt_price: Option<Money>,
    ) -> StoreResult<CatalogItem> {
        let mut state = self.write()?;
        let item = state.item_mut(id)?;
        item.price = price;
        item.alt_price = alt_price;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn adjust_stock(&self, id: CatalogItemId, delta: i64) -> StoreResult<CatalogItem> {
        let mut state = self.write()?;
        let item = state.item_mut(id)?;
        item.stock_quantity = item.stock_after(delta).ok_or(StoreError::InsufficientStock {
            item_id: id,
            requested: -delta,
            available: item.stock_quantity,
        })?;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn create_kit(&self, kit: Kit) -> StoreResult<Kit> {
        let mut state = self.write()?;
        if state.kits.contains_key(&kit.id) {
            return Err(StoreError::Conflict(format!("kit {} already exists", kit.id)));
        }
        insert_row(&mut state.kits, kit.clone());
        Ok(kit)
    }

    async fn get_kit(&self, id: KitId) -> StoreResult<Option<Kit>> {
        Ok(self.read()?.kits.get(&id).cloned())
    }

    async fn list_kits(&self) -> StoreResult<Vec<Kit>> {
        Ok(self.read()?.kits.values().cloned().collect())
    }

    async fn update_kit_settings(&self, id: KitId, settings: &KitSettings) -> StoreResult<Kit> {
        let mut state = self.write()?;
        let kit = state.kits.get_mut(&id).ok_or(StoreError::NotFound(Kit::KIND))?;
        kit.apply_settings(settings, Utc::now());
        Ok(kit.clone())
    }

    async fn override_kit_pricing(&self, id: KitId, sell_price: Money, alt_sell_price: Money) -> StoreResult<Kit> {
        let mut state = self.write()?;
        let kit = state.kits.get_mut(&id).ok_or(StoreError::NotFound(Kit::KIND))?;
        kit.sell_price = sell_price;
        kit.alt_sell_price = alt_sell_price;
        kit.updated_at = Utc::now();
        Ok(kit.clone())
    }

    async fn reprice_kit(&self, id: KitId, discount: Option<DiscountPercent>) -> StoreResult<Kit> {
        let mut state = self.write()?;

        let current = state
            .kits
            .get(&id)
            .map(|k| k.discount_percent)
            .ok_or(StoreError::NotFound(Kit::KIND))?;
        let entries = state.kit_entries(id);
        let mut components = Vec::with_capacity(entries.len());
        for entry in &entries {
            let item = state
                .items
                .get(&entry.catalog_item_id)
                .ok_or_else(|| StoreError::Backend(format!("entry references missing item {}", entry.catalog_item_id)))?;
            components.push(PriceComponent::of(entry, item));
        }
        let pricing = synthesize(&components, discount.unwrap_or(current))?;

        let kit = state.kits.get_mut(&id).ok_or(StoreError::NotFound(Kit::KIND))?;
        kit.apply_pricing(&pricing, Utc::now());
        Ok(kit.clone())
    }

    async fn entries_for_kit(&self, kit_id: KitId) -> StoreResult<Vec<CompositionEntry>> {
        Ok(self.read()?.kit_entries(kit_id))
    }

    async fn list_entries(&self) -> StoreResult<Vec<CompositionEntry>> {
        Ok(self.read()?.entries.values().cloned().collect())
    }

    async fn add_item_to_kit_and_lock_stock(&self, entry: CompositionEntry) -> StoreResult<AddedComponent> {
        let mut state = self.write()?;

        let target = state
            .kits
            .get(&entry.kit_id)
            .map(|k| k.target_stock_quantity)
            .ok_or(StoreError::NotFound(Kit::KIND))?;
        let item = state
            .items
            .get(&entry.catalog_item_id)
            .ok_or(StoreError::NotFound(CatalogItem::KIND))?;
        if state
            .entries
            .values()
            .any(|e| e.kit_id == entry.kit_id && e.catalog_item_id == entry.catalog_item_id)
        {
            return Err(StoreError::Conflict(format!(
                "item {} is already a component of kit {}",
                entry.catalog_item_id, entry.kit_id
            )));
        }

        let units = reserved_units(entry.quantity_per_kit, target)?;
        let remaining = item.stock_after(-units).ok_or(StoreError::InsufficientStock {
            item_id: item.id,
            requested: units,
            available: item.stock_quantity,
        })?;

        let item = state.item_mut(entry.catalog_item_id)?;
        if units != 0 {
            item.stock_quantity = remaining;
            item.updated_at = Utc::now();
        }
        insert_row(&mut state.entries, entry.clone());

        Ok(AddedComponent {
            entry,
            units_reserved: units,
        })
    }

    async fn remove_item_from_kit_and_unlock_stock(&self, entry_id: EntryId) -> StoreResult<Option<RemovedEntry>> {
        let mut state = self.write()?;

        let Some(entry) = state.entries.get(&entry_id).cloned() else {
            return Ok(None);
        };
        let target = state.kits.get(&entry.kit_id).map(|k| k.target_stock_quantity).unwrap_or(0);
        let units = entry.reserved_units(target)?;

        if units != 0 {
            let item = state.item_mut(entry.catalog_item_id)?;
            item.stock_quantity = item
                .stock_after(units)
                .ok_or_else(|| StoreError::Backend(format!("stock of item {} out of range", item.id)))?;
            item.updated_at = Utc::now();
        }
        state.entries.remove(&entry_id);

        Ok(Some(RemovedEntry {
            entry,
            units_released: units,
        }))
    }

    async fn update_kit_stock_level(&self, kit_id: KitId, new_target: i64) -> StoreResult<StockLevelChange> {
        let mut state = self.write()?;

        let kit = state.kits.get(&kit_id).cloned().ok_or(StoreError::NotFound(Kit::KIND))?;
        let entries = state.kit_entries(kit_id);
        let delta = kit.stock_change(new_target, entries.len())?;
        if delta == 0 {
            return Ok(StockLevelChange {
                previous: kit.target_stock_quantity,
                kit,
                steps: Vec::new(),
            });
        }

        let steps = reservation_plan(&entries, delta)?;
        if let Some((item_id, requested, available)) = state.check_plan(&steps)? {
            return Err(StoreError::CapacityExceeded {
                kit_id,
                item_id,
                requested,
                available,
            });
        }
        state.apply_plan(&steps)?;

        let kit = state.kits.get_mut(&kit_id).ok_or(StoreError::NotFound(Kit::KIND))?;
        let previous = kit.target_stock_quantity;
        kit.target_stock_quantity = new_target;
        kit.updated_at = Utc::now();

        Ok(StockLevelChange {
            kit: kit.clone(),
            previous,
            steps,
        })
    }

    async fn delete_kit_and_release_stock(&self, kit_id: KitId) -> StoreResult<Option<DeletedKit>> {
        let mut state = self.write()?;

        let Some(kit) = state.kits.get(&kit_id).cloned() else {
            return Ok(None);
        };
        let entries = state.kit_entries(kit_id);

        let released = if kit.target_stock_quantity > 0 {
            let steps = reservation_plan(&entries, -kit.target_stock_quantity)?;
            if let Some((item_id, _, _)) = state.check_plan(&steps)? {
                return Err(StoreError::Backend(format!("stock of item {item_id} out of range")));
            }
            state.apply_plan(&steps)?;
            steps
                .into_iter()
                .map(|s| ReservationStep {
                    catalog_item_id: s.catalog_item_id,
                    units: -s.units,
                })
                .collect()
        } else {
            Vec::new()
        };

        for entry in &entries {
            state.entries.remove(&entry.id);
        }
        state.kits.remove(&kit_id);

        Ok(Some(DeletedKit { kit, entries, released }))
    }
}
