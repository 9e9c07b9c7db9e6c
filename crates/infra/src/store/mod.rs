//! Catalog inventory and kit persistence.
//!
//! [`KitStore`] is the single place where stock and composition change. Every
//! method that moves stock is one transaction: it either applies all of its
//! deltas or none, and it never lets an item's free stock go negative.
//!
//! Implementations:
//! - [`InMemoryKitStore`]: one lock over the whole state (tests/dev)
//! - [`PostgresKitStore`]: stored procedures with row locks

use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::{CatalogItem, CatalogItemId};
use storefront_core::{DomainError, Money};
use storefront_kits::{
    CompositionEntry, DiscountPercent, EntryId, Kit, KitId, KitSettings, ReservationStep,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryKitStore;
pub use postgres::PostgresKitStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A single item cannot cover a reservation or an outgoing adjustment.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: CatalogItemId,
        requested: i64,
        available: i64,
    },

    /// Raising a kit's target stock would overdraw one of its components.
    #[error("kit {kit_id} exceeds capacity: item {item_id} requested {requested}, available {available}")]
    CapacityExceeded {
        kit_id: KitId,
        item_id: CatalogItemId,
        requested: i64,
        available: i64,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness collision (duplicate SKU, component added twice concurrently).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain rule checked inside the transaction failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of adding a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedComponent {
    pub entry: CompositionEntry,
    pub units_reserved: i64,
}

/// Outcome of removing a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedEntry {
    pub entry: CompositionEntry,
    pub units_released: i64,
}

/// Outcome of changing a kit's target stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevelChange {
    pub kit: Kit,
    pub previous: i64,
    /// Applied movements; empty when the target did not change.
    pub steps: Vec<ReservationStep>,
}

impl StockLevelChange {
    pub fn delta(&self) -> i64 {
        self.kit.target_stock_quantity - self.previous
    }
}

/// Outcome of deleting a kit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedKit {
    pub kit: Kit,
    pub entries: Vec<CompositionEntry>,
    /// Units returned to each item (only entries that held stock).
    pub released: Vec<ReservationStep>,
}

#[async_trait]
pub trait KitStore: Send + Sync {
    // Catalog items.

    /// Insert a new item. Duplicate SKUs are a `Conflict`.
    async fn create_item(&self, item: CatalogItem) -> StoreResult<CatalogItem>;

    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>>;

    /// All items, oldest first.
    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>>;

    async fn update_item_pricing(
        &self,
        id: CatalogItemId,
        price: Money,
        alt_price: Option<Money>,
    ) -> StoreResult<CatalogItem>;

    /// Apply a sale (negative) or receipt (positive) to free stock.
    async fn adjust_stock(&self, id: CatalogItemId, delta: i64) -> StoreResult<CatalogItem>;

    // Kit records.

    async fn create_kit(&self, kit: Kit) -> StoreResult<Kit>;

    async fn get_kit(&self, id: KitId) -> StoreResult<Option<Kit>>;

    async fn list_kits(&self) -> StoreResult<Vec<Kit>>;

    async fn update_kit_settings(&self, id: KitId, settings: &KitSettings) -> StoreResult<Kit>;

    /// Write hand-set prices. The discount and the components are untouched.
    async fn override_kit_pricing(&self, id: KitId, sell_price: Money, alt_sell_price: Money) -> StoreResult<Kit>;

    /// Recompute the kit's prices from its current components and discount,
    /// replacing the discount first when one is given. The kit stays locked
    /// from the read of its components to the write, so a concurrent
    /// composition or discount change is never overwritten with stale prices.
    async fn reprice_kit(&self, id: KitId, discount: Option<DiscountPercent>) -> StoreResult<Kit>;

    /// Entries of one kit in insertion order.
    async fn entries_for_kit(&self, kit_id: KitId) -> StoreResult<Vec<CompositionEntry>>;

    async fn list_entries(&self) -> StoreResult<Vec<CompositionEntry>>;

    // Transactional reservation operations.

    /// Create `entry` and take `quantity_per_kit * target` units of its item.
    async fn add_item_to_kit_and_lock_stock(&self, entry: CompositionEntry) -> StoreResult<AddedComponent>;

    /// Give the entry's units back and delete it. `None` when already gone.
    async fn remove_item_from_kit_and_unlock_stock(&self, entry_id: EntryId) -> StoreResult<Option<RemovedEntry>>;

    /// Move the kit's target to `new_target`, reserving or releasing the
    /// difference across every entry. All-or-nothing.
    async fn update_kit_stock_level(&self, kit_id: KitId, new_target: i64) -> StoreResult<StockLevelChange>;

    /// Release everything the kit holds, then delete its entries and the kit.
    /// `None` when already gone.
    async fn delete_kit_and_release_stock(&self, kit_id: KitId) -> StoreResult<Option<DeletedKit>>;
}

#[async_trait]
impl<S> KitStore for std::sync::Arc<S>
where
    S: KitStore + ?Sized,
{
    async fn create_item(&self, item: CatalogItem) -> StoreResult<CatalogItem> {
        (**self).create_item(item).await
    }

    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>> {
        (**self).get_item(id).await
    }

    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>> {
        (**self).list_items().await
    }

    async fn update_item_pricing(
        &self,
        id: CatalogItemId,
        price: Money,
        alt_price: Option<Money>,
    ) -> StoreResult<CatalogItem> {
        (**self).update_item_pricing(id, price, alt_price).await
    }

    async fn adjust_stock(&self, id: CatalogItemId, delta: i64) -> StoreResult<CatalogItem> {
        (**self).adjust_stock(id, delta).await
    }

    async fn create_kit(&self, kit: Kit) -> StoreResult<Kit> {
        (**self).create_kit(kit).await
    }

    async fn get_kit(&self, id: KitId) -> StoreResult<Option<Kit>> {
        (**self).get_kit(id).await
    }

    async fn list_kits(&self) -> StoreResult<Vec<Kit>> {
        (**self).list_kits().await
    }

    async fn update_kit_settings(&self, id: KitId, settings: &KitSettings) -> StoreResult<Kit> {
        (**self).update_kit_settings(id, settings).await
    }

    async fn override_kit_pricing(&self, id: KitId, sell_price: Money, alt_sell_price: Money) -> StoreResult<Kit> {
        (**self).override_kit_pricing(id, sell_price, alt_sell_price).await
    }

    async fn reprice_kit(&self, id: KitId, discount: Option<DiscountPercent>) -> StoreResult<Kit> {
        (**self).reprice_kit(id, discount).await
    }

    async fn entries_for_kit(&self, kit_id: KitId) -> StoreResult<Vec<CompositionEntry>> {
        (**self).entries_for_kit(kit_id).await
    }

    async fn list_entries(&self) -> StoreResult<Vec<CompositionEntry>> {
        (**self).list_entries().await
    }

    async fn add_item_to_kit_and_lock_stock(&self, entry: CompositionEntry) -> StoreResult<AddedComponent> {
        (**self).add_item_to_kit_and_lock_stock(entry).await
    }

    async fn remove_item_from_kit_and_unlock_stock(&self, entry_id: EntryId) -> StoreResult<Option<RemovedEntry>> {
        (**self).remove_item_from_kit_and_unlock_stock(entry_id).await
    }

    async fn update_kit_stock_level(&self, kit_id: KitId, new_target: i64) -> StoreResult<StockLevelChange> {
        (**self).update_kit_stock_level(kit_id, new_target).await
    }

    async fn delete_kit_and_release_stock(&self, kit_id: KitId) -> StoreResult<Option<DeletedKit>> {
        (**self).delete_kit_and_release_stock(kit_id).await
    }
}
