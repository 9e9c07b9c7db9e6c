//! Reservation coordinator: the only mutation surface of the kit engine.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! request
//!   ↓
//! 1. Validate input (pure domain checks, no store transaction yet)
//!   ↓
//! 2. Commit through one atomic store operation
//!   ↓
//! 3. Recompute derived kit pricing when composition or discount changed,
//!    inside its own store transaction against the current components
//!   ↓
//! 4. Publish domain events to the bus
//! ```
//!
//! Capacity figures are never consulted here: the store's own transactional
//! check is what authorizes a reservation. Events are published only after
//! the commit; a publication failure is logged and the commit stands.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use storefront_catalog::{
    CatalogEvent, CatalogItem, CatalogItemId, ItemCreated, ItemKind, ItemPricingUpdated, NewCatalogItem,
    StockAdjusted,
};
use storefront_core::{DomainError, Entity, Money};
use storefront_events::{Event, EventBus, EventEnvelope};
use storefront_kits::{
    CapacityReport, ComponentAdded, ComponentRemoved, CompositionEntry, DiscountPercent, EntryId, Kit,
    KitCreated, KitDeleted, KitEvent, KitId, KitPricingUpdated, KitSettings, KitUpdated, NewKit, PricingSource,
    StockLevelChanged, ensure_not_duplicate, validate_quantity_per_kit,
};

use crate::read_model::{
    CatalogItemView, KitOverview, KitSummary, ReadModelError, catalog_view, kit_overview, list_catalog_views,
    list_kit_summaries,
};
use crate::store::{DeletedKit, KitStore, RemovedEntry, StoreError};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: CatalogItemId,
        requested: i64,
        available: i64,
    },

    #[error("kit {kit_id} exceeds capacity: item {item_id} requested {requested}, available {available}")]
    CapacityExceeded {
        kit_id: KitId,
        item_id: CatalogItemId,
        requested: i64,
        available: i64,
    },

    #[error("store failure: {0}")]
    Store(String),
}

impl From<DomainError> for CoordinatorError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => CoordinatorError::Validation(msg),
            DomainError::InvariantViolation(msg) => CoordinatorError::InvariantViolation(msg),
            DomainError::Conflict(msg) => CoordinatorError::Conflict(msg),
            DomainError::NotFound(what) => CoordinatorError::NotFound(what),
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InsufficientStock {
                item_id,
                requested,
                available,
            } => CoordinatorError::InsufficientStock {
                item_id,
                requested,
                available,
            },
            StoreError::CapacityExceeded {
                kit_id,
                item_id,
                requested,
                available,
            } => CoordinatorError::CapacityExceeded {
                kit_id,
                item_id,
                requested,
                available,
            },
            StoreError::NotFound(what) => CoordinatorError::NotFound(what),
            StoreError::Conflict(msg) => CoordinatorError::Conflict(msg),
            StoreError::Domain(err) => err.into(),
            StoreError::Backend(msg) => CoordinatorError::Store(msg),
        }
    }
}

impl From<ReadModelError> for CoordinatorError {
    fn from(value: ReadModelError) -> Self {
        match value {
            ReadModelError::Store(err) => err.into(),
            ReadModelError::Domain(err) => err.into(),
        }
    }
}

impl CoordinatorError {
    /// Shortages are expected outcomes of concurrent demand, not faults.
    pub fn is_stock_shortage(&self) -> bool {
        matches!(
            self,
            CoordinatorError::InsufficientStock { .. } | CoordinatorError::CapacityExceeded { .. }
        )
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Log a failed store call at the level its kind deserves, then convert it.
fn reject(operation: &'static str, err: StoreError) -> CoordinatorError {
    let err = CoordinatorError::from(err);
    match &err {
        CoordinatorError::Store(_) => error!(operation, error = %err, "store failure"),
        e if e.is_stock_shortage() => warn!(operation, error = %err, "reservation rejected"),
        _ => debug!(operation, error = %err, "request rejected"),
    }
    err
}

/// Generic over the store and the bus so tests run against the in-memory
/// pair and production against Postgres.
#[derive(Debug)]
pub struct ReservationCoordinator<S, B> {
    store: S,
    bus: B,
}

impl<S, B> ReservationCoordinator<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> ReservationCoordinator<S, B>
where
    S: KitStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn publish<E>(&self, event: &E)
    where
        E: Event + Serialize,
    {
        let envelope = match EventEnvelope::from_typed(event) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(event_type = event.event_type(), error = %err, "failed to build event envelope");
                return;
            }
        };
        if let Err(err) = self.bus.publish(envelope) {
            error!(
                event_type = event.event_type(),
                error = %err,
                "event publication failed after commit"
            );
        }
    }

    fn publish_kit(&self, event: KitEvent) {
        self.publish(&event);
    }

    fn publish_catalog(&self, event: CatalogEvent) {
        self.publish(&event);
    }

    // ---- catalog -------------------------------------------------------

    #[instrument(skip(self, input), fields(sku = %input.sku), err)]
    pub async fn create_item(&self, input: NewCatalogItem) -> CoordinatorResult<CatalogItem> {
        input.validate()?;
        if let Some(parent_id) = input.parent_id {
            let parent = self
                .store
                .get_item(parent_id)
                .await
                .map_err(|e| reject("create_item", e))?
                .ok_or(CoordinatorError::NotFound("parent product"))?;
            if parent.kind != ItemKind::Product {
                return Err(CoordinatorError::Validation(
                    "a variant's parent must be a base product".to_string(),
                ));
            }
        }

        let item = input.into_item(CatalogItemId::generate(), Utc::now());
        let item = self.store.create_item(item).await.map_err(|e| reject("create_item", e))?;

        self.publish_catalog(CatalogEvent::ItemCreated(ItemCreated {
            item_id: item.id,
            name: item.name.clone(),
            sku: item.sku.clone(),
            kind: item.kind,
            stock_quantity: item.stock_quantity,
            occurred_at: item.created_at,
        }));
        Ok(item)
    }

    /// External sales (negative) and receiving (positive) against free stock.
    #[instrument(skip(self), fields(item_id = %item_id), err)]
    pub async fn adjust_stock(&self, item_id: CatalogItemId, delta: i64) -> CoordinatorResult<CatalogItem> {
        CatalogItem::validate_stock_delta(delta)?;
        let item = self
            .store
            .adjust_stock(item_id, delta)
            .await
            .map_err(|e| reject("adjust_stock", e))?;

        self.publish_catalog(CatalogEvent::StockAdjusted(StockAdjusted {
            item_id,
            delta,
            stock_quantity: item.stock_quantity,
            occurred_at: item.updated_at,
        }));
        Ok(item)
    }

    /// Change an item's prices. Stored kit prices are left alone; kit
    /// overviews show the new suggestion until the kit is refreshed.
    #[instrument(skip(self), fields(item_id = %item_id), err)]
    pub async fn update_item_pricing(
        &self,
        item_id: CatalogItemId,
        price: Money,
        alt_price: Option<Money>,
    ) -> CoordinatorResult<CatalogItem> {
        let item = self
            .store
            .update_item_pricing(item_id, price, alt_price)
            .await
            .map_err(|e| reject("update_item_pricing", e))?;

        self.publish_catalog(CatalogEvent::PricingUpdated(ItemPricingUpdated {
            item_id,
            price: item.price,
            alt_price: item.alt_price,
            occurred_at: item.updated_at,
        }));
        Ok(item)
    }

    // ---- kits ----------------------------------------------------------

    #[instrument(skip(self, input), err)]
    pub async fn create_kit(&self, input: NewKit) -> CoordinatorResult<Kit> {
        input.validate()?;
        let kit = input.into_kit(KitId::generate(), Utc::now());
        let kit = self.store.create_kit(kit).await.map_err(|e| reject("create_kit", e))?;

        self.publish_kit(KitEvent::KitCreated(KitCreated {
            kit_id: kit.id,
            name: kit.name.clone(),
            discount_percent: kit.discount_percent,
            active: kit.active,
            occurred_at: kit.created_at,
        }));
        Ok(kit)
    }

    #[instrument(skip(self, settings), fields(kit_id = %kit_id), err)]
    pub async fn update_kit(&self, kit_id: KitId, settings: KitSettings) -> CoordinatorResult<Kit> {
        settings.validate()?;
        let kit = self
            .store
            .update_kit_settings(kit_id, &settings)
            .await
            .map_err(|e| reject("update_kit", e))?;

        self.publish_kit(KitEvent::KitUpdated(KitUpdated {
            kit_id,
            name: kit.name.clone(),
            active: kit.active,
            occurred_at: kit.updated_at,
        }));
        Ok(kit)
    }

    /// Add `catalog_item_id` to the kit, reserving `quantity_per_kit *
    /// target` units right away when the kit already has stock on offer.
    #[instrument(skip(self), fields(kit_id = %kit_id, item_id = %catalog_item_id), err)]
    pub async fn add_component(
        &self,
        kit_id: KitId,
        catalog_item_id: CatalogItemId,
        quantity_per_kit: i64,
    ) -> CoordinatorResult<CompositionEntry> {
        validate_quantity_per_kit(quantity_per_kit)?;
        self.store
            .get_kit(kit_id)
            .await
            .map_err(|e| reject("add_component", e))?
            .ok_or(CoordinatorError::NotFound(Kit::KIND))?;
        self.store
            .get_item(catalog_item_id)
            .await
            .map_err(|e| reject("add_component", e))?
            .ok_or(CoordinatorError::NotFound(CatalogItem::KIND))?;
        let existing = self
            .store
            .entries_for_kit(kit_id)
            .await
            .map_err(|e| reject("add_component", e))?;
        ensure_not_duplicate(&existing, catalog_item_id)?;

        let entry = CompositionEntry {
            id: EntryId::generate(),
            kit_id,
            catalog_item_id,
            quantity_per_kit,
            created_at: Utc::now(),
        };
        let added = self
            .store
            .add_item_to_kit_and_lock_stock(entry)
            .await
            .map_err(|e| reject("add_component", e))?;

        self.publish_kit(KitEvent::ComponentAdded(ComponentAdded {
            kit_id,
            entry_id: added.entry.id,
            catalog_item_id,
            quantity_per_kit,
            units_reserved: added.units_reserved,
            occurred_at: added.entry.created_at,
        }));
        self.recompute_after_composition_change(kit_id).await;
        Ok(added.entry)
    }

    /// Release the entry's units and delete it. Removing an entry that is
    /// already gone succeeds with `None`.
    #[instrument(skip(self), fields(entry_id = %entry_id), err)]
    pub async fn remove_component(&self, entry_id: EntryId) -> CoordinatorResult<Option<RemovedEntry>> {
        let removed = self
            .store
            .remove_item_from_kit_and_unlock_stock(entry_id)
            .await
            .map_err(|e| reject("remove_component", e))?;

        let Some(removed) = removed else {
            info!(entry_id = %entry_id, "composition entry already removed; nothing to release");
            return Ok(None);
        };

        self.publish_kit(KitEvent::ComponentRemoved(ComponentRemoved {
            kit_id: removed.entry.kit_id,
            entry_id,
            catalog_item_id: removed.entry.catalog_item_id,
            units_released: removed.units_released,
            occurred_at: Utc::now(),
        }));
        self.recompute_after_composition_change(removed.entry.kit_id).await;
        Ok(Some(removed))
    }

    /// Move the kit's offered quantity to `new_target`, reserving or
    /// releasing the difference on every component in one transaction.
    #[instrument(skip(self), fields(kit_id = %kit_id), err)]
    pub async fn set_kit_stock(&self, kit_id: KitId, new_target: i64) -> CoordinatorResult<Kit> {
        if new_target < 0 {
            return Err(CoordinatorError::Validation(format!(
                "target stock cannot be negative, got {new_target}"
            )));
        }
        let change = self
            .store
            .update_kit_stock_level(kit_id, new_target)
            .await
            .map_err(|e| reject("set_kit_stock", e))?;

        if change.delta() == 0 {
            debug!(kit_id = %kit_id, target = new_target, "kit stock unchanged");
            return Ok(change.kit);
        }

        self.publish_kit(KitEvent::StockLevelChanged(StockLevelChanged {
            kit_id,
            previous: change.previous,
            current: change.kit.target_stock_quantity,
            occurred_at: change.kit.updated_at,
        }));
        Ok(change.kit)
    }

    /// Set the discount and recompute prices from it.
    #[instrument(skip(self), fields(kit_id = %kit_id, discount = %discount), err)]
    pub async fn set_discount(&self, kit_id: KitId, discount: DiscountPercent) -> CoordinatorResult<Kit> {
        self.apply_formula_pricing(kit_id, Some(discount)).await
    }

    /// Recompute prices from current component prices and the stored discount.
    #[instrument(skip(self), fields(kit_id = %kit_id), err)]
    pub async fn refresh_pricing(&self, kit_id: KitId) -> CoordinatorResult<Kit> {
        self.apply_formula_pricing(kit_id, None).await
    }

    /// Set prices by hand. They hold until the next composition or discount
    /// change, when the formula overwrites them.
    #[instrument(skip(self), fields(kit_id = %kit_id), err)]
    pub async fn override_pricing(
        &self,
        kit_id: KitId,
        sell_price: Money,
        alt_sell_price: Money,
    ) -> CoordinatorResult<Kit> {
        let kit = self
            .store
            .override_kit_pricing(kit_id, sell_price.round2(), alt_sell_price.round2())
            .await
            .map_err(|e| reject("override_pricing", e))?;

        self.publish_pricing(&kit, PricingSource::Manual);
        Ok(kit)
    }

    /// Release all reserved stock, then remove the kit and its entries, as
    /// one transaction. Deleting a kit that is already gone succeeds with
    /// `None`.
    #[instrument(skip(self), fields(kit_id = %kit_id), err)]
    pub async fn delete_kit(&self, kit_id: KitId) -> CoordinatorResult<Option<DeletedKit>> {
        let deleted = self
            .store
            .delete_kit_and_release_stock(kit_id)
            .await
            .map_err(|e| reject("delete_kit", e))?;

        let Some(deleted) = deleted else {
            info!(kit_id = %kit_id, "kit already deleted; nothing to release");
            return Ok(None);
        };

        info!(
            kit = %deleted.kit.label(),
            components = deleted.entries.len(),
            "kit deleted and its reservations released"
        );
        self.publish_kit(KitEvent::KitDeleted(KitDeleted {
            kit_id,
            released: deleted.released.iter().map(|s| (s.catalog_item_id, s.units)).collect(),
            occurred_at: Utc::now(),
        }));
        Ok(Some(deleted))
    }

    async fn apply_formula_pricing(
        &self,
        kit_id: KitId,
        discount: Option<DiscountPercent>,
    ) -> CoordinatorResult<Kit> {
        let kit = self
            .store
            .reprice_kit(kit_id, discount)
            .await
            .map_err(|e| reject("apply_formula_pricing", e))?;

        self.publish_pricing(&kit, PricingSource::Recomputed);
        Ok(kit)
    }

    /// The composition change is already committed; a failed recompute only
    /// leaves the stored price stale (the overview flags it).
    async fn recompute_after_composition_change(&self, kit_id: KitId) {
        if let Err(err) = self.apply_formula_pricing(kit_id, None).await {
            warn!(kit_id = %kit_id, error = %err, "kit pricing recompute failed");
        }
    }

    fn publish_pricing(&self, kit: &Kit, source: PricingSource) {
        self.publish_kit(KitEvent::PricingUpdated(KitPricingUpdated {
            kit_id: kit.id,
            discount_percent: kit.discount_percent,
            sell_price: kit.sell_price,
            alt_sell_price: kit.alt_sell_price,
            source,
            occurred_at: kit.updated_at,
        }));
    }

    // ---- queries -------------------------------------------------------

    pub async fn catalog_items(&self) -> CoordinatorResult<Vec<CatalogItemView>> {
        Ok(list_catalog_views(&self.store).await?)
    }

    pub async fn catalog_item(&self, item_id: CatalogItemId) -> CoordinatorResult<CatalogItemView> {
        catalog_view(&self.store, item_id)
            .await?
            .ok_or(CoordinatorError::NotFound(CatalogItem::KIND))
    }

    pub async fn kits(&self) -> CoordinatorResult<Vec<KitSummary>> {
        Ok(list_kit_summaries(&self.store).await?)
    }

    pub async fn kit_overview(&self, kit_id: KitId) -> CoordinatorResult<KitOverview> {
        kit_overview(&self.store, kit_id)
            .await?
            .ok_or(CoordinatorError::NotFound(Kit::KIND))
    }

    pub async fn capacity(&self, kit_id: KitId) -> CoordinatorResult<CapacityReport> {
        Ok(self.kit_overview(kit_id).await?.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use storefront_events::InMemoryEventBus;

    use crate::store::{AddedComponent, InMemoryKitStore, StockLevelChange, StoreResult};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn setup() -> (ReservationCoordinator<InMemoryKitStore, Bus>, Bus) {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        (ReservationCoordinator::new(InMemoryKitStore::new(), bus.clone()), bus)
    }

    fn product(sku: &str, stock: i64) -> NewCatalogItem {
        NewCatalogItem {
            name: sku.to_string(),
            sku: sku.to_string(),
            kind: ItemKind::Product,
            parent_id: None,
            initial_stock: stock,
            price: Money::new(dec!(10)).unwrap(),
            alt_price: None,
        }
    }

    #[test]
    fn store_errors_keep_their_meaning() {
        let err: CoordinatorError = StoreError::Domain(DomainError::invariant("x")).into();
        assert!(matches!(err, CoordinatorError::InvariantViolation(_)));

        let err: CoordinatorError = StoreError::NotFound("kit").into();
        assert!(matches!(err, CoordinatorError::NotFound("kit")));

        let err: CoordinatorError = StoreError::Backend("boom".to_string()).into();
        assert!(!err.is_stock_shortage());
    }

    #[tokio::test]
    async fn validation_happens_before_the_store() {
        let (coordinator, bus) = setup();
        let events = bus.subscribe();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let item = coordinator.create_item(product("A", 5)).await.unwrap();
        events.drain();

        assert!(matches!(
            coordinator.add_component(kit.id, item.id, 0).await,
            Err(CoordinatorError::Validation(_))
        ));
        assert!(matches!(
            coordinator.set_kit_stock(kit.id, -1).await,
            Err(CoordinatorError::Validation(_))
        ));
        assert!(matches!(
            coordinator.add_component(KitId::generate(), item.id, 1).await,
            Err(CoordinatorError::NotFound("kit"))
        ));
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn duplicate_components_are_validation_errors() {
        let (coordinator, _bus) = setup();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let item = coordinator.create_item(product("A", 5)).await.unwrap();

        coordinator.add_component(kit.id, item.id, 1).await.unwrap();
        assert!(matches!(
            coordinator.add_component(kit.id, item.id, 2).await,
            Err(CoordinatorError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn variants_need_an_existing_base_product() {
        let (coordinator, _bus) = setup();
        let mut variant = product("A-RED", 1);
        variant.kind = ItemKind::Variant;
        variant.parent_id = Some(CatalogItemId::generate());
        assert!(matches!(
            coordinator.create_item(variant.clone()).await,
            Err(CoordinatorError::NotFound("parent product"))
        ));

        let base = coordinator.create_item(product("A", 1)).await.unwrap();
        variant.parent_id = Some(base.id);
        let created = coordinator.create_item(variant).await.unwrap();
        assert_eq!(created.parent_id, Some(base.id));
    }

    #[tokio::test]
    async fn committed_changes_are_published() {
        let (coordinator, bus) = setup();
        let events = bus.subscribe();

        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let item = coordinator.create_item(product("A", 10)).await.unwrap();
        coordinator.add_component(kit.id, item.id, 2).await.unwrap();
        coordinator.set_kit_stock(kit.id, 3).await.unwrap();

        let types: Vec<String> = events.drain().iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(
            types,
            vec![
                "kits.kit.created",
                "catalog.item.created",
                "kits.component.added",
                "kits.pricing.updated",
                "kits.stock.changed",
            ]
        );
    }

    #[tokio::test]
    async fn rejected_reservations_publish_nothing() {
        let (coordinator, bus) = setup();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let item = coordinator.create_item(product("A", 3)).await.unwrap();
        coordinator.add_component(kit.id, item.id, 2).await.unwrap();

        let events = bus.subscribe();
        let err = coordinator.set_kit_stock(kit.id, 2).await.unwrap_err();
        assert!(err.is_stock_shortage());
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn manual_override_holds_until_composition_changes() {
        let (coordinator, _bus) = setup();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let a = coordinator.create_item(product("A", 10)).await.unwrap();
        let b = coordinator.create_item(product("B", 10)).await.unwrap();
        coordinator.add_component(kit.id, a.id, 1).await.unwrap();

        let overridden = coordinator
            .override_pricing(kit.id, Money::new(dec!(7.5)).unwrap(), Money::new(dec!(7)).unwrap())
            .await
            .unwrap();
        assert_eq!(overridden.sell_price.to_string(), "7.50");
        assert!(!coordinator.kit_overview(kit.id).await.unwrap().pricing_in_sync);

        coordinator.add_component(kit.id, b.id, 1).await.unwrap();
        let overview = coordinator.kit_overview(kit.id).await.unwrap();
        assert_eq!(overview.kit.sell_price.amount(), dec!(20));
        assert!(overview.pricing_in_sync);
    }

    #[tokio::test]
    async fn catalog_price_changes_wait_for_a_refresh() {
        let (coordinator, _bus) = setup();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let a = coordinator.create_item(product("A", 10)).await.unwrap();
        coordinator.add_component(kit.id, a.id, 2).await.unwrap();

        coordinator
            .update_item_pricing(a.id, Money::new(dec!(12)).unwrap(), None)
            .await
            .unwrap();
        let overview = coordinator.kit_overview(kit.id).await.unwrap();
        assert_eq!(overview.kit.sell_price.amount(), dec!(20));
        assert_eq!(overview.suggested_pricing.sell_price.amount(), dec!(24));
        assert!(!overview.pricing_in_sync);

        let refreshed = coordinator.refresh_pricing(kit.id).await.unwrap();
        assert_eq!(refreshed.sell_price.amount(), dec!(24));
    }

    /// Commits a change on behalf of another caller the moment the
    /// coordinator first touches the kit, then delegates.
    #[derive(Default)]
    struct Interleaving {
        inner: InMemoryKitStore,
        discount: Mutex<Option<(KitId, DiscountPercent)>>,
        component: Mutex<Option<CompositionEntry>>,
    }

    impl Interleaving {
        async fn interleave(&self) {
            let discount = self.discount.lock().unwrap().take();
            if let Some((kit_id, discount)) = discount {
                self.inner.reprice_kit(kit_id, Some(discount)).await.unwrap();
            }
            let component = self.component.lock().unwrap().take();
            if let Some(entry) = component {
                self.inner.add_item_to_kit_and_lock_stock(entry).await.unwrap();
            }
        }
    }

    #[async_trait]
    impl KitStore for Interleaving {
        async fn create_item(&self, item: CatalogItem) -> StoreResult<CatalogItem> {
            self.inner.create_item(item).await
        }

        async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>> {
            self.inner.get_item(id).await
        }

        async fn list_items(&self) -> StoreResult<Vec<CatalogItem>> {
            self.inner.list_items().await
        }

        async fn update_item_pricing(
            &self,
            id: CatalogItemId,
            price: Money,
            alt_price: Option<Money>,
        ) -> StoreResult<CatalogItem> {
            self.inner.update_item_pricing(id, price, alt_price).await
        }

        async fn adjust_stock(&self, id: CatalogItemId, delta: i64) -> StoreResult<CatalogItem> {
            self.inner.adjust_stock(id, delta).await
        }

        async fn create_kit(&self, kit: Kit) -> StoreResult<Kit> {
            self.inner.create_kit(kit).await
        }

        async fn get_kit(&self, id: KitId) -> StoreResult<Option<Kit>> {
            self.interleave().await;
            self.inner.get_kit(id).await
        }

        async fn list_kits(&self) -> StoreResult<Vec<Kit>> {
            self.inner.list_kits().await
        }

        async fn update_kit_settings(&self, id: KitId, settings: &KitSettings) -> StoreResult<Kit> {
            self.inner.update_kit_settings(id, settings).await
        }

        async fn override_kit_pricing(&self, id: KitId, sell_price: Money, alt_sell_price: Money) -> StoreResult<Kit> {
            self.interleave().await;
            self.inner.override_kit_pricing(id, sell_price, alt_sell_price).await
        }

        async fn reprice_kit(&self, id: KitId, discount: Option<DiscountPercent>) -> StoreResult<Kit> {
            self.interleave().await;
            self.inner.reprice_kit(id, discount).await
        }

        async fn entries_for_kit(&self, kit_id: KitId) -> StoreResult<Vec<CompositionEntry>> {
            self.interleave().await;
            self.inner.entries_for_kit(kit_id).await
        }

        async fn list_entries(&self) -> StoreResult<Vec<CompositionEntry>> {
            self.inner.list_entries().await
        }

        async fn add_item_to_kit_and_lock_stock(&self, entry: CompositionEntry) -> StoreResult<AddedComponent> {
            self.inner.add_item_to_kit_and_lock_stock(entry).await
        }

        async fn remove_item_from_kit_and_unlock_stock(&self, entry_id: EntryId) -> StoreResult<Option<RemovedEntry>> {
            self.inner.remove_item_from_kit_and_unlock_stock(entry_id).await
        }

        async fn update_kit_stock_level(&self, kit_id: KitId, new_target: i64) -> StoreResult<StockLevelChange> {
            self.inner.update_kit_stock_level(kit_id, new_target).await
        }

        async fn delete_kit_and_release_stock(&self, kit_id: KitId) -> StoreResult<Option<DeletedKit>> {
            self.inner.delete_kit_and_release_stock(kit_id).await
        }
    }

    fn interleaved() -> ReservationCoordinator<Interleaving, Bus> {
        ReservationCoordinator::new(Interleaving::default(), Arc::new(InMemoryEventBus::new()))
    }

    #[tokio::test]
    async fn override_keeps_a_discount_committed_in_between() {
        let coordinator = interleaved();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let a = coordinator.create_item(product("A", 10)).await.unwrap();
        coordinator.add_component(kit.id, a.id, 2).await.unwrap();

        let half = DiscountPercent::new(dec!(50)).unwrap();
        *coordinator.store().discount.lock().unwrap() = Some((kit.id, half));
        let overridden = coordinator
            .override_pricing(kit.id, Money::new(dec!(10)).unwrap(), Money::new(dec!(10)).unwrap())
            .await
            .unwrap();

        assert_eq!(overridden.discount_percent, half);
        assert_eq!(overridden.sell_price.amount(), dec!(10));
        let overview = coordinator.kit_overview(kit.id).await.unwrap();
        assert_eq!(overview.kit.discount_percent, half);
        assert_eq!(overview.suggested_pricing.sell_price.amount(), dec!(10));
    }

    #[tokio::test]
    async fn refresh_keeps_a_discount_committed_in_between() {
        let coordinator = interleaved();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let a = coordinator.create_item(product("A", 10)).await.unwrap();
        coordinator.add_component(kit.id, a.id, 3).await.unwrap();

        let half = DiscountPercent::new(dec!(50)).unwrap();
        *coordinator.store().discount.lock().unwrap() = Some((kit.id, half));
        let refreshed = coordinator.refresh_pricing(kit.id).await.unwrap();

        assert_eq!(refreshed.discount_percent, half);
        assert_eq!(refreshed.sell_price.amount(), dec!(15));
    }

    #[tokio::test]
    async fn recompute_prices_a_component_added_in_between() {
        let coordinator = interleaved();
        let kit = coordinator.create_kit(NewKit::new("Kit")).await.unwrap();
        let a = coordinator.create_item(product("A", 10)).await.unwrap();
        let b = coordinator.create_item(product("B", 10)).await.unwrap();
        coordinator.add_component(kit.id, a.id, 2).await.unwrap();

        *coordinator.store().component.lock().unwrap() = Some(CompositionEntry {
            id: EntryId::generate(),
            kit_id: kit.id,
            catalog_item_id: b.id,
            quantity_per_kit: 1,
            created_at: Utc::now(),
        });
        let refreshed = coordinator.refresh_pricing(kit.id).await.unwrap();

        assert_eq!(refreshed.sell_price.amount(), dec!(30));
        let overview = coordinator.kit_overview(kit.id).await.unwrap();
        assert_eq!(overview.entries.len(), 2);
        assert!(overview.pricing_in_sync);
    }
}
