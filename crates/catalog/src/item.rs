use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{AggregateId, DomainError, DomainResult, Entity, Money, aggregate_id_newtype};
use storefront_events::Event;

aggregate_id_newtype!(
    /// Catalog item identifier (base product or variant).
    CatalogItemId,
    "CatalogItemId"
);

/// Whether an item is a base product or one of its variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Product,
    Variant,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Variant => "variant",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "product" => Ok(ItemKind::Product),
            "variant" => Ok(ItemKind::Variant),
            other => Err(DomainError::validation(format!("unknown item kind: {other}"))),
        }
    }
}

/// A sellable catalog item.
///
/// `stock_quantity` is free stock: units already reserved by kits have been
/// taken out of it, so it is the only figure direct sales may draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    pub sku: String,
    pub kind: ItemKind,
    /// Base product of a variant; `None` for products.
    pub parent_id: Option<CatalogItemId>,
    pub stock_quantity: i64,
    pub price: Money,
    pub alt_price: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Alternate price, falling back to the regular price when unset.
    pub fn effective_alt_price(&self) -> Money {
        self.alt_price.unwrap_or(self.price)
    }

    /// Stock after applying `delta`, or `None` when it would go negative
    /// (or overflow).
    pub fn stock_after(&self, delta: i64) -> Option<i64> {
        self.stock_quantity.checked_add(delta).filter(|s| *s >= 0)
    }

    /// Check that a stock adjustment is meaningful before it reaches a store.
    pub fn validate_stock_delta(delta: i64) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        Ok(())
    }
}

impl Entity for CatalogItem {
    const KIND: &'static str = "catalog item";
    type Id = CatalogItemId;

    fn id(&self) -> CatalogItemId {
        self.id
    }
}

/// Input for creating a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub name: String,
    pub sku: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub parent_id: Option<CatalogItemId>,
    #[serde(default)]
    pub initial_stock: i64,
    pub price: Money,
    #[serde(default)]
    pub alt_price: Option<Money>,
}

impl NewCatalogItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if self.initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        match (self.kind, self.parent_id) {
            (ItemKind::Variant, None) => Err(DomainError::validation("a variant needs a parent product")),
            (ItemKind::Product, Some(_)) => Err(DomainError::validation("a base product cannot have a parent")),
            _ => Ok(()),
        }
    }

    /// Build the persisted record. Call [`NewCatalogItem::validate`] first.
    pub fn into_item(self, id: CatalogItemId, now: DateTime<Utc>) -> CatalogItem {
        CatalogItem {
            id,
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            kind: self.kind,
            parent_id: self.parent_id,
            stock_quantity: self.initial_stock,
            price: self.price,
            alt_price: self.alt_price,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: CatalogItemId,
    pub name: String,
    pub sku: String,
    pub kind: ItemKind,
    pub stock_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted (sales, receiving, manual corrections).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item_id: CatalogItemId,
    pub delta: i64,
    pub stock_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemPricingUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPricingUpdated {
    pub item_id: CatalogItemId,
    pub price: Money,
    pub alt_price: Option<Money>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEvent {
    ItemCreated(ItemCreated),
    StockAdjusted(StockAdjusted),
    PricingUpdated(ItemPricingUpdated),
}

impl CatalogEvent {
    pub fn item_id(&self) -> CatalogItemId {
        match self {
            CatalogEvent::ItemCreated(e) => e.item_id,
            CatalogEvent::StockAdjusted(e) => e.item_id,
            CatalogEvent::PricingUpdated(e) => e.item_id,
        }
    }
}

impl Event for CatalogEvent {
    const AGGREGATE_TYPE: &'static str = "catalog.item";

    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ItemCreated(_) => "catalog.item.created",
            CatalogEvent::StockAdjusted(_) => "catalog.item.stock_adjusted",
            CatalogEvent::PricingUpdated(_) => "catalog.item.pricing_updated",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        self.item_id().0
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ItemCreated(e) => e.occurred_at,
            CatalogEvent::StockAdjusted(e) => e.occurred_at,
            CatalogEvent::PricingUpdated(e) => e.occurred_at,
        }
    }
}
