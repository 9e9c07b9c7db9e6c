use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::CatalogItemId;
use storefront_core::{AggregateId, DomainError, DomainResult, Entity, Money, aggregate_id_newtype};
use storefront_events::Event;

use crate::composition::EntryId;
use crate::pricing::{DiscountPercent, KitPricing};

aggregate_id_newtype!(
    /// Kit identifier.
    KitId,
    "KitId"
);

/// Lifecycle status, derived from the kit record and its component count.
///
/// - `Draft`: no components yet
/// - `Composing`: has components, nothing offered
/// - `Active`: has components and a positive target stock
/// - `Inactive`: switched off by an operator (reservations are kept)
///
/// Deletion removes the record, so there is no status for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KitStatus {
    Draft,
    Composing,
    Active,
    Inactive,
}

/// A sellable bundle.
///
/// `target_stock_quantity` is how many kits are offered. For every component
/// `quantity_per_kit * target_stock_quantity` units are held out of the
/// item's free stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub id: KitId,
    pub name: String,
    pub target_stock_quantity: i64,
    pub sell_price: Money,
    pub alt_sell_price: Money,
    pub discount_percent: DiscountPercent,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Kit {
    pub fn status(&self, component_count: usize) -> KitStatus {
        if component_count == 0 {
            KitStatus::Draft
        } else if !self.active {
            KitStatus::Inactive
        } else if self.target_stock_quantity > 0 {
            KitStatus::Active
        } else {
            KitStatus::Composing
        }
    }

    /// Whether the kit's reservations count as allocated stock.
    pub fn is_offered(&self) -> bool {
        self.active && self.target_stock_quantity > 0
    }

    /// Validate a new target stock level and return the delta to apply.
    ///
    /// A kit without components cannot be offered: raising its target would
    /// reserve nothing.
    pub fn stock_change(&self, new_target: i64, component_count: usize) -> DomainResult<i64> {
        if new_target < 0 {
            return Err(DomainError::validation(format!(
                "target stock cannot be negative, got {new_target}"
            )));
        }
        let delta = new_target - self.target_stock_quantity;
        if delta > 0 && component_count == 0 {
            return Err(DomainError::invariant("cannot raise stock of a kit without components"));
        }
        Ok(delta)
    }

    pub fn apply_pricing(&mut self, pricing: &KitPricing, now: DateTime<Utc>) {
        self.discount_percent = pricing.discount_percent;
        self.sell_price = pricing.sell_price;
        self.alt_sell_price = pricing.alt_sell_price;
        self.updated_at = now;
    }

    pub fn apply_settings(&mut self, settings: &KitSettings, now: DateTime<Utc>) {
        if let Some(name) = &settings.name {
            self.name = name.trim().to_string();
        }
        if let Some(active) = settings.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

impl Entity for Kit {
    const KIND: &'static str = "kit";
    type Id = KitId;

    fn id(&self) -> KitId {
        self.id
    }
}

fn default_active() -> bool {
    true
}

/// Input for creating a kit. Kits start empty with zero target stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKit {
    pub name: String,
    #[serde(default)]
    pub discount_percent: DiscountPercent,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl NewKit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discount_percent: DiscountPercent::NONE,
            active: true,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("kit name cannot be empty"));
        }
        Ok(())
    }

    pub fn into_kit(self, id: KitId, now: DateTime<Utc>) -> Kit {
        Kit {
            id,
            name: self.name.trim().to_string(),
            target_stock_quantity: 0,
            sell_price: Money::ZERO,
            alt_sell_price: Money::ZERO,
            discount_percent: self.discount_percent,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a kit's descriptive settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl KitSettings {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.is_none() && self.active.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("kit name cannot be empty"));
            }
        }
        Ok(())
    }
}

/// How a kit's prices were last set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    /// Derived from component prices and the discount.
    Recomputed,
    /// Set directly by an operator.
    Manual,
}

/// Event: KitCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitCreated {
    pub kit_id: KitId,
    pub name: String,
    pub discount_percent: DiscountPercent,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ComponentAdded (units were reserved when the kit already had stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentAdded {
    pub kit_id: KitId,
    pub entry_id: EntryId,
    pub catalog_item_id: CatalogItemId,
    pub quantity_per_kit: i64,
    pub units_reserved: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ComponentRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRemoved {
    pub kit_id: KitId,
    pub entry_id: EntryId,
    pub catalog_item_id: CatalogItemId,
    pub units_released: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockLevelChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevelChanged {
    pub kit_id: KitId,
    pub previous: i64,
    pub current: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitPricingUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitPricingUpdated {
    pub kit_id: KitId,
    pub discount_percent: DiscountPercent,
    pub sell_price: Money,
    pub alt_sell_price: Money,
    pub source: PricingSource,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitUpdated (name or active flag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitUpdated {
    pub kit_id: KitId,
    pub name: String,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: KitDeleted, with what each component gave back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitDeleted {
    pub kit_id: KitId,
    pub released: Vec<(CatalogItemId, i64)>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KitEvent {
    KitCreated(KitCreated),
    ComponentAdded(ComponentAdded),
    ComponentRemoved(ComponentRemoved),
    StockLevelChanged(StockLevelChanged),
    PricingUpdated(KitPricingUpdated),
    KitUpdated(KitUpdated),
    KitDeleted(KitDeleted),
}

impl KitEvent {
    pub fn kit_id(&self) -> KitId {
        match self {
            KitEvent::KitCreated(e) => e.kit_id,
            KitEvent::ComponentAdded(e) => e.kit_id,
            KitEvent::ComponentRemoved(e) => e.kit_id,
            KitEvent::StockLevelChanged(e) => e.kit_id,
            KitEvent::PricingUpdated(e) => e.kit_id,
            KitEvent::KitUpdated(e) => e.kit_id,
            KitEvent::KitDeleted(e) => e.kit_id,
        }
    }
}

impl Event for KitEvent {
    const AGGREGATE_TYPE: &'static str = "kits.kit";

    fn event_type(&self) -> &'static str {
        match self {
            KitEvent::KitCreated(_) => "kits.kit.created",
            KitEvent::ComponentAdded(_) => "kits.component.added",
            KitEvent::ComponentRemoved(_) => "kits.component.removed",
            KitEvent::StockLevelChanged(_) => "kits.stock.changed",
            KitEvent::PricingUpdated(_) => "kits.pricing.updated",
            KitEvent::KitUpdated(_) => "kits.kit.updated",
            KitEvent::KitDeleted(_) => "kits.kit.deleted",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        self.kit_id().0
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            KitEvent::KitCreated(e) => e.occurred_at,
            KitEvent::ComponentAdded(e) => e.occurred_at,
            KitEvent::ComponentRemoved(e) => e.occurred_at,
            KitEvent::StockLevelChanged(e) => e.occurred_at,
            KitEvent::PricingUpdated(e) => e.occurred_at,
            KitEvent::KitUpdated(e) => e.occurred_at,
            KitEvent::KitDeleted(e) => e.occurred_at,
        }
    }
}
