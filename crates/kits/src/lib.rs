//! Kit/bundle domain module.
//!
//! A kit is a sellable bundle assembled from catalog items in fixed quantities.
//! This crate holds the pure parts of the engine:
//!
//! - `kit` / `composition`: the records and their validation
//! - `capacity`: how many more kits current free stock can back
//! - `pricing`: sell prices derived from component prices and a discount
//! - `allocation`: units committed to kits, per catalog item
//!
//! Nothing here performs IO; stores and the reservation coordinator live in
//! `storefront-infra`.

pub mod allocation;
pub mod capacity;
pub mod composition;
pub mod kit;
pub mod pricing;

pub use allocation::{ItemAllocation, KitAllocation, allocate, reserved_units_by_item};
pub use capacity::{CapacityLine, CapacityReport, EntryCapacity, compute_capacity, per_item_capacity};
pub use composition::{
    CompositionEntry, EntryId, ReservationStep, ensure_not_duplicate, reservation_plan, reserved_units,
    validate_quantity_per_kit,
};
pub use kit::{
    ComponentAdded, ComponentRemoved, Kit, KitCreated, KitDeleted, KitEvent, KitId, KitPricingUpdated,
    KitSettings, KitStatus, KitUpdated, NewKit, PricingSource, StockLevelChanged,
};
pub use pricing::{DiscountPercent, KitPricing, PriceComponent, apply_discount, synthesize};
