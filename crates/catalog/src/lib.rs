//! Catalog domain module.
//!
//! Sellable catalog items (base products and their variants) with the stock and
//! price figures the kit engine consumes. Pure domain logic: no IO, no storage.

pub mod item;

pub use item::{
    CatalogEvent, CatalogItem, CatalogItemId, ItemCreated, ItemKind, ItemPricingUpdated, NewCatalogItem,
    StockAdjusted,
};
