//! Derived views over the kit store.
//!
//! Nothing here is persisted: allocation, capacity and suggested pricing are
//! recomputed from current store state on every read, so they may lag a
//! concurrent mutation but never drift from it.

use thiserror::Error;

use storefront_core::DomainError;

use crate::store::StoreError;

pub mod catalog;
pub mod kits;

pub use catalog::{CatalogItemView, catalog_view, list_catalog_views};
pub use kits::{KitOverview, KitState, KitSummary, kit_overview, list_kit_summaries, load_kit_state};

#[derive(Debug, Error)]
pub enum ReadModelError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}
