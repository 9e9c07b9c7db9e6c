use serde::Serialize;

use storefront_catalog::{CatalogItem, CatalogItemId};
use storefront_kits::{ItemAllocation, KitAllocation, allocate, reserved_units_by_item};

use super::ReadModelError;
use crate::store::KitStore;

/// A catalog item as operators see it: free stock next to what kits hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItemView {
    #[serde(flatten)]
    pub item: CatalogItem,
    /// Units committed to active kits with stock on offer.
    pub allocated_in_kits: i64,
    /// Units held by any kit, including inactive ones.
    pub reserved_in_kits: i64,
    /// Free plus reserved stock.
    pub total_stock: i64,
    pub kits: Vec<KitAllocation>,
}

impl CatalogItemView {
    pub fn build(item: CatalogItem, allocation: Option<&ItemAllocation>, reserved: i64) -> Self {
        let (allocated_in_kits, kits) = allocation
            .map(|a| (a.allocated_in_kits, a.kits.clone()))
            .unwrap_or_default();
        Self {
            total_stock: item.stock_quantity.saturating_add(reserved),
            item,
            allocated_in_kits,
            reserved_in_kits: reserved,
            kits,
        }
    }
}

pub async fn list_catalog_views<S>(store: &S) -> Result<Vec<CatalogItemView>, ReadModelError>
where
    S: KitStore + ?Sized,
{
    let items = store.list_items().await?;
    let kits = store.list_kits().await?;
    let entries = store.list_entries().await?;

    let allocation = allocate(&kits, &entries)?;
    let reserved = reserved_units_by_item(&kits, &entries)?;

    Ok(items
        .into_iter()
        .map(|item| {
            let held = reserved.get(&item.id).copied().unwrap_or(0);
            let alloc = allocation.get(&item.id);
            CatalogItemView::build(item, alloc, held)
        })
        .collect())
}

pub async fn catalog_view<S>(store: &S, id: CatalogItemId) -> Result<Option<CatalogItemView>, ReadModelError>
where
    S: KitStore + ?Sized,
{
    let Some(item) = store.get_item(id).await? else {
        return Ok(None);
    };
    let kits = store.list_kits().await?;
    let entries: Vec<_> = store
        .list_entries()
        .await?
        .into_iter()
        .filter(|e| e.catalog_item_id == id)
        .collect();

    let allocation = allocate(&kits, &entries)?;
    let reserved = reserved_units_by_item(&kits, &entries)?;
    let held = reserved.get(&id).copied().unwrap_or(0);
    Ok(Some(CatalogItemView::build(item, allocation.get(&id), held)))
}
