use serde::Serialize;

use storefront_catalog::CatalogItem;
use storefront_core::DomainResult;
use storefront_kits::{
    CapacityLine, CapacityReport, CompositionEntry, Kit, KitId, KitPricing, KitStatus, PriceComponent,
    compute_capacity, synthesize,
};

use super::ReadModelError;
use crate::store::{KitStore, StoreError};

/// A kit with its entries and the live catalog rows they point at.
///
/// `items[i]` is the item of `entries[i]`.
#[derive(Debug, Clone)]
pub struct KitState {
    pub kit: Kit,
    pub entries: Vec<CompositionEntry>,
    pub items: Vec<CatalogItem>,
}

impl KitState {
    pub fn lines(&self) -> Vec<CapacityLine<'_>> {
        self.entries
            .iter()
            .zip(&self.items)
            .map(|(entry, item)| CapacityLine { entry, item })
            .collect()
    }

    pub fn price_components(&self) -> Vec<PriceComponent> {
        self.entries
            .iter()
            .zip(&self.items)
            .map(|(entry, item)| PriceComponent::of(entry, item))
            .collect()
    }

    pub fn status(&self) -> KitStatus {
        self.kit.status(self.entries.len())
    }

    /// Prices the formula gives for the current components and discount.
    pub fn suggested_pricing(&self) -> DomainResult<KitPricing> {
        synthesize(&self.price_components(), self.kit.discount_percent)
    }

    pub fn overview(&self) -> DomainResult<KitOverview> {
        let capacity = compute_capacity(&self.kit, &self.lines())?;
        let suggested_pricing = self.suggested_pricing()?;
        let pricing_in_sync = suggested_pricing.sell_price == self.kit.sell_price
            && suggested_pricing.alt_sell_price == self.kit.alt_sell_price;
        Ok(KitOverview {
            kit: self.kit.clone(),
            status: self.status(),
            entries: self.entries.clone(),
            capacity,
            suggested_pricing,
            pricing_in_sync,
        })
    }
}

/// Everything an operator needs on one kit's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitOverview {
    pub kit: Kit,
    pub status: KitStatus,
    pub entries: Vec<CompositionEntry>,
    pub capacity: CapacityReport,
    pub suggested_pricing: KitPricing,
    /// False after a manual override or a component price change.
    pub pricing_in_sync: bool,
}

/// Row of the kit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitSummary {
    #[serde(flatten)]
    pub kit: Kit,
    pub status: KitStatus,
    pub component_count: usize,
}

pub async fn load_kit_state<S>(store: &S, kit_id: KitId) -> Result<Option<KitState>, ReadModelError>
where
    S: KitStore + ?Sized,
{
    let Some(kit) = store.get_kit(kit_id).await? else {
        return Ok(None);
    };
    let entries = store.entries_for_kit(kit_id).await?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in &entries {
        let item = store.get_item(entry.catalog_item_id).await?.ok_or_else(|| {
            StoreError::Backend(format!(
                "entry {} references missing item {}",
                entry.id, entry.catalog_item_id
            ))
        })?;
        items.push(item);
    }

    Ok(Some(KitState { kit, entries, items }))
}

pub async fn kit_overview<S>(store: &S, kit_id: KitId) -> Result<Option<KitOverview>, ReadModelError>
where
    S: KitStore + ?Sized,
{
    match load_kit_state(store, kit_id).await? {
        Some(state) => Ok(Some(state.overview()?)),
        None => Ok(None),
    }
}

pub async fn list_kit_summaries<S>(store: &S) -> Result<Vec<KitSummary>, ReadModelError>
where
    S: KitStore + ?Sized,
{
    let kits = store.list_kits().await?;
    let entries = store.list_entries().await?;

    Ok(kits
        .into_iter()
        .map(|kit| {
            let component_count = entries.iter().filter(|e| e.kit_id == kit.id).count();
            KitSummary {
                status: kit.status(component_count),
                kit,
                component_count,
            }
        })
        .collect())
}
