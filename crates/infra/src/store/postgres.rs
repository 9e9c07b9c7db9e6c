//! Postgres-backed kit store.
//!
//! Stock-moving operations call the stored procedures in
//! `migrations/0001_kit_engine.sql` inside a transaction. The procedures lock
//! the kit row, apply guarded deltas in catalog-item id order and raise a
//! dedicated SQLSTATE on shortage, which aborts the whole transaction.
//!
//! ## Error Mapping
//!
//! | SQLSTATE | StoreError |
//! |----------|------------|
//! | `SK404` | `NotFound` (DETAIL names the record) |
//! | `SK409` | `InsufficientStock` (DETAIL carries the shortage as JSON) |
//! | `SK410` | `CapacityExceeded` (same, plus the kit id) |
//! | `SK422` | `Domain(InvariantViolation)` |
//! | `22023`, `22003`, `23514` | `Domain(Validation)` |
//! | `23505` | `Conflict` |
//! | `23503` | `NotFound` |
//! | anything else | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::postgres::{PgDatabaseError, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use storefront_catalog::{CatalogItem, CatalogItemId, ItemKind};
use storefront_core::{AggregateId, DomainError, Entity, Money};
use storefront_kits::{
    CompositionEntry, DiscountPercent, EntryId, Kit, KitId, KitSettings, PriceComponent, ReservationStep,
    reservation_plan, synthesize,
};

use super::{AddedComponent, DeletedKit, KitStore, RemovedEntry, StockLevelChange, StoreError, StoreResult};
use crate::config::DatabaseConfig;

/// Schema and stored procedures; every statement is idempotent.
pub const SCHEMA: &str = include_str!("../../migrations/0001_kit_engine.sql");

const ITEM_COLUMNS: &str =
    "id, name, sku, kind, parent_id, stock_quantity, price, alt_price, created_at, updated_at";
const KIT_COLUMNS: &str = "id, name, target_stock_quantity, sell_price, alt_sell_price, discount_percent, \
                           active, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, kit_id, catalog_item_id, quantity_per_kit, created_at";

#[derive(Debug, Clone)]
pub struct PostgresKitStore {
    pool: Arc<PgPool>,
}

impl PostgresKitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool from config and apply the schema.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("init_schema", e))?;
        Ok(())
    }

    async fn fetch_kit<'e, E>(executor: E, id: KitId) -> StoreResult<Option<Kit>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query(&format!("SELECT {KIT_COLUMNS} FROM kits WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(executor)
            .await
            .map_err(|e| map_sqlx_error("get_kit", e))?;
        row.as_ref().map(kit_from_row).transpose()
    }

    async fn fetch_kit_entries<'e, E>(executor: E, kit_id: KitId) -> StoreResult<Vec<CompositionEntry>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM kit_components WHERE kit_id = $1 ORDER BY created_at, id"
        ))
        .bind(kit_id.as_uuid())
        .fetch_all(executor)
        .await
        .map_err(|e| map_sqlx_error("entries_for_kit", e))?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn fetch_item<'e, E>(executor: E, id: CatalogItemId) -> StoreResult<Option<CatalogItem>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(executor)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }
}

#[async_trait]
impl KitStore for PostgresKitStore {
    #[instrument(skip(self, item), fields(item_id = %item.id, sku = %item.sku), err)]
    async fn create_item(&self, item: CatalogItem) -> StoreResult<CatalogItem> {
        sqlx::query(
            r#"
            INSERT INTO catalog_items
                (id, name, sku, kind, parent_id, stock_quantity, price, alt_price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.sku)
        .bind(item.kind.as_str())
        .bind(item.parent_id.map(|p| *p.as_uuid()))
        .bind(item.stock_quantity)
        .bind(item.price.amount())
        .bind(item.alt_price.map(|p| p.amount()))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_item", e))?;
        Ok(item)
    }

    async fn get_item(&self, id: CatalogItemId) -> StoreResult<Option<CatalogItem>> {
        Self::fetch_item(&*self.pool, id).await
    }

    async fn list_items(&self) -> StoreResult<Vec<CatalogItem>> {
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM catalog_items ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn update_item_pricing(
        &self,
        id: CatalogItemId,
        price: Money,
        alt_price: Option<Money>,
    ) -> StoreResult<CatalogItem> {
        let row = sqlx::query(&format!(
            "UPDATE catalog_items SET price = $2, alt_price = $3, updated_at = now() \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(price.amount())
        .bind(alt_price.map(|p| p.amount()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item_pricing", e))?
        .ok_or(StoreError::NotFound(CatalogItem::KIND))?;
        item_from_row(&row)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn adjust_stock(&self, id: CatalogItemId, delta: i64) -> StoreResult<CatalogItem> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("adjust_stock", e))?;
        sqlx::query("SELECT adjust_catalog_stock($1, $2)")
            .bind(id.as_uuid())
            .bind(delta)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("adjust_stock", e))?;
        let item = Self::fetch_item(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound(CatalogItem::KIND))?;
        tx.commit().await.map_err(|e| map_sqlx_error("adjust_stock", e))?;
        Ok(item)
    }

    #[instrument(skip(self, kit), fields(kit_id = %kit.id), err)]
    async fn create_kit(&self, kit: Kit) -> StoreResult<Kit> {
        sqlx::query(
            r#"
            INSERT INTO kits
                (id, name, target_stock_quantity, sell_price, alt_sell_price, discount_percent,
                 active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(kit.id.as_uuid())
        .bind(&kit.name)
        .bind(kit.target_stock_quantity)
        .bind(kit.sell_price.amount())
        .bind(kit.alt_sell_price.amount())
        .bind(kit.discount_percent.value())
        .bind(kit.active)
        .bind(kit.created_at)
        .bind(kit.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_kit", e))?;
        Ok(kit)
    }

    async fn get_kit(&self, id: KitId) -> StoreResult<Option<Kit>> {
        Self::fetch_kit(&*self.pool, id).await
    }

    async fn list_kits(&self) -> StoreResult<Vec<Kit>> {
        let rows = sqlx::query(&format!("SELECT {KIT_COLUMNS} FROM kits ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_kits", e))?;
        rows.iter().map(kit_from_row).collect()
    }

    #[instrument(skip(self, settings), fields(kit_id = %id), err)]
    async fn update_kit_settings(&self, id: KitId, settings: &KitSettings) -> StoreResult<Kit> {
        let row = sqlx::query(&format!(
            "UPDATE kits SET name = COALESCE($2, name), active = COALESCE($3, active), updated_at = now() \
             WHERE id = $1 RETURNING {KIT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(settings.name.as_deref().map(str::trim))
        .bind(settings.active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_kit_settings", e))?
        .ok_or(StoreError::NotFound(Kit::KIND))?;
        kit_from_row(&row)
    }

    #[instrument(skip(self), fields(kit_id = %id), err)]
    async fn override_kit_pricing(&self, id: KitId, sell_price: Money, alt_sell_price: Money) -> StoreResult<Kit> {
        let row = sqlx::query(&format!(
            "UPDATE kits SET sell_price = $2, alt_sell_price = $3, updated_at = now() \
             WHERE id = $1 RETURNING {KIT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(sell_price.amount())
        .bind(alt_sell_price.amount())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("override_kit_pricing", e))?
        .ok_or(StoreError::NotFound(Kit::KIND))?;
        kit_from_row(&row)
    }

    #[instrument(skip(self), fields(kit_id = %id), err)]
    async fn reprice_kit(&self, id: KitId, discount: Option<DiscountPercent>) -> StoreResult<Kit> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("reprice_kit", e))?;

        // Component changes lock the kit row first, so the entries read
        // below cannot move until commit.
        let current: Decimal = sqlx::query_scalar("SELECT discount_percent FROM kits WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reprice_kit", e))?
            .ok_or(StoreError::NotFound(Kit::KIND))?;
        let discount = match discount {
            Some(discount) => discount,
            None => DiscountPercent::new(current).map_err(|e| StoreError::Backend(e.to_string()))?,
        };

        let components = sqlx::query(
            "SELECT c.quantity_per_kit, i.price, i.alt_price \
             FROM kit_components c JOIN catalog_items i ON i.id = c.catalog_item_id \
             WHERE c.kit_id = $1 ORDER BY c.created_at, c.id",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("reprice_kit", e))?
        .iter()
        .map(|row| {
            let alt_price: Option<Decimal> = get(row, "alt_price")?;
            Ok(PriceComponent {
                price: money(get(row, "price")?)?,
                alt_price: alt_price.map(money).transpose()?,
                quantity_per_kit: get(row, "quantity_per_kit")?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;
        let pricing = synthesize(&components, discount)?;

        let row = sqlx::query(&format!(
            "UPDATE kits SET discount_percent = $2, sell_price = $3, alt_sell_price = $4, updated_at = now() \
             WHERE id = $1 RETURNING {KIT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(pricing.discount_percent.value())
        .bind(pricing.sell_price.amount())
        .bind(pricing.alt_sell_price.amount())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("reprice_kit", e))?;
        let kit = kit_from_row(&row)?;

        tx.commit().await.map_err(|e| map_sqlx_error("reprice_kit", e))?;
        Ok(kit)
    }

    async fn entries_for_kit(&self, kit_id: KitId) -> StoreResult<Vec<CompositionEntry>> {
        Self::fetch_kit_entries(&*self.pool, kit_id).await
    }

    async fn list_entries(&self) -> StoreResult<Vec<CompositionEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM kit_components ORDER BY created_at, id"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_entries", e))?;
        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(
        skip(self, entry),
        fields(kit_id = %entry.kit_id, item_id = %entry.catalog_item_id, quantity_per_kit = entry.quantity_per_kit),
        err
    )]
    async fn add_item_to_kit_and_lock_stock(&self, entry: CompositionEntry) -> StoreResult<AddedComponent> {
        let units_reserved: i64 = sqlx::query_scalar("SELECT add_item_to_kit_and_lock_stock($1, $2, $3, $4, $5)")
            .bind(entry.id.as_uuid())
            .bind(entry.kit_id.as_uuid())
            .bind(entry.catalog_item_id.as_uuid())
            .bind(entry.quantity_per_kit)
            .bind(entry.created_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_item_to_kit_and_lock_stock", e))?;
        Ok(AddedComponent { entry, units_reserved })
    }

    #[instrument(skip(self), fields(entry_id = %entry_id), err)]
    async fn remove_item_from_kit_and_unlock_stock(&self, entry_id: EntryId) -> StoreResult<Option<RemovedEntry>> {
        let row = sqlx::query(
            "SELECT o_kit_id, o_catalog_item_id, o_quantity_per_kit, o_created_at, o_units_released \
             FROM remove_item_from_kit_and_unlock_stock($1)",
        )
        .bind(entry_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_item_from_kit_and_unlock_stock", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let entry = CompositionEntry {
            id: entry_id,
            kit_id: KitId::new(AggregateId::from_uuid(get(&row, "o_kit_id")?)),
            catalog_item_id: CatalogItemId::new(AggregateId::from_uuid(get(&row, "o_catalog_item_id")?)),
            quantity_per_kit: get(&row, "o_quantity_per_kit")?,
            created_at: get(&row, "o_created_at")?,
        };
        Ok(Some(RemovedEntry {
            entry,
            units_released: get(&row, "o_units_released")?,
        }))
    }

    #[instrument(skip(self), fields(kit_id = %kit_id), err)]
    async fn update_kit_stock_level(&self, kit_id: KitId, new_target: i64) -> StoreResult<StockLevelChange> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_kit_stock_level", e))?;

        let previous: i64 = sqlx::query_scalar("SELECT update_kit_stock_level($1, $2)")
            .bind(kit_id.as_uuid())
            .bind(new_target)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_kit_stock_level", e))?;

        let kit = Self::fetch_kit(&mut *tx, kit_id).await?.ok_or(StoreError::NotFound(Kit::KIND))?;
        let steps = if new_target == previous {
            Vec::new()
        } else {
            let entries = Self::fetch_kit_entries(&mut *tx, kit_id).await?;
            reservation_plan(&entries, new_target - previous)?
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_kit_stock_level", e))?;
        Ok(StockLevelChange { kit, previous, steps })
    }

    #[instrument(skip(self), fields(kit_id = %kit_id), err)]
    async fn delete_kit_and_release_stock(&self, kit_id: KitId) -> StoreResult<Option<DeletedKit>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_kit_and_release_stock", e))?;

        let row = sqlx::query(&format!("SELECT {KIT_COLUMNS} FROM kits WHERE id = $1 FOR UPDATE"))
            .bind(kit_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_kit_and_release_stock", e))?;
        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("delete_kit_and_release_stock", e))?;
            return Ok(None);
        };
        let kit = kit_from_row(&row)?;
        let entries = Self::fetch_kit_entries(&mut *tx, kit_id).await?;

        let released = sqlx::query(
            "SELECT o_catalog_item_id, o_units_released FROM delete_kit_and_release_stock($1)",
        )
        .bind(kit_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_kit_and_release_stock", e))?
        .iter()
        .map(|row| {
            Ok(ReservationStep {
                catalog_item_id: CatalogItemId::new(AggregateId::from_uuid(get(row, "o_catalog_item_id")?)),
                units: get(row, "o_units_released")?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("delete_kit_and_release_stock", e))?;
        Ok(Some(DeletedKit { kit, entries, released }))
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to decode column {column}: {e}")))
}

fn money(amount: Decimal) -> StoreResult<Money> {
    Money::new(amount).map_err(|e| StoreError::Backend(format!("stored amount is invalid: {e}")))
}

fn item_from_row(row: &PgRow) -> StoreResult<CatalogItem> {
    let kind: String = get(row, "kind")?;
    let parent_id: Option<Uuid> = get(row, "parent_id")?;
    let alt_price: Option<Decimal> = get(row, "alt_price")?;
    Ok(CatalogItem {
        id: CatalogItemId::new(AggregateId::from_uuid(get(row, "id")?)),
        name: get(row, "name")?,
        sku: get(row, "sku")?,
        kind: ItemKind::parse(&kind).map_err(|e| StoreError::Backend(e.to_string()))?,
        parent_id: parent_id.map(|p| CatalogItemId::new(AggregateId::from_uuid(p))),
        stock_quantity: get(row, "stock_quantity")?,
        price: money(get(row, "price")?)?,
        alt_price: alt_price.map(money).transpose()?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn kit_from_row(row: &PgRow) -> StoreResult<Kit> {
    let discount: Decimal = get(row, "discount_percent")?;
    Ok(Kit {
        id: KitId::new(AggregateId::from_uuid(get(row, "id")?)),
        name: get(row, "name")?,
        target_stock_quantity: get(row, "target_stock_quantity")?,
        sell_price: money(get(row, "sell_price")?)?,
        alt_sell_price: money(get(row, "alt_sell_price")?)?,
        discount_percent: DiscountPercent::new(discount).map_err(|e| StoreError::Backend(e.to_string()))?,
        active: get(row, "active")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> StoreResult<CompositionEntry> {
    let created_at: DateTime<Utc> = get(row, "created_at")?;
    Ok(CompositionEntry {
        id: EntryId::new(AggregateId::from_uuid(get(row, "id")?)),
        kit_id: KitId::new(AggregateId::from_uuid(get(row, "kit_id")?)),
        catalog_item_id: CatalogItemId::new(AggregateId::from_uuid(get(row, "catalog_item_id")?)),
        quantity_per_kit: get(row, "quantity_per_kit")?,
        created_at,
    })
}

/// Shortage report raised by `take_catalog_stock` in the error DETAIL.
#[derive(Debug, Deserialize)]
struct Shortage {
    #[serde(default)]
    kit_id: Option<Uuid>,
    item_id: Uuid,
    requested: i64,
    available: i64,
}

/// The procedures put the missing record's kind in DETAIL.
fn not_found_kind(detail: Option<&str>) -> &'static str {
    [Kit::KIND, CatalogItem::KIND, CompositionEntry::KIND]
        .into_iter()
        .find(|kind| detail == Some(*kind))
        .unwrap_or("record")
}

/// Map SQLx errors into the store's error model.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            let detail = db_err.try_downcast_ref::<PgDatabaseError>().and_then(|pg| pg.detail());

            let Some(code) = db_err.code() else {
                tracing::error!(%msg, "store failure");
                return StoreError::Backend(msg);
            };
            match code.as_ref() {
                "SK404" => StoreError::NotFound(not_found_kind(detail)),
                "SK409" | "SK410" => match detail.and_then(|d| serde_json::from_str::<Shortage>(d).ok()) {
                    Some(Shortage {
                        kit_id: Some(kit_id),
                        item_id,
                        requested,
                        available,
                    }) if code.as_ref() == "SK410" => StoreError::CapacityExceeded {
                        kit_id: KitId::new(AggregateId::from_uuid(kit_id)),
                        item_id: CatalogItemId::new(AggregateId::from_uuid(item_id)),
                        requested,
                        available,
                    },
                    Some(s) => StoreError::InsufficientStock {
                        item_id: CatalogItemId::new(AggregateId::from_uuid(s.item_id)),
                        requested: s.requested,
                        available: s.available,
                    },
                    None => StoreError::Backend(format!("{msg} (unreadable shortage detail)")),
                },
                "SK422" => StoreError::Domain(DomainError::invariant(db_err.message())),
                "22023" | "23514" => StoreError::Domain(DomainError::validation(db_err.message())),
                "22003" => StoreError::Domain(DomainError::validation("reservation size overflows")),
                "23505" => StoreError::Conflict(msg),
                "23503" => StoreError::NotFound("referenced record"),
                _ => {
                    tracing::error!(%msg, code = %code, "store failure");
                    StoreError::Backend(msg)
                }
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {operation}")),
        other => {
            tracing::error!(operation, error = %other, "store failure");
            StoreError::Backend(format!("sqlx error in {operation}: {other}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortage_detail_parses() {
        let s: Shortage = serde_json::from_str(
            r#"{"kit_id":"0191d7c4-7a9e-7cc0-8000-000000000001","item_id":"0191d7c4-7a9e-7cc0-8000-000000000002","requested":12,"available":5}"#,
        )
        .unwrap();
        assert!(s.kit_id.is_some());
        assert_eq!(s.requested, 12);
        assert_eq!(s.available, 5);

        let s: Shortage = serde_json::from_str(
            r#"{"item_id":"0191d7c4-7a9e-7cc0-8000-000000000002","requested":1,"available":0}"#,
        )
        .unwrap();
        assert!(s.kit_id.is_none());
    }

    #[test]
    fn not_found_details_map_to_record_kinds() {
        assert_eq!(not_found_kind(Some("kit")), "kit");
        assert_eq!(not_found_kind(Some("catalog item")), "catalog item");
        assert_eq!(not_found_kind(Some("composition entry")), "composition entry");
        assert_eq!(not_found_kind(Some("warehouse")), "record");
        assert_eq!(not_found_kind(None), "record");
    }

    #[test]
    fn schema_defines_every_procedure() {
        for name in [
            "add_item_to_kit_and_lock_stock",
            "remove_item_from_kit_and_unlock_stock",
            "update_kit_stock_level",
            "delete_kit_and_release_stock",
            "adjust_catalog_stock",
        ] {
            assert!(SCHEMA.contains(&format!("FUNCTION {name}(")), "missing {name}");
        }
    }
}
