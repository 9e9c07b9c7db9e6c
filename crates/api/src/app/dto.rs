//! Request bodies and their mapping to domain inputs.
//!
//! Money and percentages arrive as plain decimals and are validated here, so
//! a negative price answers 400 like every other validation failure instead
//! of a body-parse rejection.

use rust_decimal::Decimal;
use serde::Deserialize;

use storefront_catalog::{CatalogItemId, ItemKind, NewCatalogItem};
use storefront_core::{DomainResult, Money};
use storefront_kits::{DiscountPercent, KitSettings, NewKit};

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub initial_stock: i64,
    pub price: Decimal,
    #[serde(default)]
    pub alt_price: Option<Decimal>,
}

impl CreateItemRequest {
    pub fn into_new_item(self, parent_id: Option<CatalogItemId>) -> DomainResult<NewCatalogItem> {
        let kind = match self.kind.as_deref() {
            None => ItemKind::Product,
            Some(raw) => ItemKind::parse(raw)?,
        };
        Ok(NewCatalogItem {
            name: self.name,
            sku: self.sku,
            kind,
            parent_id,
            initial_stock: self.initial_stock,
            price: Money::new(self.price)?,
            alt_price: self.alt_price.map(Money::new).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemPricingRequest {
    pub price: Decimal,
    #[serde(default)]
    pub alt_price: Option<Decimal>,
}

impl UpdateItemPricingRequest {
    pub fn into_prices(self) -> DomainResult<(Money, Option<Money>)> {
        Ok((Money::new(self.price)?, self.alt_price.map(Money::new).transpose()?))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateKitRequest {
    pub name: String,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl CreateKitRequest {
    pub fn into_new_kit(self) -> DomainResult<NewKit> {
        let discount_percent = match self.discount_percent {
            Some(raw) => DiscountPercent::new(raw)?,
            None => DiscountPercent::NONE,
        };
        Ok(NewKit {
            name: self.name,
            discount_percent,
            active: self.active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateKitRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl From<UpdateKitRequest> for KitSettings {
    fn from(value: UpdateKitRequest) -> Self {
        KitSettings {
            name: value.name,
            active: value.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetKitStockRequest {
    pub target_stock_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetDiscountRequest {
    pub discount_percent: Decimal,
}

/// Manual price override. `alt_sell_price` defaults to `sell_price`.
#[derive(Debug, Deserialize)]
pub struct OverridePricingRequest {
    pub sell_price: Decimal,
    #[serde(default)]
    pub alt_sell_price: Option<Decimal>,
}

impl OverridePricingRequest {
    pub fn into_prices(self) -> DomainResult<(Money, Money)> {
        let sell = Money::new(self.sell_price)?;
        let alt = match self.alt_sell_price {
            Some(raw) => Money::new(raw)?,
            None => sell,
        };
        Ok((sell, alt))
    }
}

#[derive(Debug, Deserialize)]
pub struct AddComponentRequest {
    pub catalog_item_id: String,
    pub quantity_per_kit: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Only forward event types starting with this prefix.
    #[serde(default)]
    pub prefix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_request(price: &str) -> CreateItemRequest {
        serde_json::from_value(serde_json::json!({
            "name": "Tent",
            "sku": "TENT-1",
            "initial_stock": 4,
            "price": price,
        }))
        .unwrap()
    }

    #[test]
    fn item_defaults_to_a_product() {
        let item = item_request("12.50").into_new_item(None).unwrap();
        assert_eq!(item.kind, ItemKind::Product);
        assert_eq!(item.initial_stock, 4);
        assert_eq!(item.alt_price, None);
    }

    #[test]
    fn negative_prices_are_domain_errors() {
        assert!(item_request("-1").into_new_item(None).is_err());

        let req = OverridePricingRequest {
            sell_price: Decimal::new(-5, 0),
            alt_sell_price: None,
        };
        assert!(req.into_prices().is_err());
    }

    #[test]
    fn override_alt_price_defaults_to_sell_price() {
        let req = OverridePricingRequest {
            sell_price: Decimal::new(1999, 2),
            alt_sell_price: None,
        };
        let (sell, alt) = req.into_prices().unwrap();
        assert_eq!(sell, alt);
    }

    #[test]
    fn kit_discount_is_range_checked() {
        let req = CreateKitRequest {
            name: "Kit".to_string(),
            discount_percent: Some(Decimal::new(101, 0)),
            active: None,
        };
        assert!(req.into_new_kit().is_err());
    }
}
