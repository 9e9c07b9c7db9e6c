//! Kit price synthesis.
//!
//! A kit's sell price is the sum of its components' prices (each times its
//! quantity per kit) with the kit discount applied, rounded half-up to two
//! decimals. The same is done independently for the alternate price.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_catalog::CatalogItem;
use storefront_core::{DomainError, DomainResult, Money};

use crate::composition::CompositionEntry;

/// Discount percentage, within `0..=100`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountPercent(Decimal);

impl DiscountPercent {
    pub const NONE: DiscountPercent = DiscountPercent(Decimal::ZERO);

    pub fn new(percent: Decimal) -> DomainResult<Self> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(format!(
                "discount must be between 0 and 100, got {percent}"
            )));
        }
        Ok(Self(percent))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for DiscountPercent {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        DiscountPercent::new(value)
    }
}

impl From<DiscountPercent> for Decimal {
    fn from(value: DiscountPercent) -> Self {
        value.0
    }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Price inputs of one composition entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PriceComponent {
    pub price: Money,
    /// Alternate price; the regular price is used when unset.
    pub alt_price: Option<Money>,
    pub quantity_per_kit: i64,
}

impl PriceComponent {
    /// Price inputs of `entry`, read from its current catalog row.
    pub fn of(entry: &CompositionEntry, item: &CatalogItem) -> Self {
        Self {
            price: item.price,
            alt_price: item.alt_price,
            quantity_per_kit: entry.quantity_per_kit,
        }
    }
}

/// Result of price synthesis for one kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitPricing {
    pub discount_percent: DiscountPercent,
    pub total_base_price: Money,
    pub total_base_alt_price: Money,
    pub sell_price: Money,
    pub alt_sell_price: Money,
}

/// `round2(total * (1 - discount / 100))`.
pub fn apply_discount(total: Money, discount: DiscountPercent) -> DomainResult<Money> {
    let kept = Decimal::ONE_HUNDRED - discount.value();
    let discounted = total
        .amount()
        .checked_mul(kept)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| DomainError::validation("price overflow"))?;
    Ok(Money::new(discounted)?.round2())
}

/// Compute base totals and discounted sell prices for a set of components.
///
/// An empty set yields zero prices.
pub fn synthesize(components: &[PriceComponent], discount: DiscountPercent) -> DomainResult<KitPricing> {
    let mut total_base_price = Money::ZERO;
    let mut total_base_alt_price = Money::ZERO;

    for c in components {
        if c.quantity_per_kit < 1 {
            return Err(DomainError::invariant(format!(
                "quantity per kit must be positive, got {}",
                c.quantity_per_kit
            )));
        }
        let alt = c.alt_price.unwrap_or(c.price);
        total_base_price = total_base_price.checked_add(c.price.times(c.quantity_per_kit)?)?;
        total_base_alt_price = total_base_alt_price.checked_add(alt.times(c.quantity_per_kit)?)?;
    }

    Ok(KitPricing {
        discount_percent: discount,
        total_base_price,
        total_base_alt_price,
        sell_price: apply_discount(total_base_price, discount)?,
        alt_sell_price: apply_discount(total_base_alt_price, discount)?,
    })
}
