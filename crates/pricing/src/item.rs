use serde::{Deserialize, Serialize};

use eventrent_core::{AggregateId, ValueObject};

/// Catalog product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One quote line. `product_id` is set when the line was picked from the
/// catalog, `None` for a custom line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl QuoteItem {
    pub fn custom(description: impl Into<String>, quantity: u32, unit_price: u64) -> Self {
        Self {
            product_id: None,
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> u128 {
        self.quantity as u128 * self.unit_price as u128
    }
}

impl ValueObject for QuoteItem {}
