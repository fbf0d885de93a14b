//! Rentable products offered in quotes.

use serde::{Deserialize, Serialize};

use eventrent_core::AggregateId;
use eventrent_pricing::{ProductId, QuoteItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Price in cents.
    pub unit_price: u64,
    pub description: String,
}

impl Product {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: u64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId::new(AggregateId::new()),
            sku: sku.into(),
            name: name.into(),
            unit_price,
            description: description.into(),
        }
    }

    /// One unit of this product as a quote line.
    pub fn to_quote_item(&self) -> QuoteItem {
        QuoteItem {
            product_id: Some(self.id),
            description: self.name.clone(),
            quantity: 1,
            unit_price: self.unit_price,
        }
    }
}

/// Read-only product list, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The house catalog.
    pub fn standard() -> Self {
        Self::new(vec![
            Product::new(
                "prod_01",
                "Location Photobooth Classique (4h)",
                450_00,
                "Location de notre photobooth standard pour une durée de 4 heures.",
            ),
            Product::new(
                "prod_02",
                "Livre d'or personnalisé",
                75_00,
                "Un livre d'or de haute qualité pour que les invités collent leurs photos et laissent un message.",
            ),
            // Priced per kilometre; the quantity is the distance.
            Product::new(
                "prod_03",
                "Frais de déplacement",
                50,
                "Frais de déplacement facturés au kilomètre (Ajuster la quantité).",
            ),
            Product::new(
                "prod_04",
                "Accessoires Premium",
                50_00,
                "Collection d'accessoires thématiques de qualité supérieure.",
            ),
        ])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn find_by_sku(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sku == sku)
    }
}
