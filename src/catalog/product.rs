//! Product entity.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Store-assigned product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog product.
///
/// `id` is `None` until the store assigns one on the first save and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<ProductId>,
    pub name: String,
    /// Eight-digit tariff classification code, unique across the catalog.
    pub tariff_code: String,
    pub tariff_description: Option<String>,
    /// Rendered as a JSON number, like the request payload.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
}

impl Product {
    /// Build a product that has not been stored yet.
    pub fn new(
        name: impl Into<String>,
        tariff_code: impl Into<String>,
        price: Decimal,
        quantity: i32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            tariff_code: tariff_code.into(),
            tariff_description: None,
            price,
            quantity,
        }
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }
}
