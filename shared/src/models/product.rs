use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product as seen by the order engine
///
/// The catalog is owned elsewhere; the engine only reads `price`/`name`/`image`
/// and moves `stock` up or down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    /// Available quantity
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal, stock: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
            image: None,
        }
    }
}
