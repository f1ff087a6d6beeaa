//! Product catalog models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductCategory {
    GameTime,
    Merchandise,
    Food,
    Drink,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::GameTime => "gameTime",
            ProductCategory::Merchandise => "merchandise",
            ProductCategory::Food => "food",
            ProductCategory::Drink => "drink",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gameTime" => Some(ProductCategory::GameTime),
            "merchandise" => Some(ProductCategory::Merchandise),
            "food" => Some(ProductCategory::Food),
            "drink" => Some(ProductCategory::Drink),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sellable catalog item. `stock` is None for untracked items
/// (game time has no inventory); `duration_minutes` only applies to
/// gameTime products.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: Option<String>,
    pub stock: Option<i64>,
    pub device_id: Option<String>,
    pub duration_minutes: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Product {
    pub fn category(&self) -> Option<ProductCategory> {
        ProductCategory::parse(&self.category)
    }
}

/// Request to create a product
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    pub category: ProductCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

/// Request to update a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<ProductCategory>,
    pub description: Option<String>,
    pub stock: Option<i64>,
    pub device_id: Option<String>,
    pub duration_minutes: Option<i64>,
}
