//! Product Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stock at or above this level is labelled `available`.
pub const LIMITED_STOCK_THRESHOLD: i64 = 500;

/// Produce category
///
/// The legacy plural spellings (`fruits`, `legumes`, `herbes`) are accepted
/// on input so older catalog files keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum Category {
    #[serde(alias = "fruits")]
    Fruit,
    #[serde(alias = "legumes", alias = "vegetables")]
    Vegetable,
    #[serde(alias = "herbes", alias = "herbs")]
    Herb,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fruit => "fruit",
            Category::Vegetable => "vegetable",
            Category::Herb => "herb",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fruit" | "fruits" => Ok(Category::Fruit),
            "vegetable" | "vegetables" | "legumes" => Ok(Category::Vegetable),
            "herb" | "herbs" | "herbes" => Ok(Category::Herb),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Stock label shown in the storefront, always derived from `stock`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "kebab-case"))]
pub enum Availability {
    Available,
    Limited,
    OutOfStock,
}

impl Availability {
    /// Derive the label from a stock level.
    ///
    /// Negative stock never reaches storage; it is treated as sold out.
    pub fn from_stock(stock: i64) -> Self {
        if stock <= 0 {
            Availability::OutOfStock
        } else if stock < LIMITED_STOCK_THRESHOLD {
            Availability::Limited
        } else {
            Availability::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Limited => "limited",
            Availability::OutOfStock => "out-of-stock",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "available" => Ok(Availability::Available),
            "limited" => Ok(Availability::Limited),
            "out-of-stock" => Ok(Availability::OutOfStock),
            other => Err(format!("unknown availability: {other}")),
        }
    }
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: Category,
    /// Unit price, two decimals
    pub price: f64,
    pub description: Option<String>,
    /// Short emoji/icon shown next to the name
    pub icon: String,
    pub stock: i64,
    pub availability: Availability,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create/replace product payload (POST and PUT)
///
/// Availability is never accepted from clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: Category,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub stock: i64,
}

/// Stock-only update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdate {
    pub stock: i64,
}

/// Listing filters for `GET /api/products`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    /// A category name, or `all` for no filter
    pub category: Option<String>,
    pub availability: Option<String>,
}
