//! Chat channel models (orders taken through the Discord bot)
//!
//! The chat channel keeps its own accounts and order ledger; it sells at a
//! flat unit price and never reserves catalog stock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flat unit price for every chat-channel product
pub const CHAT_UNIT_PRICE: i64 = 20;

/// Delivery zone with its flat delivery fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum DeliveryZone {
    Paleto,
    Sandy,
    SanAndreas,
}

impl DeliveryZone {
    pub const ALL: [DeliveryZone; 3] = [
        DeliveryZone::Paleto,
        DeliveryZone::Sandy,
        DeliveryZone::SanAndreas,
    ];

    pub fn delivery_cost(&self) -> i64 {
        match self {
            DeliveryZone::Paleto => 500,
            DeliveryZone::Sandy => 1500,
            DeliveryZone::SanAndreas => 2500,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryZone::Paleto => "Paleto",
            DeliveryZone::Sandy => "Sandy",
            DeliveryZone::SanAndreas => "San Andreas",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryZone::Paleto => "paleto",
            DeliveryZone::Sandy => "sandy",
            DeliveryZone::SanAndreas => "san_andreas",
        }
    }
}

impl fmt::Display for DeliveryZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryZone::ALL
            .into_iter()
            .find(|z| z.as_str() == s.trim())
            .ok_or_else(|| format!("unknown delivery zone: {s}"))
    }
}

/// Account created through the chat channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatAccount {
    pub id: i64,
    pub discord_id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

/// Sign-in with the temporary password issued by `/create-account`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLoginRequest {
    pub email: String,
    pub password: String,
}

/// Order recorded by the chat channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatOrder {
    pub id: i64,
    pub account_id: i64,
    pub discord_id: String,
    /// The product list as typed by the member
    pub products: String,
    pub unit_count: i64,
    pub products_total: f64,
    pub delivery_zone: DeliveryZone,
    pub delivery_cost: f64,
    pub total_amount: f64,
    pub delivery_address: String,
    pub status: String,
    pub created_at: i64,
}
