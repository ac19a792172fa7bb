//! Financial source records owned by sibling subsystems. The ledger core
//! only reads aggregates over them, and reassigns them wholesale when a
//! period is restarted with its data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: String,
    pub group_id: String,
    pub period_id: String,
    pub user_id: String,
    pub count: u64,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuestMealEntry {
    pub id: String,
    pub group_id: String,
    pub period_id: String,
    pub host_user_id: String,
    pub count: u64,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub group_id: String,
    pub period_id: String,
    pub purchased_by: String,
    pub description: Option<String>,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtraExpense {
    pub id: String,
    pub group_id: String,
    pub period_id: String,
    pub created_by: String,
    pub description: Option<String>,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub group_id: String,
    pub period_id: String,
    pub user_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketDate {
    pub id: String,
    pub group_id: String,
    pub period_id: String,
    pub user_id: String,
    pub date: DateTime<Utc>,
}
