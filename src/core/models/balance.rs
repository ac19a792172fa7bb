//! Derived aggregates. Nothing here is stored; every figure is recomputed
//! from the source records scoped to a period.

use super::group::Role;
use super::user::User;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MealRateInfo {
    pub meal_rate: f64,
    pub total_meals: u64,
    pub total_expenses: f64,
}

impl MealRateInfo {
    /// Rate is zero when no meals are recorded, regardless of expenses.
    pub fn from_totals(total_expenses: f64, total_meals: u64) -> Self {
        let meal_rate = if total_meals == 0 {
            0.0
        } else {
            total_expenses / total_meals as f64
        };
        MealRateInfo {
            meal_rate,
            total_meals,
            total_expenses,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AvailableBalance {
    pub available_balance: f64,
    pub total_spent: f64,
    pub meal_count: u64,
    pub meal_rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberBalance {
    pub user: User,
    pub role: Role,
    pub balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<AvailableBalance>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupBalanceSummary {
    pub group_id: String,
    pub period_id: Option<String>,
    pub members: Vec<MemberBalance>,
    pub total_balance: f64,
    pub total_expenses: f64,
    pub net_balance: f64,
    pub meal_rate: f64,
    pub total_meals: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: super::period::Period,
    pub total_meals: u64,
    pub total_expenses: f64,
    pub total_shopping: f64,
    pub total_payments: f64,
    pub total_balance: f64,
    pub net_balance: f64,
    pub meal_rate: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UserContribution {
    pub shopping_total: f64,
    pub payment_total: f64,
    pub market_days: u64,
}
