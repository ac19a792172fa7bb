use crate::core::errors::MessmateError;
use crate::core::models::{
    audit::GroupAudit,
    group::Group,
    period::Period,
    transaction::{Transaction, TransactionHistory},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Persistence seam for the ledger core. Aggregate queries are computed by
/// the backend (grouped/summed, never row-by-row in the service), and every
/// transaction mutation takes its audit row so both land in one atomic unit.
#[async_trait]
pub trait Storage: Send + Sync {
    // groups
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, MessmateError>;
    async fn save_group(&self, group: Group) -> Result<(), MessmateError>;
    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), MessmateError>;
    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, MessmateError>;

    // periods; insert_period rejects a second non-deleted ACTIVE period for
    // the same group atomically (the unique-constraint analogue)
    async fn insert_period(&self, period: Period) -> Result<Period, MessmateError>;
    async fn save_period(&self, period: Period) -> Result<(), MessmateError>;
    async fn get_period(&self, period_id: &str) -> Result<Option<Period>, MessmateError>;
    async fn find_active_period(&self, group_id: &str) -> Result<Option<Period>, MessmateError>;
    async fn find_period_by_name(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<Option<Period>, MessmateError>;
    async fn find_overlapping_period(
        &self,
        group_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_period_id: Option<&str>,
    ) -> Result<Option<Period>, MessmateError>;
    async fn list_periods(&self, group_id: &str) -> Result<Vec<Period>, MessmateError>;
    async fn latest_ended_period(&self, group_id: &str) -> Result<Option<Period>, MessmateError>;
    async fn reassign_period_records(
        &self,
        group_id: &str,
        from_period_id: &str,
        to_period_id: &str,
    ) -> Result<u64, MessmateError>;

    // transactions, each mutation paired with its history row
    async fn insert_transaction(
        &self,
        transaction: Transaction,
        history: TransactionHistory,
    ) -> Result<Transaction, MessmateError>;
    async fn update_transaction(
        &self,
        transaction: Transaction,
        history: TransactionHistory,
    ) -> Result<Transaction, MessmateError>;
    async fn delete_transaction(
        &self,
        transaction_id: &str,
        history: TransactionHistory,
    ) -> Result<(), MessmateError>;
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, MessmateError>;
    async fn list_transactions(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<Vec<Transaction>, MessmateError>;
    async fn transaction_history(
        &self,
        group_id: &str,
        transaction_id: &str,
    ) -> Result<Vec<TransactionHistory>, MessmateError>;

    // aggregates
    async fn sum_transactions_for_target(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError>;
    async fn sum_self_deposits(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError>;
    async fn grouped_transaction_sums(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<HashMap<String, f64>, MessmateError>;
    async fn sum_expenses(&self, group_id: &str, period_id: &str) -> Result<f64, MessmateError>;
    async fn sum_shopping(&self, group_id: &str, period_id: &str) -> Result<f64, MessmateError>;
    async fn sum_shopping_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError>;
    async fn sum_payments(&self, group_id: &str, period_id: &str) -> Result<f64, MessmateError>;
    async fn sum_payments_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError>;
    async fn count_meals(&self, group_id: &str, period_id: &str) -> Result<u64, MessmateError>;
    async fn count_meals_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<u64, MessmateError>;
    async fn grouped_meal_counts(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<HashMap<String, u64>, MessmateError>;
    async fn count_market_dates_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<u64, MessmateError>;
}

pub mod in_memory;
