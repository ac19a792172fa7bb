use crate::core::errors::MessmateError;
use crate::core::models::{
    audit::GroupAudit,
    group::Group,
    period::{Period, PeriodStatus},
    records::{ExtraExpense, GuestMealEntry, MarketDate, MealEntry, Payment, ShoppingItem},
    transaction::{Transaction, TransactionHistory},
};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    groups: Arc<RwLock<HashMap<String, Group>>>,
    periods: Arc<RwLock<HashMap<String, Period>>>,
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    history: Arc<RwLock<Vec<TransactionHistory>>>,
    meals: Arc<RwLock<Vec<MealEntry>>>,
    guest_meals: Arc<RwLock<Vec<GuestMealEntry>>>,
    shopping_items: Arc<RwLock<Vec<ShoppingItem>>>,
    expenses: Arc<RwLock<Vec<ExtraExpense>>>,
    payments: Arc<RwLock<Vec<Payment>>>,
    market_dates: Arc<RwLock<Vec<MarketDate>>>,
    group_audits: Arc<RwLock<HashMap<String, Vec<GroupAudit>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for the sibling-owned source records. Not part of the
    // `Storage` trait: the core only reads aggregates over these.

    pub async fn add_meal(&self, group_id: &str, period_id: &str, user_id: &str, count: u64) {
        let mut meals = self.meals.write().await;
        meals.push(MealEntry {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id: period_id.to_string(),
            user_id: user_id.to_string(),
            count,
            date: Utc::now(),
        });
    }

    pub async fn add_guest_meal(
        &self,
        group_id: &str,
        period_id: &str,
        host_user_id: &str,
        count: u64,
    ) {
        let mut guest_meals = self.guest_meals.write().await;
        guest_meals.push(GuestMealEntry {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id: period_id.to_string(),
            host_user_id: host_user_id.to_string(),
            count,
            date: Utc::now(),
        });
    }

    pub async fn add_shopping_item(
        &self,
        group_id: &str,
        period_id: &str,
        purchased_by: &str,
        amount: f64,
    ) {
        let mut shopping_items = self.shopping_items.write().await;
        shopping_items.push(ShoppingItem {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id: period_id.to_string(),
            purchased_by: purchased_by.to_string(),
            description: None,
            amount,
            date: Utc::now(),
        });
    }

    pub async fn add_expense(
        &self,
        group_id: &str,
        period_id: &str,
        created_by: &str,
        amount: f64,
    ) {
        let mut expenses = self.expenses.write().await;
        expenses.push(ExtraExpense {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id: period_id.to_string(),
            created_by: created_by.to_string(),
            description: None,
            amount,
            date: Utc::now(),
        });
    }

    pub async fn add_payment(&self, group_id: &str, period_id: &str, user_id: &str, amount: f64) {
        let mut payments = self.payments.write().await;
        payments.push(Payment {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id: period_id.to_string(),
            user_id: user_id.to_string(),
            amount,
            date: Utc::now(),
        });
    }

    pub async fn add_market_date(&self, group_id: &str, period_id: &str, user_id: &str) {
        let mut market_dates = self.market_dates.write().await;
        market_dates.push(MarketDate {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id: period_id.to_string(),
            user_id: user_id.to_string(),
            date: Utc::now(),
        });
    }
}

fn in_period(period_id: Option<&String>, wanted: &str) -> bool {
    period_id.map(|p| p == wanted).unwrap_or(false)
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, MessmateError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn save_group(&self, group: Group) -> Result<(), MessmateError> {
        let mut groups = self.groups.write().await;
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), MessmateError> {
        let mut group_audits = self.group_audits.write().await;
        group_audits
            .entry(audit.group_id.clone())
            .or_insert_with(Vec::new)
            .push(audit);
        Ok(())
    }

    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, MessmateError> {
        let group_audits = self.group_audits.read().await;
        Ok(group_audits.get(group_id).cloned().unwrap_or_default())
    }

    async fn insert_period(&self, period: Period) -> Result<Period, MessmateError> {
        // Single write lock around check + insert: the storage-level analogue
        // of a partial unique constraint on (group_id) where status = ACTIVE.
        let mut periods = self.periods.write().await;
        if period.status == PeriodStatus::Active {
            if let Some(existing) = periods
                .values()
                .find(|p| {
                    p.group_id == period.group_id
                        && p.status == PeriodStatus::Active
                        && !p.is_deleted()
                })
            {
                return Err(MessmateError::ActivePeriodExists(existing.name.clone()));
            }
        }
        periods.insert(period.id.clone(), period.clone());
        Ok(period)
    }

    async fn save_period(&self, period: Period) -> Result<(), MessmateError> {
        let mut periods = self.periods.write().await;
        periods.insert(period.id.clone(), period);
        Ok(())
    }

    async fn get_period(&self, period_id: &str) -> Result<Option<Period>, MessmateError> {
        let periods = self.periods.read().await;
        Ok(periods.get(period_id).cloned())
    }

    async fn find_active_period(&self, group_id: &str) -> Result<Option<Period>, MessmateError> {
        let periods = self.periods.read().await;
        Ok(periods
            .values()
            .find(|p| {
                p.group_id == group_id && p.status == PeriodStatus::Active && !p.is_deleted()
            })
            .cloned())
    }

    async fn find_period_by_name(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<Option<Period>, MessmateError> {
        let periods = self.periods.read().await;
        Ok(periods
            .values()
            .find(|p| p.group_id == group_id && p.name == name && !p.is_deleted())
            .cloned())
    }

    async fn find_overlapping_period(
        &self,
        group_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_period_id: Option<&str>,
    ) -> Result<Option<Period>, MessmateError> {
        let periods = self.periods.read().await;
        Ok(periods
            .values()
            .find(|p| {
                p.group_id == group_id
                    && !p.is_deleted()
                    && exclude_period_id != Some(p.id.as_str())
                    && p.overlaps(start, end)
            })
            .cloned())
    }

    async fn list_periods(&self, group_id: &str) -> Result<Vec<Period>, MessmateError> {
        let periods = self.periods.read().await;
        let mut list: Vec<Period> = periods
            .values()
            .filter(|p| p.group_id == group_id && !p.is_deleted())
            .cloned()
            .collect();
        list.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(list)
    }

    async fn latest_ended_period(&self, group_id: &str) -> Result<Option<Period>, MessmateError> {
        let periods = self.periods.read().await;
        Ok(periods
            .values()
            .filter(|p| {
                p.group_id == group_id
                    && !p.is_deleted()
                    && matches!(p.status, PeriodStatus::Ended | PeriodStatus::Archived)
                    && p.end_date.is_some()
            })
            .max_by_key(|p| p.end_date)
            .cloned())
    }

    async fn reassign_period_records(
        &self,
        group_id: &str,
        from_period_id: &str,
        to_period_id: &str,
    ) -> Result<u64, MessmateError> {
        // All record stores locked before any mutation so the move is atomic.
        let mut meals = self.meals.write().await;
        let mut guest_meals = self.guest_meals.write().await;
        let mut shopping_items = self.shopping_items.write().await;
        let mut expenses = self.expenses.write().await;
        let mut payments = self.payments.write().await;
        let mut market_dates = self.market_dates.write().await;
        let mut transactions = self.transactions.write().await;

        let mut moved = 0u64;
        for m in meals
            .iter_mut()
            .filter(|m| m.group_id == group_id && m.period_id == from_period_id)
        {
            m.period_id = to_period_id.to_string();
            moved += 1;
        }
        for g in guest_meals
            .iter_mut()
            .filter(|g| g.group_id == group_id && g.period_id == from_period_id)
        {
            g.period_id = to_period_id.to_string();
            moved += 1;
        }
        for s in shopping_items
            .iter_mut()
            .filter(|s| s.group_id == group_id && s.period_id == from_period_id)
        {
            s.period_id = to_period_id.to_string();
            moved += 1;
        }
        for e in expenses
            .iter_mut()
            .filter(|e| e.group_id == group_id && e.period_id == from_period_id)
        {
            e.period_id = to_period_id.to_string();
            moved += 1;
        }
        for p in payments
            .iter_mut()
            .filter(|p| p.group_id == group_id && p.period_id == from_period_id)
        {
            p.period_id = to_period_id.to_string();
            moved += 1;
        }
        for d in market_dates
            .iter_mut()
            .filter(|d| d.group_id == group_id && d.period_id == from_period_id)
        {
            d.period_id = to_period_id.to_string();
            moved += 1;
        }
        for t in transactions.values_mut().filter(|t| {
            t.group_id == group_id && t.period_id.as_deref() == Some(from_period_id)
        }) {
            t.period_id = Some(to_period_id.to_string());
            moved += 1;
        }
        Ok(moved)
    }

    async fn insert_transaction(
        &self,
        transaction: Transaction,
        history: TransactionHistory,
    ) -> Result<Transaction, MessmateError> {
        // Both locks held across both writes: row and audit land together.
        let mut transactions = self.transactions.write().await;
        let mut history_log = self.history.write().await;
        transactions.insert(transaction.id.clone(), transaction.clone());
        history_log.push(history);
        Ok(transaction)
    }

    async fn update_transaction(
        &self,
        transaction: Transaction,
        history: TransactionHistory,
    ) -> Result<Transaction, MessmateError> {
        let mut transactions = self.transactions.write().await;
        let mut history_log = self.history.write().await;
        if !transactions.contains_key(&transaction.id) {
            return Err(MessmateError::TransactionNotFound(transaction.id.clone()));
        }
        transactions.insert(transaction.id.clone(), transaction.clone());
        history_log.push(history);
        Ok(transaction)
    }

    async fn delete_transaction(
        &self,
        transaction_id: &str,
        history: TransactionHistory,
    ) -> Result<(), MessmateError> {
        let mut transactions = self.transactions.write().await;
        let mut history_log = self.history.write().await;
        if transactions.remove(transaction_id).is_none() {
            return Err(MessmateError::TransactionNotFound(transaction_id.to_string()));
        }
        history_log.push(history);
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, MessmateError> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(transaction_id).cloned())
    }

    async fn list_transactions(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<Vec<Transaction>, MessmateError> {
        let transactions = self.transactions.read().await;
        let mut list: Vec<Transaction> = transactions
            .values()
            .filter(|t| t.group_id == group_id && in_period(t.period_id.as_ref(), period_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn transaction_history(
        &self,
        group_id: &str,
        transaction_id: &str,
    ) -> Result<Vec<TransactionHistory>, MessmateError> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|h| h.group_id == group_id && h.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn sum_transactions_for_target(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .filter(|t| {
                t.group_id == group_id
                    && t.to_user_id == user_id
                    && in_period(t.period_id.as_ref(), period_id)
            })
            .map(|t| t.amount)
            .sum())
    }

    async fn sum_self_deposits(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .filter(|t| {
                t.group_id == group_id
                    && t.is_self_deposit()
                    && in_period(t.period_id.as_ref(), period_id)
            })
            .map(|t| t.amount)
            .sum())
    }

    async fn grouped_transaction_sums(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<HashMap<String, f64>, MessmateError> {
        let transactions = self.transactions.read().await;
        let mut sums: HashMap<String, f64> = HashMap::new();
        for t in transactions
            .values()
            .filter(|t| t.group_id == group_id && in_period(t.period_id.as_ref(), period_id))
        {
            *sums.entry(t.to_user_id.clone()).or_insert(0.0) += t.amount;
        }
        Ok(sums)
    }

    async fn sum_expenses(&self, group_id: &str, period_id: &str) -> Result<f64, MessmateError> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .iter()
            .filter(|e| e.group_id == group_id && e.period_id == period_id)
            .map(|e| e.amount)
            .sum())
    }

    async fn sum_shopping(&self, group_id: &str, period_id: &str) -> Result<f64, MessmateError> {
        let shopping_items = self.shopping_items.read().await;
        Ok(shopping_items
            .iter()
            .filter(|s| s.group_id == group_id && s.period_id == period_id)
            .map(|s| s.amount)
            .sum())
    }

    async fn sum_shopping_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError> {
        let shopping_items = self.shopping_items.read().await;
        Ok(shopping_items
            .iter()
            .filter(|s| {
                s.group_id == group_id && s.period_id == period_id && s.purchased_by == user_id
            })
            .map(|s| s.amount)
            .sum())
    }

    async fn sum_payments(&self, group_id: &str, period_id: &str) -> Result<f64, MessmateError> {
        let payments = self.payments.read().await;
        Ok(payments
            .iter()
            .filter(|p| p.group_id == group_id && p.period_id == period_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn sum_payments_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError> {
        let payments = self.payments.read().await;
        Ok(payments
            .iter()
            .filter(|p| p.group_id == group_id && p.period_id == period_id && p.user_id == user_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn count_meals(&self, group_id: &str, period_id: &str) -> Result<u64, MessmateError> {
        let meals = self.meals.read().await;
        let guest_meals = self.guest_meals.read().await;
        let own: u64 = meals
            .iter()
            .filter(|m| m.group_id == group_id && m.period_id == period_id)
            .map(|m| m.count)
            .sum();
        let guests: u64 = guest_meals
            .iter()
            .filter(|g| g.group_id == group_id && g.period_id == period_id)
            .map(|g| g.count)
            .sum();
        Ok(own + guests)
    }

    async fn count_meals_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<u64, MessmateError> {
        let meals = self.meals.read().await;
        let guest_meals = self.guest_meals.read().await;
        let own: u64 = meals
            .iter()
            .filter(|m| m.group_id == group_id && m.period_id == period_id && m.user_id == user_id)
            .map(|m| m.count)
            .sum();
        // Guest meals ride on the host member's tab.
        let guests: u64 = guest_meals
            .iter()
            .filter(|g| {
                g.group_id == group_id && g.period_id == period_id && g.host_user_id == user_id
            })
            .map(|g| g.count)
            .sum();
        Ok(own + guests)
    }

    async fn grouped_meal_counts(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<HashMap<String, u64>, MessmateError> {
        let meals = self.meals.read().await;
        let guest_meals = self.guest_meals.read().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for m in meals
            .iter()
            .filter(|m| m.group_id == group_id && m.period_id == period_id)
        {
            *counts.entry(m.user_id.clone()).or_insert(0) += m.count;
        }
        for g in guest_meals
            .iter()
            .filter(|g| g.group_id == group_id && g.period_id == period_id)
        {
            *counts.entry(g.host_user_id.clone()).or_insert(0) += g.count;
        }
        Ok(counts)
    }

    async fn count_market_dates_for_user(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<u64, MessmateError> {
        let market_dates = self.market_dates.read().await;
        Ok(market_dates
            .iter()
            .filter(|d| d.group_id == group_id && d.period_id == period_id && d.user_id == user_id)
            .count() as u64)
    }
}
