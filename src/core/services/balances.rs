use crate::constants::BALANCE_QUERIED;
use crate::core::errors::MessmateError;
use crate::core::models::{
    balance::{
        AvailableBalance, GroupBalanceSummary, MealRateInfo, MemberBalance, PeriodSummary,
        UserContribution,
    },
    user::User,
};
use crate::core::services::MessmateService;
use crate::infrastructure::cache::cache_keys::{
    group_balance_summary_key, group_tag, period_summary_key, period_tag,
};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use serde_json::json;
use tracing::debug;

impl<L: LoggingService, S: Storage, C: Cache> MessmateService<L, S, C> {
    /// Sum of transaction amounts credited to the user within the period.
    /// No period means no balance is defined; zero by policy, never an error.
    pub async fn calculate_balance(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: Option<&str>,
    ) -> Result<f64, MessmateError> {
        let Some(period_id) = period_id else {
            return Ok(0.0);
        };
        self.storage
            .sum_transactions_for_target(user_id, group_id, period_id)
            .await
    }

    /// Self-deposits only: transfers between distinct members net to zero at
    /// the group level and are excluded entirely.
    pub async fn calculate_group_total_balance(
        &self,
        group_id: &str,
        period_id: Option<&str>,
    ) -> Result<f64, MessmateError> {
        let Some(period_id) = period_id else {
            return Ok(0.0);
        };
        self.storage.sum_self_deposits(group_id, period_id).await
    }

    pub async fn calculate_total_expenses(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError> {
        self.storage.sum_expenses(group_id, period_id).await
    }

    /// Accepts a pre-computed expense total so callers that already hold it
    /// do not trigger the aggregation twice.
    pub async fn calculate_meal_rate(
        &self,
        group_id: &str,
        period_id: &str,
        precalculated_expenses: Option<f64>,
    ) -> Result<MealRateInfo, MessmateError> {
        let (total_expenses, total_meals) = match precalculated_expenses {
            Some(expenses) => (expenses, self.storage.count_meals(group_id, period_id).await?),
            None => futures::try_join!(
                self.storage.sum_expenses(group_id, period_id),
                self.storage.count_meals(group_id, period_id),
            )?,
        };
        Ok(MealRateInfo::from_totals(total_expenses, total_meals))
    }

    pub async fn calculate_user_meal_count(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<u64, MessmateError> {
        self.storage
            .count_meals_for_user(user_id, group_id, period_id)
            .await
    }

    pub async fn calculate_available_balance(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: Option<&str>,
        meal_rate_info: Option<MealRateInfo>,
    ) -> Result<AvailableBalance, MessmateError> {
        let Some(period_id) = period_id else {
            return Ok(AvailableBalance {
                available_balance: 0.0,
                total_spent: 0.0,
                meal_count: 0,
                meal_rate: 0.0,
            });
        };

        let (balance, meal_count) = futures::try_join!(
            self.storage
                .sum_transactions_for_target(user_id, group_id, period_id),
            self.storage
                .count_meals_for_user(user_id, group_id, period_id),
        )?;
        let rate = match meal_rate_info {
            Some(info) => info,
            None => self.calculate_meal_rate(group_id, period_id, None).await?,
        };
        let total_spent = meal_count as f64 * rate.meal_rate;
        Ok(AvailableBalance {
            available_balance: balance - total_spent,
            total_spent,
            meal_count,
            meal_rate: rate.meal_rate,
        })
    }

    /// What a member put into the period besides ledger transactions:
    /// groceries bought, payments handed in, market days served.
    pub async fn calculate_user_contribution(
        &self,
        user_id: &str,
        group_id: &str,
        period_id: &str,
    ) -> Result<UserContribution, MessmateError> {
        let (shopping_total, payment_total, market_days) = futures::try_join!(
            self.storage
                .sum_shopping_for_user(user_id, group_id, period_id),
            self.storage
                .sum_payments_for_user(user_id, group_id, period_id),
            self.storage
                .count_market_dates_for_user(user_id, group_id, period_id),
        )?;
        Ok(UserContribution {
            shopping_total,
            payment_total,
            market_days,
        })
    }

    /// The most expensive read in the system and the primary cache target.
    /// Ensures the correct active period exists, resolves it once, then
    /// fetches aggregates in two concurrent waves to bound connection use.
    pub async fn get_group_balance_summary(
        &self,
        group_id: &str,
        actor: &User,
        include_details: bool,
    ) -> Result<GroupBalanceSummary, MessmateError> {
        let group = self.validate_group_membership(group_id, &actor.id).await?;
        self.ensure_month_period(group_id).await?;

        let key = group_balance_summary_key(group_id, include_details);
        if let Some(summary) = self.read_cached::<GroupBalanceSummary>(&key).await? {
            debug!("Balance summary for group {} served from cache", group_id);
            return Ok(summary);
        }

        let active = self.storage.find_active_period(group_id).await?;
        let summary = match active {
            None => GroupBalanceSummary {
                group_id: group_id.to_string(),
                period_id: None,
                members: group
                    .members
                    .iter()
                    .map(|m| MemberBalance {
                        user: m.user.clone(),
                        role: m.role.clone(),
                        balance: 0.0,
                        details: None,
                    })
                    .collect(),
                total_balance: 0.0,
                total_expenses: 0.0,
                net_balance: 0.0,
                meal_rate: 0.0,
                total_meals: 0,
            },
            Some(period) => {
                // Wave 1: ledger aggregates.
                let (transaction_sums, total_balance) = futures::try_join!(
                    self.storage.grouped_transaction_sums(group_id, &period.id),
                    self.storage.sum_self_deposits(group_id, &period.id),
                )?;
                // Wave 2: consumption aggregates. No causal dependency on
                // wave 1; split only to cap concurrent connections.
                let (meal_counts, total_expenses) = futures::try_join!(
                    self.storage.grouped_meal_counts(group_id, &period.id),
                    self.storage.sum_expenses(group_id, &period.id),
                )?;

                let total_meals: u64 = meal_counts.values().sum();
                let rate = MealRateInfo::from_totals(total_expenses, total_meals);
                let members = group
                    .members
                    .iter()
                    .map(|m| {
                        let balance =
                            transaction_sums.get(&m.user.id).copied().unwrap_or(0.0);
                        let details = if include_details {
                            let meal_count =
                                meal_counts.get(&m.user.id).copied().unwrap_or(0);
                            let total_spent = meal_count as f64 * rate.meal_rate;
                            Some(AvailableBalance {
                                available_balance: balance - total_spent,
                                total_spent,
                                meal_count,
                                meal_rate: rate.meal_rate,
                            })
                        } else {
                            None
                        };
                        MemberBalance {
                            user: m.user.clone(),
                            role: m.role.clone(),
                            balance,
                            details,
                        }
                    })
                    .collect();

                GroupBalanceSummary {
                    group_id: group_id.to_string(),
                    period_id: Some(period.id.clone()),
                    members,
                    total_balance,
                    total_expenses,
                    net_balance: total_balance - total_expenses,
                    meal_rate: rate.meal_rate,
                    total_meals,
                }
            }
        };

        let mut tags = vec![group_tag(group_id)];
        if let Some(pid) = &summary.period_id {
            tags.push(period_tag(pid));
        }
        self.write_cached(&key, &summary, &tags).await?;
        self.log_and_audit(
            Some(group_id),
            BALANCE_QUERIED,
            json!({ "group_id": group_id, "queried_by": actor.id }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(summary)
    }

    /// Aggregate view of a single period, cached under its own tags.
    pub async fn get_period_summary(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
    ) -> Result<PeriodSummary, MessmateError> {
        self.validate_group_membership(group_id, &actor.id).await?;
        let period = self.get_group_period(group_id, period_id).await?;

        let key = period_summary_key(group_id, &period.id);
        if let Some(summary) = self.read_cached::<PeriodSummary>(&key).await? {
            return Ok(summary);
        }

        let (total_meals, total_expenses, total_balance) = futures::try_join!(
            self.storage.count_meals(group_id, &period.id),
            self.storage.sum_expenses(group_id, &period.id),
            self.storage.sum_self_deposits(group_id, &period.id),
        )?;
        let (total_shopping, total_payments) = futures::try_join!(
            self.storage.sum_shopping(group_id, &period.id),
            self.storage.sum_payments(group_id, &period.id),
        )?;

        let rate = MealRateInfo::from_totals(total_expenses, total_meals);
        let summary = PeriodSummary {
            total_meals,
            total_expenses,
            total_shopping,
            total_payments,
            total_balance,
            net_balance: total_balance - total_expenses,
            meal_rate: rate.meal_rate,
            period,
        };

        let tags = [group_tag(group_id), period_tag(&summary.period.id)];
        self.write_cached(&key, &summary, &tags).await?;
        Ok(summary)
    }

    /// Group net position for a period: self-deposits minus expenses.
    pub(crate) async fn period_net_balance(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<f64, MessmateError> {
        let (deposits, expenses) = futures::try_join!(
            self.storage.sum_self_deposits(group_id, period_id),
            self.storage.sum_expenses(group_id, period_id),
        )?;
        Ok(deposits - expenses)
    }
}
