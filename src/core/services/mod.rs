pub mod balances;
pub mod membership;
pub mod periods;
pub mod transactions;

use crate::config::CONFIG;
use crate::core::errors::{FieldError, MessmateError};
use crate::core::models::{
    audit::{AppLog, GroupAudit},
    group::Group,
    period::Period,
};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

/// The ledger core. Generic over its three seams so tests run against
/// in-memory fakes; identity and authorization arrive as plain parameters,
/// never from ambient context.
pub struct MessmateService<L: LoggingService, S: Storage, C: Cache> {
    storage: S,
    logging: L,
    cache: C,
}

impl<L: LoggingService, S: Storage, C: Cache> MessmateService<L, S, C> {
    pub fn new(storage: S, logging: L, cache: C) -> Self {
        MessmateService {
            storage,
            logging,
            cache,
        }
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Option<Group>, MessmateError> {
        self.storage.get_group(group_id).await
    }

    pub async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, MessmateError> {
        self.validate_group(group_id).await?;
        self.storage.get_group_audits(group_id).await
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, MessmateError> {
        self.logging.get_logs().await
    }

    pub(crate) async fn validate_group(&self, group_id: &str) -> Result<Group, MessmateError> {
        self.storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| MessmateError::GroupNotFound(group_id.to_string()))
    }

    pub(crate) async fn validate_group_membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Group, MessmateError> {
        let group = self.validate_group(group_id).await?;
        if !group.is_member(user_id) {
            return Err(MessmateError::NotGroupMember(user_id.to_string()));
        }
        Ok(group)
    }

    /// Period lookup scoped to a group; soft-deleted periods do not resolve.
    pub(crate) async fn get_group_period(
        &self,
        group_id: &str,
        period_id: &str,
    ) -> Result<Period, MessmateError> {
        match self.storage.get_period(period_id).await? {
            Some(p) if p.group_id == group_id && !p.is_deleted() => Ok(p),
            _ => Err(MessmateError::PeriodNotFound(period_id.to_string())),
        }
    }

    /// Resolves an explicit period id, or the group's current ACTIVE period
    /// when none is given.
    pub(crate) async fn resolve_period(
        &self,
        group_id: &str,
        period_id: Option<&str>,
    ) -> Result<Option<Period>, MessmateError> {
        match period_id {
            Some(pid) => Ok(Some(self.get_group_period(group_id, pid).await?)),
            None => self.storage.find_active_period(group_id).await,
        }
    }

    pub(crate) async fn log_and_audit(
        &self,
        group_id: Option<&str>,
        action: &str,
        log_details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), MessmateError> {
        self.logging
            .log_action(action, log_details.clone(), user_id)
            .await?;
        if let Some(gid) = group_id {
            self.storage
                .save_group_audit(GroupAudit {
                    id: Uuid::new_v4().to_string(),
                    group_id: gid.to_string(),
                    action: action.to_string(),
                    user_id: user_id.map(String::from),
                    details: serde_json::from_value(log_details).unwrap_or_default(),
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    pub(crate) fn validate_string_input(
        &self,
        field: &str,
        value: &str,
        max_length: usize,
    ) -> Result<(), MessmateError> {
        if value.trim().is_empty() {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} cannot be empty", field),
                },
            ));
        }
        if value.len() > max_length {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("{} Too Long", field),
                    description: format!("{} cannot exceed {} characters", field, max_length),
                },
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} contains invalid characters", field),
                },
            ));
        }
        Ok(())
    }

    /// Amounts are signed (negative adjustments are legal) but must be
    /// non-zero, finite, bounded, and at most two decimal places.
    pub(crate) fn validate_amount_input(
        &self,
        field: &str,
        amount: f64,
    ) -> Result<(), MessmateError> {
        if !amount.is_finite() {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: "Invalid Amount".to_string(),
                    description: "Amount must be a finite number".to_string(),
                },
            ));
        }
        if amount == 0.0 {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: "Invalid Amount".to_string(),
                    description: "Amount cannot be zero".to_string(),
                },
            ));
        }
        if amount.abs() > crate::constants::MAX_TRANSACTION_AMOUNT {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: "Amount Too Large".to_string(),
                    description: "Amount cannot exceed 1,000,000".to_string(),
                },
            ));
        }
        if (amount * 100.0).fract() != 0.0 {
            return Err(MessmateError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: "Invalid Amount".to_string(),
                    description: "Amount cannot have more than 2 decimal places".to_string(),
                },
            ));
        }
        Ok(())
    }

    pub(crate) async fn read_cached<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, MessmateError> {
        // A value that no longer deserializes is a stale shape, not an error.
        Ok(self
            .cache
            .get(key)
            .await?
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    pub(crate) async fn write_cached<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        tags: &[String],
    ) -> Result<(), MessmateError> {
        let value = serde_json::to_value(value)
            .map_err(|e| MessmateError::SerializationError(e.to_string()))?;
        self.cache
            .put(key, value, tags, Duration::from_secs(CONFIG.cache_ttl_secs))
            .await
    }
}
