use crate::constants::{
    MONTH_PERIOD_RECONCILED, PERIOD_ARCHIVED, PERIOD_DELETED, PERIOD_ENDED, PERIOD_LOCKED,
    PERIOD_RESTARTED, PERIOD_STARTED, PERIOD_UNLOCKED, PERIOD_UPDATED, PERIODS_QUERIED,
};
use crate::core::errors::{FieldError, MessmateError};
use crate::core::models::{
    group::{Group, PeriodMode},
    period::{Period, PeriodPatch, PeriodStatus, StartPeriod},
    user::User,
};
use crate::core::services::MessmateService;
use crate::infrastructure::cache::cache_keys::{group_tag, period_list_key, period_tag};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>, MessmateError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| MessmateError::InternalServerError(format!("invalid month {}-{}", year, month)))
}

/// Last instant of the given calendar month.
fn month_end(year: i32, month: u32) -> Result<DateTime<Utc>, MessmateError> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Ok(month_start(next_year, next_month)? - chrono::Duration::seconds(1))
}

impl<L: LoggingService, S: Storage, C: Cache> MessmateService<L, S, C> {
    pub async fn start_period(
        &self,
        group_id: &str,
        actor: &User,
        input: StartPeriod,
    ) -> Result<Period, MessmateError> {
        info!(
            "Starting period '{}' in group {} by user {}",
            input.name, group_id, actor.id
        );
        self.validate_group_membership(group_id, &actor.id).await?;
        self.validate_string_input("name", &input.name, 100)?;

        if let Some(end) = input.end_date {
            if input.start_date >= end {
                return Err(MessmateError::InvalidDateRange);
            }
        }

        // The two checks share no data; issue them concurrently.
        let overlap_check = async {
            match input.end_date {
                Some(end) => {
                    self.storage
                        .find_overlapping_period(group_id, input.start_date, end, None)
                        .await
                }
                None => Ok(None),
            }
        };
        let (active, overlapping) =
            futures::try_join!(self.storage.find_active_period(group_id), overlap_check)?;
        if let Some(active) = active {
            warn!(
                "Group {} already has active period '{}'",
                group_id, active.name
            );
            return Err(MessmateError::ActivePeriodExists(active.name));
        }
        if let Some(other) = overlapping {
            let end = other.end_date.unwrap_or(other.start_date);
            return Err(MessmateError::PeriodOverlap {
                name: other.name,
                start: other.start_date,
                end,
            });
        }

        let name = self.available_period_name(group_id, &input.name, None).await?;
        let now = Utc::now();
        let period = Period {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            name,
            start_date: input.start_date,
            end_date: input.end_date,
            status: PeriodStatus::Active,
            is_locked: false,
            opening_balance: input.opening_balance.unwrap_or(0.0),
            closing_balance: None,
            carry_forward: input.carry_forward,
            notes: input.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        // The pre-check above is advisory; the insert re-checks the
        // single-ACTIVE invariant atomically, which is what holds it under
        // concurrent starts.
        let created = self.storage.insert_period(period).await?;
        debug!("Period created with ID: {}", created.id);

        self.cache.invalidate_tags(&[group_tag(group_id)]).await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_STARTED,
            json!({ "period_id": created.id, "name": created.name, "start_date": created.start_date }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(created)
    }

    pub async fn end_period(
        &self,
        group_id: &str,
        actor: &User,
        end_date: Option<DateTime<Utc>>,
        period_id: Option<&str>,
    ) -> Result<Period, MessmateError> {
        info!("Ending period in group {} by user {}", group_id, actor.id);
        let group = self.validate_group_membership(group_id, &actor.id).await?;
        let period = self
            .resolve_period(group_id, period_id)
            .await?
            .ok_or_else(|| {
                MessmateError::PeriodNotFound(period_id.unwrap_or("<active>").to_string())
            })?;
        if period.status != PeriodStatus::Active {
            return Err(MessmateError::PeriodNotActive(period.name));
        }

        let closing = self.period_net_balance(group_id, &period.id).await?;
        let mut ended = period;
        ended.end_date = Some(end_date.unwrap_or_else(Utc::now));
        ended.status = PeriodStatus::Ended;
        ended.closing_balance = Some(closing);
        ended.updated_at = Utc::now();
        self.storage.save_period(ended.clone()).await?;

        // An explicit end means the caller is taking manual control of
        // period boundaries from here on.
        self.take_manual_control(group).await?;

        self.cache
            .invalidate_tags(&[group_tag(group_id), period_tag(&ended.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_ENDED,
            json!({ "period_id": ended.id, "name": ended.name, "closing_balance": closing }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(ended)
    }

    pub async fn lock_period(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
    ) -> Result<Period, MessmateError> {
        info!("Locking period {} in group {}", period_id, group_id);
        self.validate_group_membership(group_id, &actor.id).await?;
        let period = self.get_group_period(group_id, period_id).await?;
        if period.is_locked {
            return Err(MessmateError::PeriodAlreadyLocked(period.name));
        }

        let mut locked = period;
        locked.is_locked = true;
        locked.status = PeriodStatus::Locked;
        locked.updated_at = Utc::now();
        self.storage.save_period(locked.clone()).await?;

        self.cache
            .invalidate_tags(&[group_tag(group_id), period_tag(&locked.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_LOCKED,
            json!({ "period_id": locked.id, "name": locked.name }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(locked)
    }

    pub async fn unlock_period(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
        resulting_status: PeriodStatus,
    ) -> Result<Period, MessmateError> {
        info!("Unlocking period {} in group {}", period_id, group_id);
        self.validate_group_membership(group_id, &actor.id).await?;
        let period = self.get_group_period(group_id, period_id).await?;
        if !period.is_locked && period.status != PeriodStatus::Archived {
            return Err(MessmateError::PeriodNotLocked(period.name));
        }
        if matches!(resulting_status, PeriodStatus::Active | PeriodStatus::Locked) {
            return Err(MessmateError::InvalidInput(
                "status".to_string(),
                FieldError {
                    field: "status".to_string(),
                    title: "Invalid Resulting Status".to_string(),
                    description: "Unlock may only target ENDED or ARCHIVED".to_string(),
                },
            ));
        }

        let mut unlocked = period;
        unlocked.is_locked = false;
        unlocked.status = resulting_status;
        unlocked.updated_at = Utc::now();
        self.storage.save_period(unlocked.clone()).await?;

        self.cache
            .invalidate_tags(&[group_tag(group_id), period_tag(&unlocked.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_UNLOCKED,
            json!({ "period_id": unlocked.id, "status": unlocked.status.to_string() }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(unlocked)
    }

    pub async fn archive_period(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
    ) -> Result<Period, MessmateError> {
        info!("Archiving period {} in group {}", period_id, group_id);
        let group = self.validate_group_membership(group_id, &actor.id).await?;
        let period = self.get_group_period(group_id, period_id).await?;

        let mut archived = period.clone();
        if period.status == PeriodStatus::Active {
            archived.end_date = Some(Utc::now());
            archived.closing_balance =
                Some(self.period_net_balance(group_id, &period.id).await?);
            self.take_manual_control(group).await?;
        }
        archived.status = PeriodStatus::Archived;
        archived.updated_at = Utc::now();
        self.storage.save_period(archived.clone()).await?;

        self.cache
            .invalidate_tags(&[group_tag(group_id), period_tag(&archived.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_ARCHIVED,
            json!({ "period_id": archived.id, "name": archived.name }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(archived)
    }

    pub async fn update_period(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
        patch: PeriodPatch,
    ) -> Result<Period, MessmateError> {
        info!("Updating period {} in group {}", period_id, group_id);
        self.validate_group_membership(group_id, &actor.id).await?;
        let period = self.get_group_period(group_id, period_id).await?;

        let mut updated = period.clone();
        if let Some(ref name) = patch.name {
            if *name != period.name {
                self.validate_string_input("name", name, 100)?;
                updated.name = self
                    .available_period_name(group_id, name, Some(&period.id))
                    .await?;
            }
        }
        if patch.touches_dates() {
            if let Some(start) = patch.start_date {
                updated.start_date = start;
            }
            if let Some(end) = patch.end_date {
                updated.end_date = Some(end);
            }
            if let Some(end) = updated.end_date {
                if updated.start_date >= end {
                    return Err(MessmateError::InvalidDateRange);
                }
                if let Some(other) = self
                    .storage
                    .find_overlapping_period(group_id, updated.start_date, end, Some(&period.id))
                    .await?
                {
                    let other_end = other.end_date.unwrap_or(other.start_date);
                    return Err(MessmateError::PeriodOverlap {
                        name: other.name,
                        start: other.start_date,
                        end: other_end,
                    });
                }
            }
        }
        if let Some(carry_forward) = patch.carry_forward {
            updated.carry_forward = carry_forward;
        }
        if let Some(notes) = patch.notes {
            updated.notes = Some(notes);
        }
        updated.updated_at = Utc::now();
        self.storage.save_period(updated.clone()).await?;

        self.cache
            .invalidate_tags(&[group_tag(group_id), period_tag(&updated.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_UPDATED,
            json!({ "period_id": updated.id, "name": updated.name }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(updated)
    }

    /// Soft delete. The row stays behind the `deleted_at` flag so financial
    /// records keep resolving their period reference.
    pub async fn delete_period(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
    ) -> Result<(), MessmateError> {
        info!("Deleting period {} in group {}", period_id, group_id);
        self.validate_group_membership(group_id, &actor.id).await?;
        let period = self.get_group_period(group_id, period_id).await?;

        let mut deleted = period;
        deleted.deleted_at = Some(Utc::now());
        deleted.updated_at = Utc::now();
        self.storage.save_period(deleted.clone()).await?;

        self.cache
            .invalidate_tags(&[group_tag(group_id), period_tag(&deleted.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_DELETED,
            json!({ "period_id": deleted.id, "name": deleted.name }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(())
    }

    pub async fn restart_period(
        &self,
        group_id: &str,
        actor: &User,
        period_id: &str,
        new_name: Option<String>,
        with_data: bool,
    ) -> Result<Period, MessmateError> {
        info!(
            "Restarting period {} in group {} (with_data: {})",
            period_id, group_id, with_data
        );
        self.validate_group_membership(group_id, &actor.id).await?;
        let source = self.get_group_period(group_id, period_id).await?;
        if !matches!(source.status, PeriodStatus::Ended | PeriodStatus::Archived) {
            return Err(MessmateError::InvalidInput(
                "period".to_string(),
                FieldError {
                    field: "period".to_string(),
                    title: "Period Not Restartable".to_string(),
                    description: "Only ended or archived periods can be restarted".to_string(),
                },
            ));
        }
        if let Some(active) = self.storage.find_active_period(group_id).await? {
            return Err(MessmateError::ActivePeriodExists(active.name));
        }

        let opening_balance = if source.carry_forward {
            source.closing_balance.unwrap_or(0.0)
        } else {
            0.0
        };
        let base = new_name.unwrap_or_else(|| source.name.clone());
        let name = self.available_period_name(group_id, &base, None).await?;
        let now = Utc::now();
        let period = Period {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            name,
            start_date: now,
            end_date: None,
            status: PeriodStatus::Active,
            is_locked: false,
            opening_balance,
            closing_balance: None,
            carry_forward: source.carry_forward,
            notes: source.notes.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let created = self.storage.insert_period(period).await?;

        // A move, not a copy: the source period loses these records.
        let moved = if with_data {
            self.storage
                .reassign_period_records(group_id, &source.id, &created.id)
                .await?
        } else {
            0
        };

        self.cache
            .invalidate_tags(&[
                group_tag(group_id),
                period_tag(&source.id),
                period_tag(&created.id),
            ])
            .await?;
        self.log_and_audit(
            Some(group_id),
            PERIOD_RESTARTED,
            json!({
                "source_period_id": source.id,
                "period_id": created.id,
                "name": created.name,
                "opening_balance": opening_balance,
                "records_moved": moved
            }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(created)
    }

    /// Idempotent monthly reconciliation, run on a schedule or on demand.
    /// Ends a stale ACTIVE period at the end of its own month and opens the
    /// current month's period, seeding the opening balance from the latest
    /// ended period when it carries forward.
    pub async fn ensure_month_period(
        &self,
        group_id: &str,
    ) -> Result<Option<Period>, MessmateError> {
        let group = self.validate_group(group_id).await?;
        if group.period_mode != PeriodMode::Monthly {
            return Ok(None);
        }

        let now = Utc::now();
        let current_month_start = month_start(now.year(), now.month())?;

        if let Some(active) = self.storage.find_active_period(group_id).await? {
            if active.start_date >= current_month_start {
                return Ok(None);
            }
            // The closing figure is best-effort here; a failed aggregate must
            // not block the rollover.
            let closing = match self.period_net_balance(group_id, &active.id).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(
                        "Closing balance unavailable for period {}: {}",
                        active.id, e
                    );
                    None
                }
            };
            let mut ended = active;
            ended.end_date = Some(month_end(
                ended.start_date.year(),
                ended.start_date.month(),
            )?);
            ended.status = PeriodStatus::Ended;
            ended.closing_balance = closing;
            ended.updated_at = now;
            info!(
                "Rolling over stale period '{}' in group {}",
                ended.name, group_id
            );
            self.storage.save_period(ended.clone()).await?;
            self.cache
                .invalidate_tags(&[group_tag(group_id), period_tag(&ended.id)])
                .await?;
            // The group keeps MONTHLY mode: the scheduler ending a month is
            // not a caller taking manual control.
        }

        let month_name = current_month_start.format("%B %Y").to_string();
        if self
            .storage
            .find_period_by_name(group_id, &month_name)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let opening_balance = match self.storage.latest_ended_period(group_id).await? {
            Some(prev) if prev.carry_forward => prev.closing_balance.unwrap_or(0.0),
            _ => 0.0,
        };
        let period = Period {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            name: month_name,
            start_date: current_month_start,
            end_date: None,
            status: PeriodStatus::Active,
            is_locked: false,
            opening_balance,
            closing_balance: None,
            carry_forward: true,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let created = self.storage.insert_period(period).await?;
        info!(
            "Opened monthly period '{}' for group {}",
            created.name, group_id
        );

        self.cache.invalidate_tags(&[group_tag(group_id)]).await?;
        self.log_and_audit(
            Some(group_id),
            MONTH_PERIOD_RECONCILED,
            json!({ "period_id": created.id, "name": created.name, "opening_balance": opening_balance }),
            None,
        )
        .await?;
        Ok(Some(created))
    }

    pub async fn list_periods(
        &self,
        group_id: &str,
        actor: &User,
    ) -> Result<Vec<Period>, MessmateError> {
        self.validate_group_membership(group_id, &actor.id).await?;

        let key = period_list_key(group_id);
        if let Some(list) = self.read_cached::<Vec<Period>>(&key).await? {
            return Ok(list);
        }

        let list = self.storage.list_periods(group_id).await?;
        self.write_cached(&key, &list, &[group_tag(group_id)]).await?;
        self.log_and_audit(
            Some(group_id),
            PERIODS_QUERIED,
            json!({ "group_id": group_id }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(list)
    }

    /// Name uniqueness is resolved, never rejected: "January", "January (2)",
    /// "January (3)", ...
    async fn available_period_name(
        &self,
        group_id: &str,
        base: &str,
        exclude_period_id: Option<&str>,
    ) -> Result<String, MessmateError> {
        let mut candidate = base.to_string();
        let mut suffix = 2u32;
        loop {
            match self
                .storage
                .find_period_by_name(group_id, &candidate)
                .await?
            {
                Some(p) if exclude_period_id != Some(p.id.as_str()) => {
                    candidate = format!("{} ({})", base, suffix);
                    suffix += 1;
                }
                _ => return Ok(candidate),
            }
        }
    }

    /// MONTHLY -> CUSTOM, once the caller explicitly ends or archives the
    /// running period.
    async fn take_manual_control(&self, mut group: Group) -> Result<bool, MessmateError> {
        if group.period_mode != PeriodMode::Monthly {
            return Ok(false);
        }
        group.period_mode = PeriodMode::Custom;
        self.storage.save_group(group).await?;
        Ok(true)
    }
}
