use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an accounting period.
///
/// `ACTIVE -> ENDED -> {LOCKED <-> ENDED} -> ARCHIVED`, with `ARCHIVED <->
/// LOCKED` reachable via lock/unlock and every non-deleted status reachable
/// to `ARCHIVED` directly. Soft deletion is an orthogonal flag, not a status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodStatus {
    Active,
    Ended,
    Locked,
    Archived,
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PeriodStatus::Active => "ACTIVE",
            PeriodStatus::Ended => "ENDED",
            PeriodStatus::Locked => "LOCKED",
            PeriodStatus::Archived => "ARCHIVED",
        };
        write!(f, "{}", s)
    }
}

/// A time-boxed accounting window for one group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Period {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: PeriodStatus,
    pub is_locked: bool,
    pub opening_balance: f64,
    pub closing_balance: Option<f64>,
    pub carry_forward: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Period {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Closed-range intersection with `[start, end]`. Open-ended periods
    /// never participate in the overlap check; only one can exist per group
    /// because of the single-ACTIVE invariant.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match self.end_date {
            Some(own_end) => self.start_date <= end && start <= own_end,
            None => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StartPeriod {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub opening_balance: Option<f64>,
    pub carry_forward: bool,
    pub notes: Option<String>,
}

/// Partial update for a period. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct PeriodPatch {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub carry_forward: Option<bool>,
    pub notes: Option<String>,
}

impl PeriodPatch {
    pub fn touches_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}
