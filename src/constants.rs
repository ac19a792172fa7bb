pub const PERIOD_STARTED: &str = "PERIOD_STARTED";
pub const PERIOD_ENDED: &str = "PERIOD_ENDED";
pub const PERIOD_LOCKED: &str = "PERIOD_LOCKED";
pub const PERIOD_UNLOCKED: &str = "PERIOD_UNLOCKED";
pub const PERIOD_ARCHIVED: &str = "PERIOD_ARCHIVED";
pub const PERIOD_UPDATED: &str = "PERIOD_UPDATED";
pub const PERIOD_DELETED: &str = "PERIOD_DELETED";
pub const PERIOD_RESTARTED: &str = "PERIOD_RESTARTED";
pub const MONTH_PERIOD_RECONCILED: &str = "MONTH_PERIOD_RECONCILED";

pub const TRANSACTION_CREATED: &str = "TRANSACTION_CREATED";
pub const TRANSACTION_UPDATED: &str = "TRANSACTION_UPDATED";
pub const TRANSACTION_DELETED: &str = "TRANSACTION_DELETED";

pub const BALANCE_QUERIED: &str = "BALANCE_QUERIED";
pub const PERIODS_QUERIED: &str = "PERIODS_QUERIED";
pub const TRANSACTIONS_QUERIED: &str = "TRANSACTIONS_QUERIED";
pub const HISTORY_QUERIED: &str = "HISTORY_QUERIED";

pub const MEMBER_JOINED: &str = "MEMBER_JOINED";

/// Upper bound accepted for a single transaction amount.
pub const MAX_TRANSACTION_AMOUNT: f64 = 1_000_000.0;
