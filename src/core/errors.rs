use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

#[derive(Error, Debug, Serialize)]
pub enum MessmateError {
    /// Group with given ID not found
    #[error("Group {0} not found")]
    GroupNotFound(String),

    /// Group has reached its member limit
    #[error("Group {0} is full")]
    GroupFull(String),

    /// User is already a member of the group
    #[error("User {0} is already a group member")]
    AlreadyGroupMember(String),

    /// User is not a member of the group
    #[error("User {0} is not a group member")]
    NotGroupMember(String),

    /// An ACTIVE period already exists for the group
    #[error("Period {0} is already active for this group")]
    ActivePeriodExists(String),

    /// Start date is not strictly before end date
    #[error("Start date must be before end date")]
    InvalidDateRange,

    /// Proposed date range intersects an existing period's range
    #[error("Period {name} overlaps the requested range ({start} to {end})")]
    PeriodOverlap {
        name: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Period with given ID not found (or soft-deleted)
    #[error("Period {0} not found")]
    PeriodNotFound(String),

    /// Lifecycle transition requires an ACTIVE period
    #[error("Period {0} is not active")]
    PeriodNotActive(String),

    /// Lifecycle transition requires a locked or archived period
    #[error("Period {0} is not locked")]
    PeriodNotLocked(String),

    /// Period is already locked
    #[error("Period {0} is already locked")]
    PeriodAlreadyLocked(String),

    /// Transaction with given ID not found
    #[error("Transaction {0} not found")]
    TransactionNotFound(String),

    /// The authorization collaborator rejected the action; raised by the
    /// boundary layer, never computed inside this crate
    #[error("User {0} is not authorized for this action")]
    Unauthorized(String),

    /// A field failed input validation
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalServerError(String),
}
