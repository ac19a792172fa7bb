use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Application-level log line emitted through the `LoggingService`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppLog {
    pub id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub details: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Persisted audit row for a group-scoped action. Financial mutations have
/// their own `TransactionHistory` trail on top of this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupAudit {
    pub id: String,
    pub group_id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub details: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}
