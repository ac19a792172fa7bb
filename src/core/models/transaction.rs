use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a ledger transaction. A closed set so state handling stays
/// exhaustive; whether value moved between two people or into the group fund
/// is determined by `from`/`to`, not by the category.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Transfer,
    Refund,
    Adjustment,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Refund => "REFUND",
            TransactionType::Adjustment => "ADJUSTMENT",
        };
        write!(f, "{}", s)
    }
}

/// Value moving between two parties within a period.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub group_id: String,
    pub period_id: Option<String>,
    pub created_by: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: f64,
    pub kind: TransactionType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A self-deposit counts toward the group's total balance; a transfer
    /// between distinct members only credits the target.
    pub fn is_self_deposit(&self) -> bool {
        self.from_user_id == self.to_user_id
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
}

/// Immutable audit record for one transaction mutation. For UPDATE and
/// DELETE the snapshot holds the pre-mutation state; for CREATE, the state
/// as created. Survives hard deletion of the live row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub id: String,
    pub transaction_id: String,
    pub group_id: String,
    pub period_id: Option<String>,
    pub action: HistoryAction,
    pub amount: f64,
    pub kind: TransactionType,
    pub description: Option<String>,
    pub changed_by: String,
    pub recorded_at: DateTime<Utc>,
}

impl TransactionHistory {
    pub fn snapshot(tx: &Transaction, action: HistoryAction, changed_by: &str) -> Self {
        TransactionHistory {
            id: Uuid::new_v4().to_string(),
            transaction_id: tx.id.clone(),
            group_id: tx.group_id.clone(),
            period_id: tx.period_id.clone(),
            action,
            amount: tx.amount,
            kind: tx.kind,
            description: tx.description.clone(),
            changed_by: changed_by.to_string(),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateTransaction {
    pub to_user_id: String,
    pub amount: f64,
    pub kind: TransactionType,
    pub description: Option<String>,
    pub period_id: Option<String>,
}

/// Mutable slice of a transaction. Source, target and period are fixed at
/// creation and deliberately absent here.
#[derive(Clone, Debug)]
pub struct UpdateTransaction {
    pub amount: f64,
    pub kind: TransactionType,
    pub description: Option<String>,
}
