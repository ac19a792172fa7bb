use crate::constants::{
    HISTORY_QUERIED, TRANSACTION_CREATED, TRANSACTION_DELETED, TRANSACTION_UPDATED,
    TRANSACTIONS_QUERIED,
};
use crate::core::errors::MessmateError;
use crate::core::models::{
    transaction::{
        CreateTransaction, HistoryAction, Transaction, TransactionHistory, UpdateTransaction,
    },
    user::User,
};
use crate::core::services::MessmateService;
use crate::infrastructure::cache::cache_keys::{
    group_tag, period_tag, transaction_history_key, transaction_list_key,
};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

impl<L: LoggingService, S: Storage, C: Cache> MessmateService<L, S, C> {
    /// Creates a ledger transaction. The creator is the source party; a
    /// transaction to oneself is a self-deposit into the group fund. The row
    /// and its CREATE audit record land in one atomic storage write.
    pub async fn create_transaction(
        &self,
        group_id: &str,
        creator: &User,
        input: CreateTransaction,
    ) -> Result<Transaction, MessmateError> {
        info!(
            "Creating transaction in group {} by user {} for amount {}",
            group_id, creator.id, input.amount
        );
        let group = self.validate_group_membership(group_id, &creator.id).await?;
        if !group.is_member(&input.to_user_id) {
            return Err(MessmateError::NotGroupMember(input.to_user_id));
        }
        self.validate_amount_input("amount", input.amount)?;
        if let Some(description) = &input.description {
            self.validate_string_input("description", description, 255)?;
        }

        let period_id = match input.period_id.as_deref() {
            Some(pid) => Some(self.get_group_period(group_id, pid).await?.id),
            None => self
                .storage
                .find_active_period(group_id)
                .await?
                .map(|p| p.id),
        };

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            period_id,
            created_by: creator.id.clone(),
            from_user_id: creator.id.clone(),
            to_user_id: input.to_user_id,
            amount: input.amount,
            kind: input.kind,
            description: input.description,
            created_at: Utc::now(),
        };
        let history =
            TransactionHistory::snapshot(&transaction, HistoryAction::Create, &creator.id);
        let created = self.storage.insert_transaction(transaction, history).await?;
        debug!("Transaction created with ID: {}", created.id);

        self.invalidate_transaction_tags(&created).await?;
        self.log_and_audit(
            Some(group_id),
            TRANSACTION_CREATED,
            json!({
                "transaction_id": created.id,
                "to_user_id": created.to_user_id,
                "amount": created.amount,
                "kind": created.kind.to_string()
            }),
            Some(creator.id.as_str()),
        )
        .await?;
        Ok(created)
    }

    /// Amount, description and category are the only mutable fields; the
    /// UPDATE audit row snapshots the state *before* this change.
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        actor: &User,
        patch: UpdateTransaction,
    ) -> Result<Transaction, MessmateError> {
        info!(
            "Updating transaction {} by user {}",
            transaction_id, actor.id
        );
        let current = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| MessmateError::TransactionNotFound(transaction_id.to_string()))?;
        self.validate_group_membership(&current.group_id, &actor.id)
            .await?;
        self.validate_amount_input("amount", patch.amount)?;
        if let Some(description) = &patch.description {
            self.validate_string_input("description", description, 255)?;
        }

        let history = TransactionHistory::snapshot(&current, HistoryAction::Update, &actor.id);
        let updated = Transaction {
            amount: patch.amount,
            kind: patch.kind,
            description: patch.description.or_else(|| current.description.clone()),
            ..current.clone()
        };
        let saved = self.storage.update_transaction(updated, history).await?;
        debug!("Transaction updated: {}", saved.id);

        self.invalidate_transaction_tags(&saved).await?;
        self.log_and_audit(
            Some(&saved.group_id),
            TRANSACTION_UPDATED,
            json!({ "transaction_id": saved.id, "amount": saved.amount }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(saved)
    }

    /// Hard-deletes the live row; the DELETE audit record with the full
    /// pre-delete snapshot is the only surviving trace, written atomically
    /// with the removal.
    pub async fn delete_transaction(
        &self,
        transaction_id: &str,
        actor: &User,
    ) -> Result<(), MessmateError> {
        info!(
            "Deleting transaction {} by user {}",
            transaction_id, actor.id
        );
        let current = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| MessmateError::TransactionNotFound(transaction_id.to_string()))?;
        self.validate_group_membership(&current.group_id, &actor.id)
            .await?;

        let history = TransactionHistory::snapshot(&current, HistoryAction::Delete, &actor.id);
        self.storage.delete_transaction(transaction_id, history).await?;

        self.invalidate_transaction_tags(&current).await?;
        self.log_and_audit(
            Some(&current.group_id),
            TRANSACTION_DELETED,
            json!({ "transaction_id": current.id, "amount": current.amount }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(())
    }

    pub async fn list_transactions(
        &self,
        group_id: &str,
        actor: &User,
        period_id: Option<&str>,
    ) -> Result<Vec<Transaction>, MessmateError> {
        self.validate_group_membership(group_id, &actor.id).await?;
        let Some(period) = self.resolve_period(group_id, period_id).await? else {
            return Ok(Vec::new());
        };

        let key = transaction_list_key(group_id, &period.id);
        if let Some(list) = self.read_cached::<Vec<Transaction>>(&key).await? {
            return Ok(list);
        }

        let list = self.storage.list_transactions(group_id, &period.id).await?;
        self.write_cached(&key, &list, &[group_tag(group_id), period_tag(&period.id)])
            .await?;
        self.log_and_audit(
            Some(group_id),
            TRANSACTIONS_QUERIED,
            json!({ "group_id": group_id, "period_id": period.id }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(list)
    }

    /// Audit trail for one transaction, ordered oldest first. Works after
    /// the live row is gone.
    pub async fn get_transaction_history(
        &self,
        group_id: &str,
        actor: &User,
        transaction_id: &str,
    ) -> Result<Vec<TransactionHistory>, MessmateError> {
        self.validate_group_membership(group_id, &actor.id).await?;

        let key = transaction_history_key(group_id, transaction_id);
        if let Some(rows) = self.read_cached::<Vec<TransactionHistory>>(&key).await? {
            return Ok(rows);
        }

        let rows = self
            .storage
            .transaction_history(group_id, transaction_id)
            .await?;
        self.write_cached(&key, &rows, &[group_tag(group_id)]).await?;
        self.log_and_audit(
            Some(group_id),
            HISTORY_QUERIED,
            json!({ "group_id": group_id, "transaction_id": transaction_id }),
            Some(actor.id.as_str()),
        )
        .await?;
        Ok(rows)
    }

    async fn invalidate_transaction_tags(
        &self,
        transaction: &Transaction,
    ) -> Result<(), MessmateError> {
        let mut tags = vec![group_tag(&transaction.group_id)];
        if let Some(pid) = &transaction.period_id {
            tags.push(period_tag(pid));
        }
        self.cache.invalidate_tags(&tags).await
    }
}
