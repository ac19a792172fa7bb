use crate::constants::MEMBER_JOINED;
use crate::core::errors::MessmateError;
use crate::core::models::{
    group::{GroupMember, Role},
    user::User,
};
use crate::core::services::MessmateService;
use crate::infrastructure::cache::cache_keys::group_tag;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use serde_json::json;
use tracing::{info, warn};

impl<L: LoggingService, S: Storage, C: Cache> MessmateService<L, S, C> {
    /// The one roster write this core performs: admitting an approved join
    /// request, bounded by the group's seat limit. Everything else about the
    /// roster is a read-only dependency.
    pub async fn process_join_request(
        &self,
        group_id: &str,
        user: &User,
    ) -> Result<GroupMember, MessmateError> {
        info!("User {} joining group {}", user.id, group_id);
        let mut group = self.validate_group(group_id).await?;

        if group.is_member(&user.id) {
            warn!("User {} already in group {}", user.id, group_id);
            return Err(MessmateError::AlreadyGroupMember(user.id.clone()));
        }
        if group.members.len() >= group.member_limit {
            warn!("Group {} is at its member limit", group_id);
            return Err(MessmateError::GroupFull(group_id.to_string()));
        }

        let membership = GroupMember {
            user: user.clone(),
            role: Role::Member,
        };
        group.members.push(membership.clone());
        self.storage.save_group(group).await?;

        self.cache.invalidate_tags(&[group_tag(group_id)]).await?;
        self.log_and_audit(
            Some(group_id),
            MEMBER_JOINED,
            json!({ "group_id": group_id, "user_id": user.id }),
            Some(user.id.as_str()),
        )
        .await?;
        Ok(membership)
    }
}
