use super::user::User;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Manager,
    Member,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Manager => "MANAGER",
            Role::Member => "MEMBER",
        };
        write!(f, "{}", s)
    }
}

/// How accounting periods are opened for a group: rolled over automatically
/// each calendar month, or managed by hand.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodMode {
    Monthly,
    Custom,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupMember {
    pub user: User,
    pub role: Role,
}

impl GroupMember {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<GroupMember>,
    pub period_mode: PeriodMode,
    pub member_limit: usize,
}

impl Group {
    pub fn member(&self, user_id: &str) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.user.id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }
}
