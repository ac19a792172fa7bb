mod cache_tests;
mod period_tests;

use crate::core::models::group::{Group, GroupMember, PeriodMode, Role};
use crate::core::models::period::StartPeriod;
use crate::core::models::user::User;
use crate::core::services::MessmateService;
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::Storage;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use chrono::Utc;
use uuid::Uuid;

pub type TestService = MessmateService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Returns the service plus a storage handle so tests can seed the
/// sibling-owned source records directly.
pub fn test_service() -> (TestService, InMemoryStorage) {
    init_tracing();
    let storage = InMemoryStorage::new();
    let service =
        MessmateService::new(storage.clone(), InMemoryLogging::new(), InMemoryCache::new());
    (service, storage)
}

pub fn user(name: &str) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

pub async fn seed_group(storage: &InMemoryStorage, mode: PeriodMode, users: &[User]) -> Group {
    let members = users
        .iter()
        .enumerate()
        .map(|(i, u)| GroupMember {
            user: u.clone(),
            role: if i == 0 { Role::Manager } else { Role::Member },
        })
        .collect();
    let group = Group {
        id: Uuid::new_v4().to_string(),
        name: "Flat 4B".to_string(),
        members,
        period_mode: mode,
        member_limit: 10,
    };
    storage.save_group(group.clone()).await.unwrap();
    group
}

pub fn start_input(name: &str) -> StartPeriod {
    StartPeriod {
        name: name.to_string(),
        start_date: Utc::now(),
        end_date: None,
        opening_balance: None,
        carry_forward: false,
        notes: None,
    }
}
