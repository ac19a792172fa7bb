pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::MessmateError;
pub use crate::core::services::MessmateService;
pub use crate::infrastructure::cache::in_memory::InMemoryCache;
pub use crate::infrastructure::logging::in_memory::InMemoryLogging;
pub use crate::infrastructure::storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests;
