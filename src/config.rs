use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Config {
    pub cache_ttl_secs: u64,
    pub default_member_limit: usize,
    pub log_level: String,
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            default_member_limit: env::var("DEFAULT_MEMBER_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
