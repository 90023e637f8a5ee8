use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::constants::EXPENSES_COLLECTION;

pub struct Config {
    pub log_level: String,
    pub session_idle_timeout: Duration,
    pub expenses_collection: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("expenses_collection", &self.expenses_collection)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            session_idle_timeout: Duration::from_secs(15 * 60),
            expenses_collection: EXPENSES_COLLECTION.to_string(),
            jwt_secret: "secret".to_string(),
            token_ttl: Duration::from_secs(3600),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            session_idle_timeout: env::var("SESSION_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
            expenses_collection: env::var("EXPENSES_COLLECTION").unwrap_or(defaults.expenses_collection),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret), // Use a secure secret in production
            token_ttl: env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.token_ttl),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bcrypt_cost),
        }
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
