use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::model::leave_balance::BalanceDefaults;
use crate::service::LeavePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    pub leave_defaults: BalanceDefaults,
    pub allow_revoke: bool,

    // Seeded at startup if missing
    pub manager_username: String,
    pub manager_password: String,
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = BalanceDefaults::default();

        Ok(Self {
            server_addr: or("SERVER_ADDR", "127.0.0.1:8080"),
            database_url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            jwt_secret: lookup("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parsed(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min

            rate_login_per_min: parsed(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_protected_per_min: parsed(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or("API_PREFIX", "/api"),
            log_dir: or("LOG_DIR", "logs"),

            leave_defaults: BalanceDefaults {
                sick_casual: parsed(&lookup, "LEAVE_DEFAULT_SICK_CASUAL", defaults.sick_casual)?,
                medical: parsed(&lookup, "LEAVE_DEFAULT_MEDICAL", defaults.medical)?,
                privileged: parsed(&lookup, "LEAVE_DEFAULT_PRIVILEGED", defaults.privileged)?,
            },
            allow_revoke: parsed(&lookup, "LEAVE_ALLOW_REVOKE", false)?,

            manager_username: or("MANAGER_USERNAME", "manager"),
            manager_password: or("MANAGER_PASSWORD", "manager123"),
        })
    }

    pub fn leave_policy(&self) -> LeavePolicy {
        LeavePolicy {
            defaults: self.leave_defaults,
            allow_revoke: self.allow_revoke,
        }
    }
}

/// Settings for the request router that fronts the leave service.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub addr: String,
    pub employee_url: String,
    pub manager_url: String,
    pub timeout_secs: u64,
    pub log_dir: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Ok(Self {
            addr: or("GATEWAY_ADDR", "0.0.0.0:3000"),
            employee_url: or("EMPLOYEE_URL", "http://127.0.0.1:8080"),
            manager_url: or("MANAGER_URL", "http://127.0.0.1:8080"),
            timeout_secs: parsed(&lookup, "GATEWAY_TIMEOUT_SECS", 30)?,
            log_dir: or("LOG_DIR", "logs"),
        })
    }
}
