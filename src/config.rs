use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{Duration, FixedOffset};
use dotenvy::dotenv;

use crate::engine::session::SweepPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    // Organization calendar and daily reset
    pub org_offset: FixedOffset,
    pub reset_hour: u32,
    pub sweep_grace_minutes: i64,
    pub sweep_batch_size: usize,
    pub sweep_enabled: bool,

    pub log_dir: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let offset_minutes: i32 = parsed_or("ORG_UTC_OFFSET_MINUTES", 480)?; // Asia/Taipei
        let org_offset = FixedOffset::east_opt(offset_minutes * 60)
            .with_context(|| format!("ORG_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        let reset_hour: u32 = parsed_or("RESET_HOUR", 5)?;
        if reset_hour > 23 {
            bail!("RESET_HOUR must be between 0 and 23, got {reset_hour}");
        }

        let sweep_batch_size: usize = parsed_or("SWEEP_BATCH_SIZE", 200)?;
        if sweep_batch_size == 0 {
            bail!("SWEEP_BATCH_SIZE must be positive");
        }

        let sweep_grace_minutes: i64 = parsed_or("SWEEP_GRACE_MINUTES", 60)?;
        if sweep_grace_minutes < 0 {
            bail!("SWEEP_GRACE_MINUTES must not be negative");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 86_400)?, // default 1 day

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            org_offset,
            reset_hour,
            sweep_grace_minutes,
            sweep_batch_size,
            sweep_enabled: parsed_or("SWEEP_ENABLED", true)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }

    pub fn sweep_policy(&self) -> SweepPolicy {
        SweepPolicy {
            grace: Duration::minutes(self.sweep_grace_minutes),
            batch_size: self.sweep_batch_size,
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/labclock_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 600,
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            org_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            reset_hour: 5,
            sweep_grace_minutes: 60,
            sweep_batch_size: 200,
            sweep_enabled: false,
            log_dir: "logs".into(),
        }
    }
}
