use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Local, NaiveTime, Offset};
use dotenvy::dotenv;
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BackendMode {
    /// Hosted Supabase-compatible service.
    Remote,
    /// In-process service for local development.
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub backend_mode: BackendMode,
    pub backend_url: String,
    pub backend_anon_key: String,
    pub http_timeout_secs: u64,

    // Browser sessions
    pub session_secret: String,
    pub session_ttl: u64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_signup_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance rules
    pub late_cutoff: NaiveTime,
    pub utc_offset: FixedOffset,
    pub default_location: String,

    // Sign-up; admin self-registration is off without a code
    pub admin_signup_code: Option<String>,
    pub seed_procedure: String,
    pub seed_poll_interval_ms: u64,
    pub seed_max_attempts: u32,
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value {raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

fn string_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let backend_mode = string_or("BACKEND_MODE", "remote")
            .parse::<BackendMode>()
            .context("BACKEND_MODE must be `remote` or `memory`")?;

        let (backend_url, backend_anon_key) = match backend_mode {
            BackendMode::Remote => (
                env::var("BACKEND_URL").context("BACKEND_URL must be set")?,
                env::var("BACKEND_ANON_KEY").context("BACKEND_ANON_KEY must be set")?,
            ),
            BackendMode::Memory => (String::new(), String::new()),
        };

        let late_cutoff = NaiveTime::parse_from_str(&string_or("LATE_CUTOFF", "09:00"), "%H:%M")
            .context("LATE_CUTOFF must look like HH:MM")?;

        let utc_offset = match env::var("UTC_OFFSET_MINUTES") {
            Ok(raw) => {
                let minutes: i32 = raw.parse().context("UTC_OFFSET_MINUTES must be an integer")?;
                match FixedOffset::east_opt(minutes * 60) {
                    Some(offset) => offset,
                    None => bail!("UTC_OFFSET_MINUTES out of range: {minutes}"),
                }
            }
            Err(_) => Local::now().offset().fix(),
        };

        Ok(Self {
            server_addr: string_or("SERVER_ADDR", "127.0.0.1:8080"),
            backend_mode,
            backend_url,
            backend_anon_key,
            http_timeout_secs: var_or("HTTP_TIMEOUT_SECS", 30)?,

            session_secret: env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            session_ttl: var_or("SESSION_TTL", 86_400)?, // default 1 day

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_signup_per_min: var_or("RATE_SIGNUP_PER_MIN", 30)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: string_or("API_PREFIX", "/api"),

            late_cutoff,
            utc_offset,
            default_location: string_or("DEFAULT_LOCATION", "Office"),

            admin_signup_code: env::var("ADMIN_SIGNUP_CODE")
                .ok()
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
            seed_procedure: string_or("SEED_PROCEDURE", "create_sample_tasks_for_user"),
            seed_poll_interval_ms: var_or("SEED_POLL_INTERVAL_MS", 500)?,
            seed_max_attempts: var_or("SEED_MAX_ATTEMPTS", 10)?,
        })
    }

    /// Settings used by the tests: in-memory backend, UTC, 09:00 cutoff.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            backend_mode: BackendMode::Memory,
            backend_url: String::new(),
            backend_anon_key: String::new(),
            http_timeout_secs: 5,
            session_secret: "test-secret".to_string(),
            session_ttl: 3600,
            rate_login_per_min: 1000,
            rate_signup_per_min: 1000,
            rate_protected_per_min: 10_000,
            api_prefix: "/api".to_string(),
            late_cutoff: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            utc_offset: FixedOffset::east_opt(0).unwrap_or(Local::now().offset().fix()),
            default_location: "Office".to_string(),
            admin_signup_code: Some("test-admin-code".to_string()),
            seed_procedure: "create_sample_tasks_for_user".to_string(),
            seed_poll_interval_ms: 10,
            seed_max_attempts: 5,
        }
    }
}
