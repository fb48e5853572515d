use std::env;

use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Pakistan Standard Time, UTC+05:00.
pub const DEFAULT_TZ_OFFSET_MINUTES: i32 = 300;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bind_addr: String,
    pub deadline_offset: FixedOffset,
    pub log_json: bool,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let offset_minutes = env_parse("UNIGUIDE_TZ_OFFSET_MINUTES", DEFAULT_TZ_OFFSET_MINUTES);
        let deadline_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| {
                format!("UNIGUIDE_TZ_OFFSET_MINUTES={offset_minutes} is not a valid UTC offset")
            })?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            max_connections: env_parse("UNIGUIDE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS).max(1),
            bind_addr: env::var("UNIGUIDE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string()),
            deadline_offset,
            log_json: env_bool("UNIGUIDE_LOG_JSON", false),
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: DEFAULT_BIND.to_string(),
            deadline_offset: FixedOffset::east_opt(DEFAULT_TZ_OFFSET_MINUTES * 60)
                .unwrap_or_else(|| Utc.fix()),
            log_json: false,
        }
    }
}

pub fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_bool_spellings() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn defaults_to_pakistan_time() {
        let settings = Settings::default();
        assert_eq!(settings.deadline_offset.local_minus_utc(), 5 * 3600);
        assert_eq!(settings.bind_addr, "0.0.0.0:8000");
        assert!(settings.database_url().is_err());
    }
}
