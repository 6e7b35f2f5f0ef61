use std::env;
use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    Supabase,
    Memory,
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseBackend::Supabase => write!(f, "supabase"),
            DatabaseBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_backend: DatabaseBackend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub jwt_secret: String,
    pub server_port: u16,
    pub rollover_run_at: NaiveTime,
    pub cancellation_notice_minutes: i64,
}

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CANCELLATION_NOTICE_MINUTES: i64 = 120;
/// The notice rule only applies within one calendar day, so a full day is
/// already the strictest meaningful value.
pub const MAX_CANCELLATION_NOTICE_MINUTES: i64 = 24 * 60;

/// Parses a notice period in minutes, clamped to `0..=MAX_CANCELLATION_NOTICE_MINUTES`.
pub fn parse_notice_minutes(value: &str) -> Option<i64> {
    let minutes: i64 = value.trim().parse().ok()?;
    if minutes < 0 {
        return None;
    }
    if minutes > MAX_CANCELLATION_NOTICE_MINUTES {
        warn!(
            "CANCELLATION_NOTICE_MINUTES {} exceeds one day, using {}",
            minutes, MAX_CANCELLATION_NOTICE_MINUTES
        );
    }
    Some(minutes.min(MAX_CANCELLATION_NOTICE_MINUTES))
}

pub fn default_rollover_run_at() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 1, 0).unwrap_or(NaiveTime::MIN)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });

        let database_backend = match env::var("DATABASE_BACKEND").ok().as_deref() {
            Some("supabase") => DatabaseBackend::Supabase,
            Some("memory") => DatabaseBackend::Memory,
            Some(other) => {
                warn!("Unknown DATABASE_BACKEND '{}', falling back to detection", other);
                Self::detect_backend(&supabase_url)
            }
            None => Self::detect_backend(&supabase_url),
        };

        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });

        let config = Self {
            database_backend,
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using anon key");
                    supabase_anon_key.clone()
                }),
            supabase_url,
            supabase_anon_key,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            rollover_run_at: env::var("ROLLOVER_RUN_AT")
                .ok()
                .and_then(|value| match NaiveTime::parse_from_str(&value, "%H:%M") {
                    Ok(time) => Some(time),
                    Err(_) => {
                        warn!("ROLLOVER_RUN_AT '{}' is not HH:MM, using default", value);
                        None
                    }
                })
                .unwrap_or_else(default_rollover_run_at),
            cancellation_notice_minutes: env::var("CANCELLATION_NOTICE_MINUTES")
                .ok()
                .and_then(|minutes| parse_notice_minutes(&minutes))
                .unwrap_or(DEFAULT_CANCELLATION_NOTICE_MINUTES),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    fn detect_backend(supabase_url: &str) -> DatabaseBackend {
        if supabase_url.is_empty() {
            warn!("No database configured, using in-memory store");
            DatabaseBackend::Memory
        } else {
            DatabaseBackend::Supabase
        }
    }

    pub fn is_configured(&self) -> bool {
        let database_ready = match self.database_backend {
            DatabaseBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
            DatabaseBackend::Memory => true,
        };

        database_ready && !self.jwt_secret.is_empty()
    }

    /// Bearer token used for row access on behalf of the core services.
    pub fn database_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}
