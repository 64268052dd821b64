use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Deployment mode. Controls how much fault detail leaks into error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Whether panic backtraces may be included in `500` responses.
    pub fn exposes_fault_detail(self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(anyhow::anyhow!("unknown environment: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Upper bound on pooled Postgres connections.
    pub db_max_connections: u32,
    /// How long a request waits for a pooled connection before failing.
    pub db_acquire_timeout: Duration,
    /// Idle connections are closed after this long.
    pub db_idle_timeout: Duration,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "3000")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", "5")
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            db_acquire_timeout: parse_secs(&optional("DB_ACQUIRE_TIMEOUT_SECS", "30"))
                .context("DB_ACQUIRE_TIMEOUT_SECS must be a positive integer")?,
            db_idle_timeout: parse_secs(&optional("DB_IDLE_TIMEOUT_SECS", "10"))
                .context("DB_IDLE_TIMEOUT_SECS must be a positive integer")?,
            environment: optional("APP_ENV", "production")
                .parse()
                .context("APP_ENV must be 'production' or 'development'")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_secs(raw: &str) -> Result<Duration> {
    let secs: u64 = raw.trim().parse()?;
    Ok(Duration::from_secs(secs))
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
