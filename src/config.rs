//! Server configuration.
//!
//! Everything comes from environment variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `127.0.0.1` |
//! | `PORT` | `3001` |
//! | `WORKING_DIR` | current directory |
//! | `DATABASE_PATH` | `<WORKING_DIR>/.claude-ui/claude-ui.db` |
//! | `DEV_MODE` | `true` (no auth) |
//! | `DASHBOARD_PASSWORD` | unset |
//! | `JWT_SECRET` | unset |
//! | `JWT_TTL_DAYS` | `30` |
//! | `CLAUDE_CLI_PATH` | `claude` |
//! | `AGENT_CHAIN_DELAY_MS` | `2000` |
//! | `NOTIFY_WEBHOOK_URL` | unset (notifications are only logged) |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::docs::DOCS_DIR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to resolve working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

/// Dashboard authentication settings (single password, JWT sessions).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub dashboard_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dashboard_password: None,
            jwt_secret: None,
            jwt_ttl_days: 30,
        }
    }
}

impl AuthConfig {
    /// Requests must carry a token unless the server runs in dev mode.
    pub fn auth_required(&self, dev_mode: bool) -> bool {
        !dev_mode
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub working_dir: PathBuf,
    pub database_path: PathBuf,
    pub dev_mode: bool,
    pub auth: AuthConfig,
    pub claude_cli_path: String,
    pub chain_delay: Duration,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let working_dir = match get("WORKING_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };
        let database_path = get("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| working_dir.join(DOCS_DIR).join("claude-ui.db"));

        let port = match get("PORT") {
            Some(v) => parse_number::<u16>("PORT", v)?,
            None => 3001,
        };
        let dev_mode = match get("DEV_MODE") {
            Some(v) => parse_bool("DEV_MODE", v)?,
            None => true,
        };
        let jwt_ttl_days = match get("JWT_TTL_DAYS") {
            Some(v) => parse_number::<i64>("JWT_TTL_DAYS", v)?,
            None => 30,
        };
        let chain_delay_ms = match get("AGENT_CHAIN_DELAY_MS") {
            Some(v) => parse_number::<u64>("AGENT_CHAIN_DELAY_MS", v)?,
            None => 2000,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            working_dir,
            database_path,
            dev_mode,
            auth: AuthConfig {
                dashboard_password: get("DASHBOARD_PASSWORD"),
                jwt_secret: get("JWT_SECRET"),
                jwt_ttl_days,
            },
            claude_cli_path: get("CLAUDE_CLI_PATH").unwrap_or_else(|| "claude".to_string()),
            chain_delay: Duration::from_millis(chain_delay_ms),
            notify_webhook_url: get("NOTIFY_WEBHOOK_URL"),
        })
    }
}

fn parse_number<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
        value,
    })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}
