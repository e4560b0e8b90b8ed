//! Server configuration
//!
//! Every setting reads from the environment (after `.env` loading) and can be
//! overridden by a command-line flag.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

use crate::auth::PasswordHasher;

const DEV_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Parser, Debug, Clone)]
#[command(name = "microshell")]
#[command(about = "MicroShell authentication and user management API")]
pub struct AppConfig {
    /// Secret used to sign and verify tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in minutes
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = 30)]
    pub access_token_expire_minutes: i64,

    /// Refresh token lifetime in days
    #[arg(long, env = "REFRESH_TOKEN_EXPIRE_DAYS", default_value_t = 7)]
    pub refresh_token_expire_days: i64,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// SQLite database path (relative paths resolve against the crate directory)
    #[arg(long, env = "AUTH_DB_PATH")]
    pub auth_db_path: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,
}

impl AppConfig {
    /// The signing secret. Debug builds fall back to a fixed development
    /// secret; release builds refuse to start without one.
    pub fn signing_secret(&self) -> Result<String> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
            _ if cfg!(debug_assertions) => {
                warn!("JWT_SECRET not set, using the development secret");
                Ok(DEV_SECRET.to_string())
            }
            _ => bail!("JWT_SECRET must be set"),
        }
    }

    pub fn access_ttl(&self) -> Result<Duration> {
        if self.access_token_expire_minutes <= 0 {
            bail!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive, got {}",
                self.access_token_expire_minutes
            );
        }
        Duration::try_minutes(self.access_token_expire_minutes).with_context(|| {
            format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES out of range: {}",
                self.access_token_expire_minutes
            )
        })
    }

    pub fn refresh_ttl(&self) -> Result<Duration> {
        if self.refresh_token_expire_days <= 0 {
            bail!(
                "REFRESH_TOKEN_EXPIRE_DAYS must be positive, got {}",
                self.refresh_token_expire_days
            );
        }
        Duration::try_days(self.refresh_token_expire_days).with_context(|| {
            format!(
                "REFRESH_TOKEN_EXPIRE_DAYS out of range: {}",
                self.refresh_token_expire_days
            )
        })
    }

    pub fn hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.bcrypt_cost)
    }

    pub fn db_path(&self) -> String {
        resolve_data_path(self.auth_db_path.clone(), "microshell.db")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_data_path(filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join(filename).to_string_lossy().to_string()
}

/// Resolve a configured path; blank means the default file, relative paths
/// are anchored at the crate directory rather than the caller's cwd.
pub fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return default_data_path(default_filename);
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(p)
        .to_string_lossy()
        .to_string()
}
