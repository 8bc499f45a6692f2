//! Environment-driven process configuration.
//!
//! | variable                     | default        |
//! |------------------------------|----------------|
//! | `GRANTFLOW_BIND_ADDR`        | `0.0.0.0:8080` |
//! | `JWT_SECRET`                 | dev secret     |
//! | `GRANTFLOW_BOOTSTRAP_OWNER`  | none           |
//! | `GRANTFLOW_PENDING_TTL_SECS` | `900`          |
//! | `GRANTFLOW_LOG_FORMAT`       | `json`         |

use std::net::SocketAddr;

use anyhow::{Context, bail};
use chrono::Duration;

use grantflow_auth::PrincipalId;
use grantflow_infra::grant_editor::DEFAULT_PENDING_TTL_SECS;
use grantflow_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Seeded as `owner` with every applicable grant.
    pub bootstrap_owner: Option<PrincipalId>,
    pub pending_ttl: Duration,
    pub log_format: LogFormat,
}

impl ApiConfig {
    /// Dev defaults on an ephemeral port.
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            bootstrap_owner: None,
            pending_ttl: Duration::seconds(DEFAULT_PENDING_TTL_SECS),
            log_format: LogFormat::Pretty,
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("GRANTFLOW_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("GRANTFLOW_BIND_ADDR must be a socket address")?;

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ => DEV_JWT_SECRET.to_string(),
        };

        let bootstrap_owner = lookup("GRANTFLOW_BOOTSTRAP_OWNER")
            .map(|raw| raw.parse::<PrincipalId>())
            .transpose()
            .context("GRANTFLOW_BOOTSTRAP_OWNER must be a UUID")?;

        let ttl_secs = match lookup("GRANTFLOW_PENDING_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .context("GRANTFLOW_PENDING_TTL_SECS must be an integer")?,
            None => DEFAULT_PENDING_TTL_SECS,
        };
        if ttl_secs <= 0 {
            bail!("GRANTFLOW_PENDING_TTL_SECS must be positive, got {ttl_secs}");
        }

        let log_format = lookup("GRANTFLOW_LOG_FORMAT")
            .map(|raw| raw.parse::<LogFormat>())
            .transpose()
            .context("GRANTFLOW_LOG_FORMAT must be 'json' or 'pretty'")?
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            jwt_secret,
            bootstrap_owner,
            pending_ttl: Duration::seconds(ttl_secs),
            log_format,
        })
    }
}
