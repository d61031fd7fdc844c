use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use duet_db::DEFAULT_READER_POOL_SIZE;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    pub reader_pool_size: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("DUET_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("DUET_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = lookup("DUET_DB_PATH").unwrap_or_else(|| "duet.db".into()).into();
        let host = lookup("DUET_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("DUET_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("DUET_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        let ttl_hours = lookup("DUET_TOKEN_TTL_HOURS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("DUET_TOKEN_TTL_HOURS must be a whole number of hours")?
            .unwrap_or(24 * 30);
        if ttl_hours <= 0 {
            bail!("DUET_TOKEN_TTL_HOURS must be positive");
        }

        let reader_pool_size = lookup("DUET_READER_POOL_SIZE")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("DUET_READER_POOL_SIZE must be a number")?
            .unwrap_or(DEFAULT_READER_POOL_SIZE);

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl: chrono::Duration::hours(ttl_hours),
            reader_pool_size,
        })
    }
}
