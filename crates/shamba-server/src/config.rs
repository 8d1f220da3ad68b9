use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("SHAMBA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SHAMBA_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = get("SHAMBA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("SHAMBA_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("SHAMBA_PORT must be a port number")?;
        let token_ttl_days: i64 = get("SHAMBA_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("SHAMBA_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days <= 0 {
            bail!("SHAMBA_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            db_path: get("SHAMBA_DB_PATH").unwrap_or_else(|| "shamba.db".into()).into(),
            storage_dir: get("SHAMBA_STORAGE_DIR").unwrap_or_else(|| "./storage".into()).into(),
            public_url: get("SHAMBA_PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{}", port)),
            host,
            port,
            jwt_secret,
            token_ttl_days,
        })
    }
}
