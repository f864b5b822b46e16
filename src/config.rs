use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub token_ttl: Duration,
    pub max_body_size: usize,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_required = |key: &str| {
            var(key).ok_or_else(|| format!("Missing required environment variable: {key}"))
        };
        let env_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let database_url = env_required("DATABASE_URL")?;
        let secret_key = env_required("SECRET_KEY")?;
        if secret_key.trim().is_empty() {
            return Err("SECRET_KEY must not be empty".to_string());
        }

        let host: IpAddr = env_or("PASSRESET_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid PASSRESET_HOST: {e}"))?;

        let port: u16 = env_or("PASSRESET_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid PASSRESET_PORT: {e}"))?;

        let base_url = env_or("PASSRESET_BASE_URL", &format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        let ttl_secs: u64 = env_or("PASSRESET_TOKEN_TTL_SECS", "3600")
            .parse()
            .map_err(|e| format!("Invalid PASSRESET_TOKEN_TTL_SECS: {e}"))?;
        if ttl_secs == 0 {
            return Err("PASSRESET_TOKEN_TTL_SECS must be greater than zero".to_string());
        }

        let max_body_size: usize = env_or("PASSRESET_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid PASSRESET_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("PASSRESET_LOG_LEVEL", "info");

        let smtp = match (
            var("PASSRESET_SMTP_HOST"),
            var("PASSRESET_SMTP_PORT"),
            var("PASSRESET_SMTP_USER"),
            var("PASSRESET_SMTP_PASS"),
        ) {
            (Some(host), Some(port), Some(user), Some(pass)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid PASSRESET_SMTP_PORT: {e}"))?,
                from: var("PASSRESET_SMTP_FROM").unwrap_or_else(|| user.clone()),
                user,
                pass,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            secret_key,
            host,
            port,
            base_url,
            token_ttl: Duration::from_secs(ttl_secs),
            max_body_size,
            log_level,
            smtp,
        })
    }
}
