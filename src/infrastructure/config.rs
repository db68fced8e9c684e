use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_allowed_origin: String,
    /// Attempts per ledger write before a conflict is reported to the client.
    pub write_retries: u32,
    pub log_filter: String,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let write_retries: u32 = parse_or(&lookup, "WRITE_RETRIES", 5)?;
        if write_retries == 0 {
            return Err(anyhow!("WRITE_RETRIES must be at least 1"));
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt_secret,
            token_ttl_secs: parse_or(&lookup, "TOKEN_TTL_SECS", 3600)?,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            write_retries,
            log_filter: lookup("LOG_FILTER").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_ttl_secs, 3600);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.write_retries, 5);
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        assert!(AppConfig::from_lookup(lookup_from(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "  ")])).is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("HOST", "0.0.0.0"),
            ("PORT", "5000"),
            ("WRITE_RETRIES", "3"),
            ("UPLOAD_DIR", "/var/katha/uploads"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address(), ("0.0.0.0".to_string(), 5000));
        assert_eq!(config.write_retries, 3);
        assert_eq!(config.upload_dir, PathBuf::from("/var/katha/uploads"));
    }

    #[test]
    fn test_invalid_port_reports_key() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(
            AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("WRITE_RETRIES", "0")]))
                .is_err()
        );
    }
}
