use crate::payments::error::{PaymentError, PaymentResult};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Where configuration values come from. The process environment in
/// production, a plain map in tests.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| v.to_string())
    }
}

pub fn required(source: &impl ConfigSource, key: &str) -> PaymentResult<String> {
    match source.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(_) => Err(PaymentError::config(format!("{} cannot be empty", key))),
        None => Err(PaymentError::config(format!("{} not set", key))),
    }
}

pub fn optional_or(source: &impl ConfigSource, key: &str, default: &str) -> String {
    source
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Unset means no timeout.
pub fn timeout(source: &impl ConfigSource, key: &str) -> PaymentResult<Option<Duration>> {
    match source.get(key) {
        None => Ok(None),
        Some(raw) => {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                PaymentError::config(format!("{} must be a whole number of seconds", key))
            })?;
            if secs == 0 {
                return Err(PaymentError::config(format!(
                    "{} must be greater than 0",
                    key
                )));
            }
            Ok(Some(Duration::from_secs(secs)))
        }
    }
}

pub fn validate_url(key: &str, value: &str) -> PaymentResult<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| PaymentError::config(format!("{} is not a valid URL: {}", key, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PaymentError::config(format!(
            "{} must be an http(s) URL, got {}",
            key, value
        )));
    }
    Ok(())
}

/// Join a base URL and an absolute path without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive
    pub filter: String,
    pub json: bool,
}

impl LogConfig {
    pub fn from_source(source: &impl ConfigSource) -> Self {
        Self {
            filter: optional_or(source, "RUST_LOG", "info"),
            json: source
                .get("LOG_FORMAT")
                .map(|f| f.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_missing_and_blank() {
        let source: HashMap<&str, &str> = HashMap::from([("PASSKEY", "  ")]);
        let missing = required(&source, "CONSUMER_KEY").unwrap_err();
        assert_eq!(missing.to_string(), "Configuration error: CONSUMER_KEY not set");

        let blank = required(&source, "PASSKEY").unwrap_err();
        assert_eq!(blank.to_string(), "Configuration error: PASSKEY cannot be empty");
    }

    #[test]
    fn test_optional_or_falls_back_on_blank() {
        let source: HashMap<&str, &str> = HashMap::from([("A", ""), ("B", "value")]);
        assert_eq!(optional_or(&source, "A", "default"), "default");
        assert_eq!(optional_or(&source, "B", "default"), "value");
        assert_eq!(optional_or(&source, "C", "default"), "default");
    }

    #[test]
    fn test_timeout_parsing() {
        let source: HashMap<&str, &str> =
            HashMap::from([("OK", "15"), ("ZERO", "0"), ("BAD", "soon")]);
        assert_eq!(timeout(&source, "UNSET").unwrap(), None);
        assert_eq!(timeout(&source, "OK").unwrap(), Some(Duration::from_secs(15)));
        assert!(timeout(&source, "ZERO").is_err());
        assert!(timeout(&source, "BAD").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("X", "https://sandbox.safaricom.co.ke").is_ok());
        assert!(validate_url("X", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("X", "ftp://example.com").is_err());
        assert!(validate_url("X", "not a url").is_err());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("https://api.sandbox.paypal.com/", "/v1/oauth2/token"),
            "https://api.sandbox.paypal.com/v1/oauth2/token"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:9000", "/oauth/v1/generate"),
            "http://127.0.0.1:9000/oauth/v1/generate"
        );
    }

    #[test]
    fn test_log_config_defaults() {
        let empty: HashMap<&str, &str> = HashMap::new();
        let config = LogConfig::from_source(&empty);
        assert_eq!(config.filter, "info");
        assert!(!config.json);

        let json: HashMap<&str, &str> = HashMap::from([("LOG_FORMAT", "JSON"), ("RUST_LOG", "debug")]);
        let config = LogConfig::from_source(&json);
        assert_eq!(config.filter, "debug");
        assert!(config.json);
    }
}
