use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.ownerrez.com";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Runtime settings, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub api_token: String,
    pub base_url: String,
    /// Inventory size used as the occupancy denominator
    pub total_properties: u32,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    /// Secondary property data used for thumbnail backfill
    pub local_properties: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing credentials are fatal
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} not set")))
        };

        let config = Self {
            username: required("OWNERREZ_USERNAME")?,
            api_token: required("OWNERREZ_API_TOKEN")?,
            base_url: lookup("OWNERREZ_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            total_properties: parse_or(&lookup, "RENTAL_TOTAL_PROPERTIES", 1)?,
            cache_ttl_secs: parse_or(&lookup, "RENTAL_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            request_timeout_secs: parse_or(
                &lookup,
                "RENTAL_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            page_size: parse_or(&lookup, "RENTAL_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            local_properties: lookup("RENTAL_LOCAL_PROPERTIES")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        if config.page_size == 0 {
            return Err(Error::Config("RENTAL_PAGE_SIZE must be at least 1".to_string()));
        }

        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has invalid value {raw:?}"))),
        _ => Ok(default),
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
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("OWNERREZ_USERNAME", "owner@example.com"),
            ("OWNERREZ_API_TOKEN", "pt_abc"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.total_properties, 1);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.page_size, 1000);
        assert!(config.local_properties.is_none());
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let result =
            Config::from_lookup(lookup_from(&[("OWNERREZ_USERNAME", "owner@example.com")]));
        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("OWNERREZ_API_TOKEN")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_username_is_fatal() {
        let result = Config::from_lookup(lookup_from(&[
            ("OWNERREZ_USERNAME", "  "),
            ("OWNERREZ_API_TOKEN", "pt_abc"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("OWNERREZ_USERNAME", "owner@example.com"),
            ("OWNERREZ_API_TOKEN", "pt_abc"),
            ("RENTAL_TOTAL_PROPERTIES", "8"),
            ("RENTAL_CACHE_TTL_SECS", "60"),
            ("RENTAL_PAGE_SIZE", "250"),
            ("RENTAL_LOCAL_PROPERTIES", "data/properties.json"),
        ]))
        .unwrap();

        assert_eq!(config.total_properties, 8);
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.page_size, 250);
        assert_eq!(
            config.local_properties,
            Some(PathBuf::from("data/properties.json"))
        );
    }

    #[test]
    fn test_invalid_number_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("OWNERREZ_USERNAME", "owner@example.com"),
            ("OWNERREZ_API_TOKEN", "pt_abc"),
            ("RENTAL_TOTAL_PROPERTIES", "eight"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("OWNERREZ_USERNAME", "owner@example.com"),
            ("OWNERREZ_API_TOKEN", "pt_abc"),
            ("RENTAL_PAGE_SIZE", "0"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
