// src/config.rs
use crate::error::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const MIN_REFRESH_SECS: u64 = 5;
pub const MAX_REFRESH_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub source_url: String,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub watchlist: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            source_url: "https://query1.finance.yahoo.com".to_string(),
            cache_ttl: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(5),
            watchlist: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("QUOTE_TRACKER_ADDR") {
            config.addr = value.parse().map_err(|_| ConfigError::InvalidAddr {
                var: "QUOTE_TRACKER_ADDR",
                value,
            })?;
        }
        if let Some(value) = lookup("QUOTE_TRACKER_SOURCE_URL") {
            config.source_url = value;
        }
        if let Some(secs) = secs_var(&lookup, "QUOTE_TRACKER_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = secs_var(&lookup, "QUOTE_TRACKER_REFRESH_SECS")? {
            config.refresh_interval =
                Duration::from_secs(secs.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS));
        }
        if let Some(secs) = secs_var(&lookup, "QUOTE_TRACKER_FETCH_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(ConfigError::Zero {
                    var: "QUOTE_TRACKER_FETCH_TIMEOUT_SECS",
                });
            }
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = lookup("QUOTE_TRACKER_WATCHLIST") {
            config.watchlist = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

fn secs_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.addr.port(), 3030);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert!(config.watchlist.is_empty());
    }

    #[test]
    fn refresh_interval_is_clamped() {
        let fast = config_from(&[("QUOTE_TRACKER_REFRESH_SECS", "1")]).unwrap();
        assert_eq!(fast.refresh_interval, Duration::from_secs(MIN_REFRESH_SECS));

        let slow = config_from(&[("QUOTE_TRACKER_REFRESH_SECS", "3600")]).unwrap();
        assert_eq!(slow.refresh_interval, Duration::from_secs(MAX_REFRESH_SECS));
    }

    #[test]
    fn watchlist_is_split_on_commas() {
        let config =
            config_from(&[("QUOTE_TRACKER_WATCHLIST", "VAS.AX, ax1.ax,, SPK.AX ")]).unwrap();
        assert_eq!(config.watchlist, vec!["VAS.AX", "ax1.ax", "SPK.AX"]);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = config_from(&[("QUOTE_TRACKER_CACHE_TTL_SECS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: "QUOTE_TRACKER_CACHE_TTL_SECS", .. }
        ));
    }

    #[test]
    fn zero_fetch_timeout_is_rejected() {
        let err = config_from(&[("QUOTE_TRACKER_FETCH_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Zero { var: "QUOTE_TRACKER_FETCH_TIMEOUT_SECS" }
        ));

        let config = config_from(&[("QUOTE_TRACKER_FETCH_TIMEOUT_SECS", "1")]).unwrap();
        assert_eq!(config.fetch_timeout, Duration::from_secs(1));
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = config_from(&[("QUOTE_TRACKER_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddr { .. }));
    }
}
