// src/config/mod.rs
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const DEFAULT_INSTANCES_URL: &str =
    "https://raw.githubusercontent.com/EduardPrigoana/hifi-instances/refs/heads/main/instances.json";

/// Runtime configuration, read from environment variables. Invalid values
/// fall back to defaults with a warning; loading never fails.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub check_interval: Duration,
    pub refresh_interval: Duration,
    pub instances_url: String,
    pub request_timeout: Duration,
    pub max_check_history: usize,
    pub sse_keepalive: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_number("PORT", 8080),
            check_interval: Duration::from_secs(60 * env_number::<u64>("CHECK_INTERVAL_MINUTES", 60)),
            refresh_interval: Duration::from_secs(
                60 * env_number::<u64>("INSTANCE_REFRESH_MINUTES", 15),
            ),
            instances_url: env_instances_url(),
            request_timeout: Duration::from_secs(env_number::<u64>("REQUEST_TIMEOUT_SECONDS", 30)),
            max_check_history: env_number("MAX_CHECK_HISTORY", 168),
            sse_keepalive: Duration::from_secs(env_number::<u64>("SSE_KEEPALIVE_SECONDS", 30)),
        }
    }

    pub fn log(&self) {
        info!("Configuration:");
        info!("  Port: {}", self.port);
        info!("  Check Interval: {:?}", self.check_interval);
        info!("  Instance Refresh Interval: {:?}", self.refresh_interval);
        info!("  Instances URL: {}", self.instances_url);
        info!("  Request Timeout: {:?}", self.request_timeout);
        info!("  Max Check History: {}", self.max_check_history);
        info!("  SSE Keepalive: {:?}", self.sse_keepalive);
    }
}

/// Read a positive number from the environment, falling back on missing,
/// unparsable, or non-positive values.
fn env_number<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + From<u8> + std::fmt::Display + Copy,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) if value >= T::from(1u8) => value,
            _ => {
                warn!("Invalid {} value '{}', using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_instances_url() -> String {
    let raw = std::env::var("INSTANCES_URL").unwrap_or_else(|_| DEFAULT_INSTANCES_URL.to_string());
    match Url::parse(&raw) {
        Ok(_) => raw,
        Err(err) => {
            warn!("Invalid INSTANCES_URL '{}' ({}), using default", raw, err);
            DEFAULT_INSTANCES_URL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        let config = Config::from_env();
        assert_eq!(config.check_interval, Duration::from_secs(3600));
        assert_eq!(config.max_check_history, 168);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.sse_keepalive, Duration::from_secs(30));
        assert_eq!(config.instances_url, DEFAULT_INSTANCES_URL);
    }

    #[test]
    fn invalid_number_falls_back_to_default() {
        // Env vars are process-wide; this key is only touched here.
        std::env::set_var("UPTIME_TEST_BOGUS", "zero");
        assert_eq!(env_number::<u64>("UPTIME_TEST_BOGUS", 7), 7);
        std::env::set_var("UPTIME_TEST_BOGUS", "0");
        assert_eq!(env_number::<u64>("UPTIME_TEST_BOGUS", 7), 7);
        std::env::set_var("UPTIME_TEST_BOGUS", "12");
        assert_eq!(env_number::<u64>("UPTIME_TEST_BOGUS", 7), 12);
        std::env::remove_var("UPTIME_TEST_BOGUS");
    }
}
