// Configuration source loading.
//
// Priority order:
// 1. Environment variables (deployment names, e.g. CHECK_COUNT)
// 2. Config file path from SQS2RDS_CONFIG
// 3. Built-in defaults

use crate::HandlerConfig;
use anyhow::{Context, Result};
use std::env;

/// Environment lookup seam so overrides are testable without touching the
/// process environment.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

pub(crate) fn load_config() -> Result<HandlerConfig> {
    let mut config = load_from_file()?.unwrap_or_default();
    apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<HandlerConfig>> {
    if let Ok(path) = env::var("SQS2RDS_CONFIG") {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: HandlerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        tracing::debug!(path = %path, "loaded config file");
        return Ok(Some(config));
    }
    Ok(None)
}

/// Apply environment overrides on top of whatever the file/defaults gave us.
pub fn apply_env_overrides(config: &mut HandlerConfig, env: &dyn EnvSource) -> Result<()> {
    set_parsed(env, "CHECK_COUNT", &mut config.throttle.base_check_count)?;
    set_parsed(
        env,
        "DB_CPU_LIMIT",
        &mut config.throttle.db_cpu_limit_percent,
    )?;
    set_parsed(
        env,
        "DB_CONNECTION_LIMIT",
        &mut config.throttle.db_connection_limit,
    )?;
    set_parsed(
        env,
        "DB_METRIC_DURATION",
        &mut config.throttle.db_metric_window_minutes,
    )?;
    set_parsed(
        env,
        "SQS_MESSAGE_LIMIT",
        &mut config.throttle.queue_in_flight_limit,
    )?;
    set_parsed(
        env,
        "THROTTLE_BASE_DELAY_MS",
        &mut config.throttle.base_delay_ms,
    )?;

    if let Some(endpoint) = env.get("PROXY_ENDPOINT") {
        config.database.proxy_endpoint = Some(endpoint);
    }
    if let Some(name) = env.get("DB_NAME") {
        config.database.name = name;
    }
    if let Some(secret) = env.get("RDS_SECRET_NAME") {
        config.database.secret_name = Some(secret);
    }
    set_parsed(
        env,
        "DB_CONNECT_TIMEOUT_SECS",
        &mut config.database.connect_timeout_secs,
    )?;
    set_parsed(env, "DB_MAX_CONNECTIONS", &mut config.database.max_connections)?;

    if let Some(url) = env.get("SQS_QUEUE_URL") {
        config.queue.url = Some(url);
    }

    Ok(())
}

fn set_parsed<T: std::str::FromStr>(env: &dyn EnvSource, key: &str, slot: &mut T) -> Result<()>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = env.get(key) {
        *slot = raw
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn env_overrides_take_priority() {
        let mut config = HandlerConfig::default();
        let env = MapEnv(HashMap::from([
            ("CHECK_COUNT", "7"),
            ("DB_CPU_LIMIT", "65.5"),
            ("SQS_MESSAGE_LIMIT", "250"),
            ("PROXY_ENDPOINT", "proxy.internal"),
            ("RDS_SECRET_NAME", "rds/demo"),
            ("SQS_QUEUE_URL", "https://queue/url"),
        ]));
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.throttle.base_check_count, 7);
        assert_eq!(config.throttle.db_cpu_limit_percent, 65.5);
        assert_eq!(config.throttle.queue_in_flight_limit, 250);
        assert_eq!(config.database.proxy_endpoint.as_deref(), Some("proxy.internal"));
        assert_eq!(config.database.secret_name.as_deref(), Some("rds/demo"));
        assert_eq!(config.queue.url.as_deref(), Some("https://queue/url"));
        // Untouched keys keep their defaults.
        assert_eq!(config.throttle.db_metric_window_minutes, 2);
    }

    #[test]
    fn malformed_numeric_override_is_an_error() {
        let mut config = HandlerConfig::default();
        let env = MapEnv(HashMap::from([("CHECK_COUNT", "many")]));
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(err.to_string().contains("CHECK_COUNT"));
    }

    #[test]
    fn absent_env_changes_nothing() {
        let mut config = HandlerConfig::default();
        apply_env_overrides(&mut config, &MapEnv(HashMap::new())).unwrap();
        assert!(config.queue.url.is_none());
        assert_eq!(config.throttle.base_check_count, 3);
    }
}
