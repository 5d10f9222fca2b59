// sqs2rds-config - handler configuration
//
// Sources, in priority order:
// 1. Environment variables (the deployment's names: CHECK_COUNT,
//    DB_CPU_LIMIT, SQS_QUEUE_URL, ...)
// 2. Config file path from SQS2RDS_CONFIG
// 3. Built-in defaults
//
// Credentials never live here: the secret *name* is configuration, the
// secret value comes from the resolver at invocation time.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

mod sources;

pub use sources::EnvSource;

/// Full configuration surface consumed by one handler invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub throttle: ThrottleConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub queue: QueueConfig,
}

/// Admission-control thresholds and loop shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Throttle-evaluation rounds to run before giving up (jitter is added
    /// on top, once per invocation).
    pub base_check_count: u32,
    /// CPU utilization percent above which the database reads as saturated.
    pub db_cpu_limit_percent: f64,
    /// Connection count above which the database reads as saturated.
    pub db_connection_limit: f64,
    /// Trailing window queried from the metrics source, in minutes.
    pub db_metric_window_minutes: u64,
    /// In-flight message count above which the queue reads as saturated.
    pub queue_in_flight_limit: i64,
    /// Base sleep between saturated rounds, before the per-round jitter.
    pub base_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_check_count: 3,
            db_cpu_limit_percent: 80.0,
            db_connection_limit: 100.0,
            db_metric_window_minutes: 2,
            queue_in_flight_limit: 1000,
            base_delay_ms: 0,
        }
    }
}

impl ThrottleConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Target store coordinates. The endpoint is the proxy in front of the
/// database; pooling across invocations is the proxy's job, not ours.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub proxy_endpoint: Option<String>,
    pub name: String,
    /// Secrets Manager id holding `{username, password, dbInstanceIdentifier}`.
    pub secret_name: Option<String>,
    pub connect_timeout_secs: u64,
    /// Per-invocation pool cap; sized for the concurrent record writes of
    /// one batch.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: None,
            name: "traffic".to_string(),
            secret_name: None,
            connect_timeout_secs: 5,
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub url: Option<String>,
}

impl HandlerConfig {
    /// Load configuration from all sources with priority.
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Must hold before any invocation is served. Missing endpoint, secret
    /// name, or queue URL are deliberately *not* validated here: the handler
    /// fails the batch for redelivery instead of refusing to start.
    pub fn validate(&self) -> Result<()> {
        if self.throttle.db_cpu_limit_percent <= 0.0 {
            anyhow::bail!("throttle.db_cpu_limit_percent must be positive");
        }
        if self.throttle.db_connection_limit <= 0.0 {
            anyhow::bail!("throttle.db_connection_limit must be positive");
        }
        if self.throttle.db_metric_window_minutes == 0 {
            anyhow::bail!("throttle.db_metric_window_minutes must be at least 1");
        }
        if self.throttle.queue_in_flight_limit <= 0 {
            anyhow::bail!("throttle.queue_in_flight_limit must be positive");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }
        Ok(())
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleConfig::default(),
            database: DatabaseConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}
