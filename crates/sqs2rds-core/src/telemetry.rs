use anyhow::Result;
use async_trait::async_trait;

/// Trailing-window load series for one database instance. Either series may
/// be empty when the telemetry source has a gap.
#[derive(Debug, Clone, Default)]
pub struct DatabaseLoad {
    pub connections: Vec<f64>,
    pub cpu_percent: Vec<f64>,
}

/// Point-in-time message counts for one queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueDepth {
    pub visible: i64,
    pub delayed: i64,
    /// Messages reserved by consumers but not yet acknowledged.
    pub in_flight: i64,
}

/// Snapshot query against the database load telemetry source.
///
/// Pure I/O adapter: transport errors surface as `Err`, never as zero load,
/// and retries are the caller's concern.
#[async_trait]
pub trait DatabaseLoadSource: Send + Sync {
    async fn fetch_database_load(
        &self,
        instance_id: &str,
        window_minutes: u64,
    ) -> Result<DatabaseLoad>;
}

/// Snapshot query against the queue depth telemetry source.
#[async_trait]
pub trait QueueDepthSource: Send + Sync {
    async fn fetch_queue_depth(&self, queue_url: &str) -> Result<QueueDepth>;
}
