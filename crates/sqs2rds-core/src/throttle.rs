use crate::telemetry::{DatabaseLoadSource, QueueDepthSource};

/// Saturation thresholds consulted on every poll round.
#[derive(Debug, Clone)]
pub struct ThrottleLimits {
    pub db_connection_limit: f64,
    pub db_cpu_limit_percent: f64,
    pub db_metric_window_minutes: u64,
    pub queue_in_flight_limit: i64,
}

/// Produces one "should defer" decision per poll round by combining the
/// database and queue saturation checks with OR semantics.
///
/// Decisions are computed from fresh telemetry on every call; nothing is
/// cached across rounds.
pub struct ThrottleEvaluator<'a> {
    db: &'a dyn DatabaseLoadSource,
    queue: &'a dyn QueueDepthSource,
    limits: &'a ThrottleLimits,
    instance_id: &'a str,
    queue_url: &'a str,
}

impl<'a> ThrottleEvaluator<'a> {
    pub fn new(
        db: &'a dyn DatabaseLoadSource,
        queue: &'a dyn QueueDepthSource,
        limits: &'a ThrottleLimits,
        instance_id: &'a str,
        queue_url: &'a str,
    ) -> Self {
        Self {
            db,
            queue,
            limits,
            instance_id,
            queue_url,
        }
    }

    /// One fresh deferral decision. Telemetry errors are absorbed here and
    /// never fail the invocation.
    pub async fn should_defer(&self) -> bool {
        let database = self.database_saturated().await;
        let queue = self.queue_saturated().await;
        tracing::info!(database, queue, "throttle status");
        database || queue
    }

    async fn database_saturated(&self) -> bool {
        let load = match self
            .db
            .fetch_database_load(self.instance_id, self.limits.db_metric_window_minutes)
            .await
        {
            Ok(load) => load,
            Err(error) => {
                // Fail safe: an unreachable metrics source reads as saturated.
                tracing::warn!(%error, "database metrics fetch failed, assuming saturated");
                return true;
            }
        };

        // Fail open on a telemetry gap so missing data cannot starve the
        // consumer, but make the degraded state visible to operators.
        if load.connections.is_empty() || load.cpu_percent.is_empty() {
            tracing::warn!(
                instance_id = self.instance_id,
                "database metrics absent for the trailing window, assuming not saturated"
            );
            return false;
        }

        let connections_over = load
            .connections
            .iter()
            .any(|sample| *sample > self.limits.db_connection_limit);
        let cpu_over = load
            .cpu_percent
            .iter()
            .any(|sample| *sample > self.limits.db_cpu_limit_percent);
        if connections_over || cpu_over {
            tracing::info!(connections_over, cpu_over, "database saturated");
        }
        connections_over || cpu_over
    }

    async fn queue_saturated(&self) -> bool {
        let depth = match self.queue.fetch_queue_depth(self.queue_url).await {
            Ok(depth) => depth,
            Err(error) => {
                tracing::warn!(%error, "queue depth fetch failed, assuming saturated");
                return true;
            }
        };

        // Visible and delayed counts are observed but intentionally not part
        // of the decision: only work already claimed by consumers throttles.
        tracing::debug!(
            visible = depth.visible,
            delayed = depth.delayed,
            in_flight = depth.in_flight,
            "queue depth"
        );
        depth.in_flight > self.limits.queue_in_flight_limit
    }
}
