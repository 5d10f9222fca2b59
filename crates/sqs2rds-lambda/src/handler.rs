// End-to-end orchestration for one invocation, generic over the external
// collaborators so every failure path is testable without AWS or MySQL.

use async_trait::async_trait;
use sqs2rds_config::HandlerConfig;
use sqs2rds_core::{
    BackoffController, BackoffOutcome, BackoffPolicy, DatabaseLoadSource, IncomingRecord,
    QueueDepthSource, RetryReport, ThrottleEvaluator, ThrottleLimits,
};
use sqs2rds_store::{persist_batch, EventStore};
use sqs2rds_telemetry::{DatabaseSecret, SecretResolver};

/// Store connection seam. The returned store is exclusively owned by this
/// invocation; `close` runs on every path that reached `connect`.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: EventStore;

    async fn connect(&self, secret: &DatabaseSecret) -> anyhow::Result<Self::Store>;
    async fn close(&self, store: Self::Store);
}

/// One invocation: credentials, admission gate, scoped connection, batch
/// persistence. The only output is the retry report; absence from it is
/// success.
pub async fn process_batch<C>(
    config: &HandlerConfig,
    secrets: &dyn SecretResolver,
    db_load: &dyn DatabaseLoadSource,
    queue_depth: &dyn QueueDepthSource,
    connector: &C,
    records: &[IncomingRecord],
) -> RetryReport
where
    C: StoreConnector,
{
    // Without credentials or a queue handle there is nothing safe to do:
    // fail the whole batch for redelivery before touching anything.
    let Some(secret_name) = config.database.secret_name.as_deref() else {
        tracing::error!("database secret name is not configured, failing batch");
        return RetryReport::all_of(records);
    };
    let secret = match secrets.resolve(secret_name).await {
        Ok(Some(secret)) => secret,
        Ok(None) => {
            tracing::error!(secret_name, "database secret not found, failing batch");
            return RetryReport::all_of(records);
        }
        Err(error) => {
            tracing::error!(secret_name, %error, "secret resolution failed, failing batch");
            return RetryReport::all_of(records);
        }
    };
    let Some(queue_url) = config.queue.url.as_deref() else {
        tracing::error!("queue url is not configured, failing batch");
        return RetryReport::all_of(records);
    };

    let limits = ThrottleLimits {
        db_connection_limit: config.throttle.db_connection_limit,
        db_cpu_limit_percent: config.throttle.db_cpu_limit_percent,
        db_metric_window_minutes: config.throttle.db_metric_window_minutes,
        queue_in_flight_limit: config.throttle.queue_in_flight_limit,
    };
    let evaluator = ThrottleEvaluator::new(
        db_load,
        queue_depth,
        &limits,
        &secret.db_instance_identifier,
        queue_url,
    );
    let controller = BackoffController::new(BackoffPolicy {
        base_check_count: config.throttle.base_check_count,
        base_delay: config.throttle.base_delay(),
        ..BackoffPolicy::default()
    });
    match controller.run(|| evaluator.should_defer()).await {
        BackoffOutcome::Cleared { rounds } => {
            tracing::debug!(rounds, "admission gate cleared");
        }
        BackoffOutcome::Exhausted { rounds } => {
            tracing::warn!(rounds, "saturation persisted through every round, proceeding anyway");
        }
    }

    let store = match connector.connect(&secret).await {
        Ok(store) => store,
        Err(error) => {
            tracing::error!(%error, "store connection failed, failing batch");
            return RetryReport::all_of(records);
        }
    };
    let report = persist_batch(&store, records).await;
    connector.close(store).await;
    report
}
