// AWS Lambda runtime adapter
//
// Consumes SQS batch events, gates persistence on live load telemetry, and
// answers with the partial-batch failure response so the queue redelivers
// exactly the failed records.
//
// Philosophy: use lambda_runtime's provided tokio; we don't add our own.

use aws_lambda_events::event::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use sqs2rds_config::HandlerConfig;
use sqs2rds_core::{IncomingRecord, RetryReport};
use sqs2rds_telemetry::{CloudWatchLoadSource, SecretsManagerResolver, SqsDepthSource};
use std::sync::Arc;

mod connect;
mod handler;

pub use handler::{process_batch, StoreConnector};

use connect::MySqlConnector;

struct HandlerState {
    config: HandlerConfig,
    secrets: SecretsManagerResolver,
    db_load: CloudWatchLoadSource,
    queue_depth: SqsDepthSource,
    connector: MySqlConnector,
}

/// Lambda handler for one SQS batch delivery.
async fn handle_event(
    event: LambdaEvent<SqsEvent>,
    state: Arc<HandlerState>,
) -> Result<SqsBatchResponse, Error> {
    let (event, _context) = event.into_parts();
    let records = records_from_event(event);
    tracing::info!(records = records.len(), "processing sqs batch");

    let report = process_batch(
        &state.config,
        &state.secrets,
        &state.db_load,
        &state.queue_depth,
        &state.connector,
        &records,
    )
    .await;
    Ok(batch_response(report))
}

fn records_from_event(event: SqsEvent) -> Vec<IncomingRecord> {
    event
        .records
        .into_iter()
        .filter_map(|message| {
            let Some(delivery_id) = message.message_id else {
                // Without a delivery id the record can be neither reported
                // nor redelivered; nothing useful to do with it.
                tracing::warn!("dropping sqs message without a message id");
                return None;
            };
            Some(IncomingRecord::new(
                delivery_id,
                message.body.unwrap_or_default(),
            ))
        })
        .collect()
}

fn batch_response(report: RetryReport) -> SqsBatchResponse {
    SqsBatchResponse {
        batch_item_failures: report
            .into_ids()
            .into_iter()
            .map(|id| BatchItemFailure {
                item_identifier: id,
            })
            .collect(),
    }
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    init_tracing();

    let config = HandlerConfig::load()?;
    tracing::info!(
        base_check_count = config.throttle.base_check_count,
        db_metric_window_minutes = config.throttle.db_metric_window_minutes,
        queue_in_flight_limit = config.throttle.queue_in_flight_limit,
        "handler configuration loaded"
    );

    // Clients discover credentials from the execution role.
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let state = Arc::new(HandlerState {
        connector: MySqlConnector::new(config.database.clone()),
        secrets: SecretsManagerResolver::new(aws_sdk_secretsmanager::Client::new(&aws_config)),
        db_load: CloudWatchLoadSource::new(aws_sdk_cloudwatch::Client::new(&aws_config)),
        queue_depth: SqsDepthSource::new(aws_sdk_sqs::Client::new(&aws_config)),
        config,
    });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| {
        let state = state.clone();
        async move { handle_event(event, state).await }
    }))
    .await
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_ansi(false))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_lambda_events::event::sqs::SqsMessage;

    fn message(id: Option<&str>, body: Option<&str>) -> SqsMessage {
        SqsMessage {
            message_id: id.map(|s| s.to_string()),
            body: body.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn event_conversion_keeps_delivery_ids_and_bodies() {
        let event = SqsEvent {
            records: vec![
                message(Some("d-1"), Some(r#"{"eventId":"e1"}"#)),
                message(Some("d-2"), None),
            ],
        };
        let records = records_from_event(event);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].delivery_id, "d-1");
        assert_eq!(records[0].body, r#"{"eventId":"e1"}"#);
        assert_eq!(records[1].body, "");
    }

    #[test]
    fn messages_without_ids_are_dropped() {
        let event = SqsEvent {
            records: vec![message(None, Some("{}")), message(Some("d-2"), Some("{}"))],
        };
        let records = records_from_event(event);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].delivery_id, "d-2");
    }

    #[test]
    fn batch_response_mirrors_the_report() {
        let mut report = RetryReport::new();
        report.push("d-7");
        report.push("d-9");
        let response = batch_response(report);
        let ids: Vec<_> = response
            .batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect();
        assert_eq!(ids, ["d-7", "d-9"]);
    }

    #[test]
    fn empty_report_means_empty_response() {
        let response = batch_response(RetryReport::new());
        assert!(response.batch_item_failures.is_empty());
    }
}
