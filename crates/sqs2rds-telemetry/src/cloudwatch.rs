use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch::error::BuildError;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{
    Dimension, Metric, MetricDataQuery, MetricDataResult, MetricStat, StandardUnit,
};
use sqs2rds_core::{DatabaseLoad, DatabaseLoadSource};

// GetMetricData aligns results to these ids, not to query order.
const CONNECTIONS_QUERY_ID: &str = "databaseConnectionMetrics";
const CPU_QUERY_ID: &str = "databaseCpuMetrics";

const METRIC_PERIOD_SECS: i32 = 60;

/// RDS instance load via CloudWatch `GetMetricData`: connection count and
/// CPU utilization over the trailing window ending now.
pub struct CloudWatchLoadSource {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchLoadSource {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatabaseLoadSource for CloudWatchLoadSource {
    async fn fetch_database_load(
        &self,
        instance_id: &str,
        window_minutes: u64,
    ) -> Result<DatabaseLoad> {
        let end = chrono::Utc::now();
        let start = end - chrono::Duration::minutes(window_minutes as i64);

        let connections_query = rds_query(
            CONNECTIONS_QUERY_ID,
            "DatabaseConnections",
            StandardUnit::Count,
            instance_id,
        )
        .context("invalid connection-count metric query")?;
        let cpu_query = rds_query(
            CPU_QUERY_ID,
            "CPUUtilization",
            StandardUnit::Percent,
            instance_id,
        )
        .context("invalid cpu metric query")?;

        let response = self
            .client
            .get_metric_data()
            .metric_data_queries(connections_query)
            .metric_data_queries(cpu_query)
            .start_time(AwsDateTime::from_millis(start.timestamp_millis()))
            .end_time(AwsDateTime::from_millis(end.timestamp_millis()))
            .send()
            .await
            .context("CloudWatch GetMetricData failed")?;

        let load = load_from_results(response.metric_data_results());
        tracing::debug!(
            instance_id,
            connection_samples = load.connections.len(),
            cpu_samples = load.cpu_percent.len(),
            "fetched database load"
        );
        Ok(load)
    }
}

fn rds_query(
    id: &str,
    metric_name: &str,
    unit: StandardUnit,
    instance_id: &str,
) -> Result<MetricDataQuery, BuildError> {
    let dimension = Dimension::builder()
        .name("DBInstanceIdentifier")
        .value(instance_id)
        .build();
    let metric = Metric::builder()
        .namespace("AWS/RDS")
        .metric_name(metric_name)
        .dimensions(dimension)
        .build();
    let stat = MetricStat::builder()
        .metric(metric)
        .period(METRIC_PERIOD_SECS)
        .stat("Average")
        .unit(unit)
        .build();
    Ok(MetricDataQuery::builder().id(id).metric_stat(stat).build())
}

/// Match results to queries by id; a series the response omits stays empty
/// and reads as a telemetry gap upstream.
fn load_from_results(results: &[MetricDataResult]) -> DatabaseLoad {
    let mut load = DatabaseLoad::default();
    for result in results {
        match result.id() {
            Some(CONNECTIONS_QUERY_ID) => load.connections = result.values().to_vec(),
            Some(CPU_QUERY_ID) => load.cpu_percent = result.values().to_vec(),
            other => {
                tracing::debug!(id = ?other, "ignoring unexpected metric data result");
            }
        }
    }
    load
}
