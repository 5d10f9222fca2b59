// sqs2rds-telemetry - AWS adapters for the core telemetry traits
//
// Pure I/O: point-in-time snapshot queries, no retries, no decision logic.
// The throttle evaluator owns the interpretation of what comes back.

mod cloudwatch;
mod secrets;
mod sqs;

pub use cloudwatch::CloudWatchLoadSource;
pub use secrets::{DatabaseSecret, SecretResolver, SecretsManagerResolver};
pub use sqs::SqsDepthSource;
