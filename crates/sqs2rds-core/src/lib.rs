// sqs2rds-core - domain model and admission control
//
// Everything here is independent of AWS and the database: the telemetry
// sources and the store are traits, so the throttle evaluator and backoff
// controller are unit testable with mocks.

mod backoff;
mod record;
mod telemetry;
mod throttle;

pub use backoff::{BackoffController, BackoffOutcome, BackoffPolicy};
pub use record::{EventPayload, IncomingRecord, PersistenceOutcome, RetryReport};
pub use telemetry::{DatabaseLoad, DatabaseLoadSource, QueueDepth, QueueDepthSource};
pub use throttle::{ThrottleEvaluator, ThrottleLimits};
