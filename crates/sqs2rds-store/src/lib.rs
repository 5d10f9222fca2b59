// sqs2rds-store - durable persistence with per-record fault isolation
//
// The store exposes a typed error taxonomy at its boundary: a uniqueness
// violation is a distinguishable error kind, not a string to sniff. The
// batch engine builds on that to classify every record's outcome.

mod engine;
mod error;
mod mysql;

pub use engine::{persist_batch, EventStore};
pub use error::StoreError;
pub use mysql::{MySqlEventStore, StoreConnectOptions};
