use thiserror::Error;

/// Errors surfaced by the persistence layer.
///
/// `Duplicate` is the expected non-error path under at-least-once delivery:
/// the logical event was already applied by an earlier delivery and the
/// uniqueness constraint rejected the re-insert.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event {event_id} already persisted")]
    Duplicate { event_id: String },

    #[error("malformed record payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("insert failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Classify an insert failure: a uniqueness violation on the event id
    /// becomes `Duplicate`, everything else stays a query error.
    pub(crate) fn from_insert(event_id: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                return Self::Duplicate {
                    event_id: event_id.to_string(),
                };
            }
        }
        Self::Query(err)
    }
}
