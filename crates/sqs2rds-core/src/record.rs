use serde::Deserialize;

/// One unit of work pulled from the queue.
///
/// The delivery id is unique per delivery *attempt*, not per logical event:
/// redelivery of the same event arrives under a fresh delivery id. Duplicate
/// detection happens at the storage layer, keyed on the payload's event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRecord {
    pub delivery_id: String,
    pub body: String,
}

impl IncomingRecord {
    pub fn new(delivery_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            body: body.into(),
        }
    }
}

/// Domain fields carried in a record body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_id: String,
    pub user_id: i64,
    pub created_at: String,
}

impl EventPayload {
    /// Parse a record body. A malformed body is a per-record persistence
    /// failure, never an invocation failure.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Per-record result of a persistence attempt.
///
/// `Applied` and `DuplicateIgnored` are both terminal success from the
/// queue's perspective; only `Failed` records are reported for redelivery.
#[derive(Debug)]
pub enum PersistenceOutcome {
    Applied,
    DuplicateIgnored,
    Failed(anyhow::Error),
}

impl PersistenceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Delivery ids the queue must redeliver. Always a subset of the input
/// batch; an empty report signals the whole batch succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    ids: Vec<String>,
}

impl RetryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every record in the batch, e.g. when credentials cannot be
    /// resolved and nothing can be attempted safely.
    pub fn all_of(records: &[IncomingRecord]) -> Self {
        Self {
            ids: records.iter().map(|r| r.delivery_id.clone()).collect(),
        }
    }

    pub fn push(&mut self, delivery_id: impl Into<String>) {
        self.ids.push(delivery_id.into());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, delivery_id: &str) -> bool {
        self.ids.iter().any(|id| id == delivery_id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }
}
