use crate::error::StoreError;
use async_trait::async_trait;
use sqs2rds_core::{EventPayload, IncomingRecord, PersistenceOutcome, RetryReport};

/// Insert seam between the batch engine and the physical store.
///
/// `&self` so one store serves a whole batch concurrently; implementations
/// report a uniqueness violation as `StoreError::Duplicate`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &EventPayload) -> Result<(), StoreError>;
}

/// Persist every record in the batch with per-record fault isolation.
///
/// All records are fired concurrently and joined once every attempt has
/// settled; one record's failure never aborts its siblings, and there is no
/// batch-wide transaction. Partial failure is communicated solely through
/// the returned report.
pub async fn persist_batch<S>(store: &S, records: &[IncomingRecord]) -> RetryReport
where
    S: EventStore + ?Sized,
{
    let outcomes = futures::future::join_all(
        records
            .iter()
            .map(|record| async move { (record, persist_record(store, record).await) }),
    )
    .await;

    let mut report = RetryReport::new();
    let (mut applied, mut duplicates, mut failed) = (0usize, 0usize, 0usize);
    for (record, outcome) in outcomes {
        match outcome {
            PersistenceOutcome::Applied => applied += 1,
            PersistenceOutcome::DuplicateIgnored => duplicates += 1,
            PersistenceOutcome::Failed(cause) => {
                tracing::error!(
                    delivery_id = %record.delivery_id,
                    error = %cause,
                    "record persistence failed, reporting for redelivery"
                );
                failed += 1;
                report.push(record.delivery_id.clone());
            }
        }
    }

    tracing::info!(applied, duplicates, failed, "batch persisted");
    report
}

async fn persist_record<S>(store: &S, record: &IncomingRecord) -> PersistenceOutcome
where
    S: EventStore + ?Sized,
{
    let payload = match EventPayload::parse(&record.body) {
        Ok(payload) => payload,
        Err(err) => return PersistenceOutcome::Failed(StoreError::MalformedPayload(err).into()),
    };

    match store.insert_event(&payload).await {
        Ok(()) => PersistenceOutcome::Applied,
        Err(err) if err.is_duplicate() => {
            tracing::info!(
                event_id = %payload.event_id,
                delivery_id = %record.delivery_id,
                "event already persisted, ignoring redelivery"
            );
            PersistenceOutcome::DuplicateIgnored
        }
        Err(err) => PersistenceOutcome::Failed(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory store keyed on event id, mimicking the uniqueness
    /// constraint. Event ids listed in `poisoned` fail with a query error.
    #[derive(Default)]
    struct FakeStore {
        seen: Mutex<HashSet<String>>,
        poisoned: HashSet<String>,
    }

    impl FakeStore {
        fn with_existing(ids: &[&str]) -> Self {
            Self {
                seen: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
                poisoned: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl EventStore for FakeStore {
        async fn insert_event(&self, event: &EventPayload) -> Result<(), StoreError> {
            if self.poisoned.contains(&event.event_id) {
                return Err(StoreError::Query(sqlx::Error::PoolClosed));
            }
            let mut seen = self.seen.lock().unwrap();
            if !seen.insert(event.event_id.clone()) {
                return Err(StoreError::Duplicate {
                    event_id: event.event_id.clone(),
                });
            }
            Ok(())
        }
    }

    fn record(delivery_id: &str, event_id: &str) -> IncomingRecord {
        IncomingRecord::new(
            delivery_id,
            format!(
                r#"{{"eventId":"{}","userId":7,"createdAt":"2024-05-01 12:00:00"}}"#,
                event_id
            ),
        )
    }

    #[tokio::test]
    async fn fresh_records_all_apply() {
        let store = FakeStore::default();
        let records = vec![record("d-1", "evt-1"), record("d-2", "evt-2")];
        let report = persist_batch(&store, &records).await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn duplicate_is_not_reported_for_retry() {
        let store = FakeStore::with_existing(&["evt-1"]);
        let records = vec![record("d-1", "evt-1")];
        let report = persist_batch(&store, &records).await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn mixed_batch_reports_exactly_the_failed_record() {
        // One duplicate of an already-applied event, one malformed numeric
        // user id, one fresh record.
        let store = FakeStore::with_existing(&["evt-dup"]);
        let records = vec![
            record("d-dup", "evt-dup"),
            IncomingRecord::new(
                "d-bad",
                r#"{"eventId":"evt-bad","userId":"NaN","createdAt":"2024-05-01"}"#,
            ),
            record("d-fresh", "evt-fresh"),
        ];

        let report = persist_batch(&store, &records).await;
        assert_eq!(report.ids(), ["d-bad"]);
    }

    #[tokio::test]
    async fn one_store_failure_does_not_block_siblings() {
        let mut store = FakeStore::default();
        store.poisoned.insert("evt-2".to_string());
        let records = vec![
            record("d-1", "evt-1"),
            record("d-2", "evt-2"),
            record("d-3", "evt-3"),
        ];

        let report = persist_batch(&store, &records).await;
        assert_eq!(report.ids(), ["d-2"]);
        assert!(store.seen.lock().unwrap().contains("evt-1"));
        assert!(store.seen.lock().unwrap().contains("evt-3"));
    }

    #[tokio::test]
    async fn report_is_a_subset_of_input_delivery_ids() {
        let mut store = FakeStore::with_existing(&["evt-1"]);
        store.poisoned.insert("evt-3".to_string());
        let records = vec![
            record("d-1", "evt-1"),
            IncomingRecord::new("d-2", "not json at all"),
            record("d-3", "evt-3"),
            record("d-4", "evt-4"),
        ];

        let report = persist_batch(&store, &records).await;
        assert!(report.len() <= records.len());
        for id in report.ids() {
            assert!(records.iter().any(|r| &r.delivery_id == id));
        }
        assert!(report.contains("d-2"));
        assert!(report.contains("d-3"));
        assert!(!report.contains("d-1"));
        assert!(!report.contains("d-4"));
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_report() {
        let store = FakeStore::default();
        let report = persist_batch(&store, &[]).await;
        assert!(report.is_empty());
    }
}
