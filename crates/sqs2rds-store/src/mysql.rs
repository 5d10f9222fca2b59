use crate::engine::EventStore;
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqs2rds_core::EventPayload;
use std::time::Duration;

/// Connection coordinates for one invocation. The endpoint is the proxy in
/// front of the database; cross-invocation pooling happens there, not here.
#[derive(Clone)]
pub struct StoreConnectOptions {
    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for StoreConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConnectOptions")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// MySQL-backed event store. One pool per invocation, sized for the
/// concurrent record writes of a single batch, closed before the invocation
/// returns.
pub struct MySqlEventStore {
    pool: MySqlPool,
}

impl MySqlEventStore {
    /// Establishes the first connection eagerly, so an unreachable store
    /// fails here rather than mid-batch.
    pub async fn connect(options: &StoreConnectOptions) -> Result<Self, StoreError> {
        let connect_options = MySqlConnectOptions::new()
            .host(&options.host)
            .username(&options.username)
            .password(&options.password)
            .database(&options.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(StoreError::Connect)?;

        tracing::debug!(
            host = %options.host,
            database = %options.database,
            max_connections = options.max_connections,
            "connected to event store"
        );
        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EventStore for MySqlEventStore {
    async fn insert_event(&self, event: &EventPayload) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO demo (event_id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&event.event_id)
            .bind(event.user_id)
            .bind(&event.created_at)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| StoreError::from_insert(&event.event_id, err))
    }
}
