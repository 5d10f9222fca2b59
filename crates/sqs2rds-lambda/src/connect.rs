use crate::handler::StoreConnector;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqs2rds_config::DatabaseConfig;
use sqs2rds_store::{MySqlEventStore, StoreConnectOptions};
use sqs2rds_telemetry::DatabaseSecret;

/// Connects to MySQL through the proxy endpoint with the resolved
/// credentials. TLS and cross-invocation pooling are the proxy's concern.
pub struct MySqlConnector {
    database: DatabaseConfig,
}

impl MySqlConnector {
    pub fn new(database: DatabaseConfig) -> Self {
        Self { database }
    }
}

#[async_trait]
impl StoreConnector for MySqlConnector {
    type Store = MySqlEventStore;

    async fn connect(&self, secret: &DatabaseSecret) -> Result<MySqlEventStore> {
        let endpoint = self
            .database
            .proxy_endpoint
            .as_deref()
            .context("database proxy endpoint is not configured")?;

        let store = MySqlEventStore::connect(&StoreConnectOptions {
            host: endpoint.to_string(),
            username: secret.username.clone(),
            password: secret.password.clone(),
            database: self.database.name.clone(),
            max_connections: self.database.max_connections,
            connect_timeout: self.database.connect_timeout(),
        })
        .await?;
        Ok(store)
    }

    async fn close(&self, store: MySqlEventStore) {
        store.close().await;
    }
}
