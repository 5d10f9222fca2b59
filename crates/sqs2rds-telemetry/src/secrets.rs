use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Database credentials held in the secret store, in the shape RDS
/// provisions them.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSecret {
    pub username: String,
    pub password: String,
    pub db_instance_identifier: String,
}

// Keep the password out of Debug output and logs.
impl std::fmt::Debug for DatabaseSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSecret")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("db_instance_identifier", &self.db_instance_identifier)
            .finish()
    }
}

/// Credential lookup seam. `Ok(None)` means the secret does not exist;
/// `Err` means the lookup itself failed. The handler treats both as fatal
/// for the batch.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Option<DatabaseSecret>>;
}

/// Secrets Manager-backed resolver.
pub struct SecretsManagerResolver {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerResolver {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretResolver for SecretsManagerResolver {
    async fn resolve(&self, name: &str) -> Result<Option<DatabaseSecret>> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .with_context(|| format!("GetSecretValue failed for {}", name))?;

        let Some(raw) = response.secret_string() else {
            return Ok(None);
        };
        let secret = parse_secret(raw)?;
        Ok(Some(secret))
    }
}

fn parse_secret(raw: &str) -> Result<DatabaseSecret> {
    serde_json::from_str(raw).context("secret payload is not the expected credential shape")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rds_provisioned_shape() {
        let secret = parse_secret(
            r#"{"username":"app","password":"hunter2","dbInstanceIdentifier":"demo-db"}"#,
        )
        .unwrap();
        assert_eq!(secret.username, "app");
        assert_eq!(secret.password, "hunter2");
        assert_eq!(secret.db_instance_identifier, "demo-db");
    }

    #[test]
    fn rejects_malformed_secret() {
        assert!(parse_secret(r#"{"username":"app"}"#).is_err());
        assert!(parse_secret("not json").is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let secret = parse_secret(
            r#"{"username":"app","password":"hunter2","dbInstanceIdentifier":"demo-db"}"#,
        )
        .unwrap();
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
