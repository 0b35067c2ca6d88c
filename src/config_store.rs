//! Interfaces the orchestrator consumes but does not own: the operator's
//! connection/settings database, and an SSH client for the service-restart
//! step. Production wiring points these at whatever the surrounding
//! application already uses to store connections; an in-memory
//! implementation is provided for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AcmeError, Result};
use crate::model::{Connection, RenewalStatus, Setting};

/// Read/write access to connections, provider settings, and renewal status
/// records. Renewal status persistence is best-effort from the
/// orchestrator's point of view: a write failure is logged and does not
/// abort the renewal (see §4.1.3).
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_connection_by_id(&self, id: i64) -> Result<Option<Connection>>;
    async fn update_connection(&self, connection: &Connection) -> Result<()>;
    async fn get_settings_by_provider(&self, provider: &str) -> Result<Vec<Setting>>;
    async fn save_renewal_status(&self, status: &RenewalStatus) -> Result<()>;
    async fn get_renewal_status(&self, id: &str) -> Result<Option<RenewalStatus>>;
    /// All persisted statuses, used at startup for crash-recovery sweeps.
    async fn list_renewal_statuses(&self) -> Result<Vec<RenewalStatus>>;
}

/// Credentials for reaching a device over SSH.
#[derive(Debug, Clone)]
pub struct SshCredentials {
    pub host: String,
    pub user: String,
    pub pass: String,
}

/// The result of running a command over SSH: exit status plus captured output.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait SshClient: Send + Sync {
    async fn test_connection(&self, creds: &SshCredentials) -> Result<bool>;
    async fn execute_command(
        &self,
        creds: &SshCredentials,
        command: &str,
        timeout: std::time::Duration,
    ) -> Result<CommandOutput>;
}

/// In-memory config store, used by orchestrator tests and as a reference
/// implementation; production deployments back `ConfigStore` with whatever
/// database the surrounding application already uses.
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    connections: Arc<RwLock<HashMap<i64, Connection>>>,
    settings: Arc<RwLock<HashMap<String, Vec<Setting>>>>,
    statuses: Arc<RwLock<HashMap<String, RenewalStatus>>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_connection(&self, connection: Connection) {
        self.connections.write().await.insert(connection.id, connection);
    }

    pub async fn insert_settings(&self, provider: &str, settings: Vec<Setting>) {
        self.settings.write().await.insert(provider.to_string(), settings);
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_connection_by_id(&self, id: i64) -> Result<Option<Connection>> {
        Ok(self.connections.read().await.get(&id).cloned())
    }

    async fn update_connection(&self, connection: &Connection) -> Result<()> {
        self.connections
            .write()
            .await
            .insert(connection.id, connection.clone());
        Ok(())
    }

    async fn get_settings_by_provider(&self, provider: &str) -> Result<Vec<Setting>> {
        Ok(self.settings.read().await.get(provider).cloned().unwrap_or_default())
    }

    async fn save_renewal_status(&self, status: &RenewalStatus) -> Result<()> {
        self.statuses.write().await.insert(status.id.clone(), status.clone());
        Ok(())
    }

    async fn get_renewal_status(&self, id: &str) -> Result<Option<RenewalStatus>> {
        Ok(self.statuses.read().await.get(id).cloned())
    }

    async fn list_renewal_statuses(&self) -> Result<Vec<RenewalStatus>> {
        Ok(self.statuses.read().await.values().cloned().collect())
    }
}

/// SSH client stub used by tests that never actually open a socket; records
/// every command it was asked to run so assertions can inspect call history.
#[derive(Clone, Default)]
pub struct MockSshClient {
    pub should_succeed: bool,
    pub calls: Arc<RwLock<Vec<String>>>,
}

impl MockSshClient {
    pub fn succeeding() -> Self {
        Self {
            should_succeed: true,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_succeed: false,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SshClient for MockSshClient {
    async fn test_connection(&self, _creds: &SshCredentials) -> Result<bool> {
        Ok(self.should_succeed)
    }

    async fn execute_command(
        &self,
        _creds: &SshCredentials,
        command: &str,
        _timeout: std::time::Duration,
    ) -> Result<CommandOutput> {
        self.calls.write().await.push(command.to_string());
        if self.should_succeed {
            Ok(CommandOutput {
                exit_code: 0,
                stdout: "OK".to_string(),
                stderr: String::new(),
            })
        } else {
            Err(AcmeError::transport("ssh command failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApplicationType, DnsProviderKind, SslProvider};

    fn sample_connection(id: i64) -> Connection {
        Connection {
            id,
            name: "test".to_string(),
            application_type: ApplicationType::General,
            hostname: "host".to_string(),
            domain: "example.com".to_string(),
            alt_names: vec![],
            username: String::new(),
            password: String::new(),
            ssl_provider: SslProvider::AcmeAlt,
            dns_provider: DnsProviderKind::Custom,
            custom_csr: None,
            enable_ssh: false,
            auto_restart_service: false,
            last_cert_issued: None,
            cert_count_this_week: 0,
            cert_count_reset_date: None,
        }
    }

    #[tokio::test]
    async fn round_trips_connections_and_statuses() {
        let store = InMemoryConfigStore::new();
        store.insert_connection(sample_connection(1)).await;

        let found = store.get_connection_by_id(1).await.unwrap();
        assert!(found.is_some());
        assert!(store.get_connection_by_id(2).await.unwrap().is_none());

        let status = RenewalStatus::new("r1".to_string(), 1, "2026-01-01T00:00:00Z".to_string());
        store.save_renewal_status(&status).await.unwrap();
        let loaded = store.get_renewal_status("r1").await.unwrap().unwrap();
        assert_eq!(loaded.connection_id, 1);
    }

    #[tokio::test]
    async fn mock_ssh_client_records_calls_and_respects_success_flag() {
        let client = MockSshClient::failing();
        let creds = SshCredentials {
            host: "h".to_string(),
            user: "u".to_string(),
            pass: "p".to_string(),
        };
        let result = client
            .execute_command(&creds, "utils service restart Cisco Tomcat", std::time::Duration::from_secs(1))
            .await;
        assert!(result.is_err());
        assert_eq!(client.calls.read().await.len(), 1);
    }
}
