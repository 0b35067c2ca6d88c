//! Minimal demonstration of the orchestrator wired up with an in-memory
//! configuration store, using whichever ACME directory `Config` resolves to
//! (staging by default, or `LETSENCRYPT_STAGING=false` for production). Real
//! deployments load `Config` from a TOML file and back `ConfigStore` with a
//! real database; this binary exists to exercise the wiring, not to run in
//! production.
use renewal_orchestrator::prelude::*;
use renewal_orchestrator::{AcmeClient, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = Config::new();
    config.apply_env_overrides();

    let client = AcmeClient::new(config.staging).await?;
    println!("ACME client ready (staging={})", client.is_staging());

    let config_store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    let ssh_client: Arc<dyn SshClient> = Arc::new(MockSshClient::default());
    let certificate_store = Arc::new(CertificateStore::from_env());
    let device_adapter: Arc<dyn DeviceAdapter> = Arc::new(VosDeviceAdapter::new());

    let orchestrator = RenewalOrchestrator::new(config, config_store, ssh_client, certificate_store, device_adapter);
    orchestrator.recover_interrupted().await?;

    println!("Renewal orchestrator ready; no connections configured in this demo store.");
    Ok(())
}
