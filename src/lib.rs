//! # Renewal Orchestrator
//!
//! Drives ACME v2 (RFC 8555) DNS-01 certificate issuance and renewal across
//! heterogeneous targets: VOS appliances, general servers, and portals.
//! Coordinates an ACME client, pluggable DNS provider adapters, a
//! propagation verifier, a device REST adapter, and a filesystem
//! certificate store behind a single concurrent, cancellable, single-flight
//! state machine per connection.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use renewal_orchestrator::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> renewal_orchestrator::Result<()> {
//!     let config = Config::new();
//!     let config_store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
//!     let ssh_client: Arc<dyn SshClient> = Arc::new(MockSshClient::default());
//!     let certificate_store = Arc::new(CertificateStore::from_env());
//!     let device_adapter: Arc<dyn DeviceAdapter> = Arc::new(VosDeviceAdapter::new());
//!
//!     let orchestrator = RenewalOrchestrator::new(config, config_store, ssh_client, certificate_store, device_adapter);
//!     orchestrator.recover_interrupted().await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod certificate_store;
pub mod client;
pub mod config;
pub mod config_store;
pub mod crypto;
pub mod device;
pub mod dns;
pub mod error;
pub mod model;
pub mod order;
pub mod propagation;
pub mod protocol;
pub mod renewal_orchestrator;
pub mod types;

pub use account::{Account, AccountManager, KeyPair};
pub use certificate_store::CertificateStore;
pub use client::{AcmeClient, ActiveAccount, SubmittedOrder};
pub use config::Config;
pub use config_store::{CommandOutput, ConfigStore, InMemoryConfigStore, MockSshClient, SshClient, SshCredentials};
pub use device::{DeviceAdapter, VosDeviceAdapter};
pub use dns::{DnsAdapter, DnsProvider};
pub use error::{AcmeError, Result};
pub use model::{
    AcmeAccount, ApplicationType, Connection, DnsChallengeRecord, DnsProviderKind, RenewalState,
    RenewalStatus, Setting, SslProvider,
};
pub use order::{Authorization, Challenge, FinalizationRequest, NewOrderRequest, Order};
pub use propagation::PropagationVerifier;
pub use protocol::{Directory, DirectoryManager, Jwk, JwsSigner, NonceManager};
pub use renewal_orchestrator::RenewalOrchestrator;
pub use types::{ChallengeType, Contact, Identifier, OrderStatus};

/// Prelude module with the types most call sites need.
pub mod prelude {
    pub use crate::{
        AcmeClient, AcmeError, Config,
        certificate_store::CertificateStore,
        config_store::{ConfigStore, InMemoryConfigStore, MockSshClient, SshClient},
        device::{DeviceAdapter, VosDeviceAdapter},
        model::{ApplicationType, Connection, RenewalState, RenewalStatus, Setting},
        renewal_orchestrator::RenewalOrchestrator,
    };
}
