//! DNS provider adapters: a uniform trait (`provider`), the concrete
//! implementations (`providers`), and the enum that lets the orchestrator
//! hold one without a trait object per `Setting` row.

pub mod provider;
pub mod providers;

pub use provider::{DnsProvider, DnsRecordType, longest_suffix_zone_match};
pub use providers::{
    AzureConfig, AzureDnsProvider, CloudflareConfig, CloudflareDnsProvider, CustomDnsProvider,
    DigitalOceanConfig, DigitalOceanDnsProvider, GoogleCloudDnsConfig, GoogleCloudDnsProvider,
    ManualDnsEntry,
};
#[cfg(feature = "dns-route53")]
pub use providers::{Route53Config, Route53DnsProvider};

use crate::error::{AcmeError, Result};
use crate::model::{DnsProviderKind, Setting};
use crate::propagation::PropagationVerifier;
use async_trait::async_trait;

/// Dispatches to whichever concrete adapter a `Setting` row selects.
/// An enum rather than `Box<dyn DnsProvider>` keeps adapters cheaply
/// cloneable (most wrap only a `reqwest::Client` and credentials) and
/// avoids a dynamic dispatch layer for a fixed, small set of providers.
pub enum DnsAdapter {
    Cloudflare(CloudflareDnsProvider),
    DigitalOcean(DigitalOceanDnsProvider),
    #[cfg(feature = "dns-route53")]
    Route53(Route53DnsProvider),
    Azure(AzureDnsProvider),
    GoogleCloud(GoogleCloudDnsProvider),
    Custom(CustomDnsProvider),
}

#[async_trait]
impl DnsProvider for DnsAdapter {
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String> {
        match self {
            DnsAdapter::Cloudflare(p) => p.create_txt_record(fqdn, value).await,
            DnsAdapter::DigitalOcean(p) => p.create_txt_record(fqdn, value).await,
            #[cfg(feature = "dns-route53")]
            DnsAdapter::Route53(p) => p.create_txt_record(fqdn, value).await,
            DnsAdapter::Azure(p) => p.create_txt_record(fqdn, value).await,
            DnsAdapter::GoogleCloud(p) => p.create_txt_record(fqdn, value).await,
            DnsAdapter::Custom(p) => p.create_txt_record(fqdn, value).await,
        }
    }

    async fn cleanup_txt_records(&self, fqdn: &str) -> Result<()> {
        match self {
            DnsAdapter::Cloudflare(p) => p.cleanup_txt_records(fqdn).await,
            DnsAdapter::DigitalOcean(p) => p.cleanup_txt_records(fqdn).await,
            #[cfg(feature = "dns-route53")]
            DnsAdapter::Route53(p) => p.cleanup_txt_records(fqdn).await,
            DnsAdapter::Azure(p) => p.cleanup_txt_records(fqdn).await,
            DnsAdapter::GoogleCloud(p) => p.cleanup_txt_records(fqdn).await,
            DnsAdapter::Custom(p) => p.cleanup_txt_records(fqdn).await,
        }
    }

    async fn delete_txt_record(&self, record_id: &str) -> Result<()> {
        match self {
            DnsAdapter::Cloudflare(p) => p.delete_txt_record(record_id).await,
            DnsAdapter::DigitalOcean(p) => p.delete_txt_record(record_id).await,
            #[cfg(feature = "dns-route53")]
            DnsAdapter::Route53(p) => p.delete_txt_record(record_id).await,
            DnsAdapter::Azure(p) => p.delete_txt_record(record_id).await,
            DnsAdapter::GoogleCloud(p) => p.delete_txt_record(record_id).await,
            DnsAdapter::Custom(p) => p.delete_txt_record(record_id).await,
        }
    }

    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        match self {
            DnsAdapter::Cloudflare(p) => p.verify_txt_record(fqdn, expected_value).await,
            DnsAdapter::DigitalOcean(p) => p.verify_txt_record(fqdn, expected_value).await,
            #[cfg(feature = "dns-route53")]
            DnsAdapter::Route53(p) => p.verify_txt_record(fqdn, expected_value).await,
            DnsAdapter::Azure(p) => p.verify_txt_record(fqdn, expected_value).await,
            DnsAdapter::GoogleCloud(p) => p.verify_txt_record(fqdn, expected_value).await,
            DnsAdapter::Custom(p) => p.verify_txt_record(fqdn, expected_value).await,
        }
    }

    async fn create_dns_record(&self, name: &str, value: &str, record_type: DnsRecordType) -> Result<String> {
        match self {
            DnsAdapter::Cloudflare(p) => p.create_dns_record(name, value, record_type).await,
            DnsAdapter::DigitalOcean(p) => p.create_dns_record(name, value, record_type).await,
            #[cfg(feature = "dns-route53")]
            DnsAdapter::Route53(p) => p.create_dns_record(name, value, record_type).await,
            DnsAdapter::Azure(p) => p.create_dns_record(name, value, record_type).await,
            DnsAdapter::GoogleCloud(p) => p.create_dns_record(name, value, record_type).await,
            DnsAdapter::Custom(p) => p.create_dns_record(name, value, record_type).await,
        }
    }
}

impl DnsAdapter {
    pub fn is_custom(&self) -> bool {
        matches!(self, DnsAdapter::Custom(_))
    }

    /// Builds the adapter a `Setting`-row provider name selects, reading
    /// well-known credential keys from those rows with an environment
    /// variable fallback of the same name (e.g. a `CF_TOKEN` row, or a
    /// `CF_TOKEN` env var if no row is configured).
    pub async fn from_settings(
        kind: DnsProviderKind,
        settings: &[Setting],
        verifier: PropagationVerifier,
    ) -> Result<Self> {
        let credential = |key: &str| -> Option<String> {
            settings
                .iter()
                .find(|s| s.key == key)
                .map(|s| s.value.clone())
                .or_else(|| std::env::var(key).ok())
        };
        let require = |key: &str| -> Result<String> {
            credential(key).ok_or_else(|| AcmeError::config_missing(format!("missing DNS provider credential {}", key)))
        };

        match kind {
            DnsProviderKind::Cloudflare => Ok(DnsAdapter::Cloudflare(CloudflareDnsProvider::new(CloudflareConfig {
                api_token: require("CF_TOKEN")?,
            }))),
            DnsProviderKind::Digitalocean => {
                Ok(DnsAdapter::DigitalOcean(DigitalOceanDnsProvider::new(DigitalOceanConfig {
                    api_token: require("DO_TOKEN")?,
                })))
            }
            #[cfg(feature = "dns-route53")]
            DnsProviderKind::Route53 => Ok(DnsAdapter::Route53(Route53DnsProvider::new(Route53Config::default()).await)),
            #[cfg(not(feature = "dns-route53"))]
            DnsProviderKind::Route53 => Err(AcmeError::configuration("the dns-route53 feature is not enabled in this build")),
            DnsProviderKind::Azure => Ok(DnsAdapter::Azure(AzureDnsProvider::new(AzureConfig {
                subscription_id: require("AZURE_SUBSCRIPTION_ID")?,
                resource_group: require("AZURE_RESOURCE_GROUP")?,
                client_id: require("AZURE_CLIENT_ID")?,
                client_secret: require("AZURE_CLIENT_SECRET")?,
                tenant_id: require("AZURE_TENANT_ID")?,
            }))),
            DnsProviderKind::Google => Ok(DnsAdapter::GoogleCloud(GoogleCloudDnsProvider::new(GoogleCloudDnsConfig {
                project_id: require("GCP_PROJECT_ID")?,
                access_token: require("GCP_ACCESS_TOKEN")?,
            }))),
            DnsProviderKind::Custom => Ok(DnsAdapter::Custom(CustomDnsProvider::new(verifier))),
        }
    }
}
