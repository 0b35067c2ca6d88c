//! Concrete DNS provider adapters. Every adapter except Route53 compiles in
//! unconditionally; Route53 sits behind `dns-route53` since it is the only
//! one that pulls in the AWS SDK.

pub mod azure;
pub mod cloudflare;
pub mod custom;
pub mod digitalocean;
pub mod google;
#[cfg(feature = "dns-route53")]
pub mod route53;

pub use azure::{AzureConfig, AzureDnsProvider};
pub use cloudflare::{CloudflareConfig, CloudflareDnsProvider};
pub use custom::{CustomDnsProvider, ManualDnsEntry};
pub use digitalocean::{DigitalOceanConfig, DigitalOceanDnsProvider};
pub use google::{GoogleCloudDnsConfig, GoogleCloudDnsProvider};
#[cfg(feature = "dns-route53")]
pub use route53::{Route53Config, Route53DnsProvider};
