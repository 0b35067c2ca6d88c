//! Manual "custom" DNS adapter: no provider API exists, so the operator is
//! asked to publish the record by hand. `create_txt_record` never touches
//! the network — it only renders the instructions the orchestrator surfaces
//! via `RenewalStatus.manual_dns_entry`. Propagation is confirmed the same
//! way as every other adapter, by polling public resolvers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dns::provider::{DnsProvider, DnsRecordType};
use crate::error::Result;
use crate::propagation::PropagationVerifier;

/// What the operator needs to type into their DNS provider's UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualDnsEntry {
    pub record_name: String,
    pub record_value: String,
    pub instructions: String,
}

pub struct CustomDnsProvider {
    verifier: PropagationVerifier,
}

impl CustomDnsProvider {
    pub fn new(verifier: PropagationVerifier) -> Self {
        Self { verifier }
    }

    /// `record_name` is the already-prefixed name (e.g.
    /// `_acme-challenge.example.com`), matching the convention every other
    /// adapter uses for `create_txt_record`/`cleanup_txt_records`.
    pub fn render_entry(record_name: &str, value: &str) -> ManualDnsEntry {
        ManualDnsEntry {
            instructions: format!(
                "Create a TXT record named {} with the value \"{}\" at your DNS provider, then wait for it to propagate.",
                record_name, value
            ),
            record_name: record_name.to_string(),
            record_value: value.to_string(),
        }
    }
}

#[async_trait]
impl DnsProvider for CustomDnsProvider {
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String> {
        let entry = Self::render_entry(fqdn, value);
        tracing::info!(fqdn, record_name = %entry.record_name, "waiting on operator to publish manual DNS record");
        Ok(entry.record_name)
    }

    async fn cleanup_txt_records(&self, _fqdn: &str) -> Result<()> {
        // Nothing was created through an API; there is nothing to clean up.
        Ok(())
    }

    async fn delete_txt_record(&self, _record_id: &str) -> Result<()> {
        Ok(())
    }

    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        self.verifier.check_once(fqdn, expected_value).await
    }

    async fn create_dns_record(&self, name: &str, value: &str, record_type: DnsRecordType) -> Result<String> {
        if !matches!(record_type, DnsRecordType::Txt) {
            return Err(crate::error::AcmeError::dns_provider("manual adapter only supports TXT records"));
        }
        self.create_txt_record(name, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_readable_instructions() {
        let entry = CustomDnsProvider::render_entry("_acme-challenge.example.com", "abc123");
        assert_eq!(entry.record_name, "_acme-challenge.example.com");
        assert!(entry.instructions.contains("abc123"));
        assert!(entry.instructions.contains("_acme-challenge.example.com"));
    }
}
