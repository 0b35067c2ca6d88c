//! Uniform contract every DNS adapter implements, plus the shared
//! longest-suffix zone match used by the cloud providers.

use crate::error::{AcmeError, Result};
use async_trait::async_trait;

/// Record type the orchestrator asks an adapter to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsRecordType {
    Txt,
    Cname,
}

impl DnsRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRecordType::Txt => "TXT",
            DnsRecordType::Cname => "CNAME",
        }
    }
}

/// A DNS provider adapter. One instance is built per `Setting` row and
/// reused across renewals; adapters hold only credentials and an HTTP
/// client, never per-renewal state.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create a TXT record at `fqdn` (e.g. `_acme-challenge.example.com`)
    /// with the given value. Returns a provider-specific record id used
    /// later for targeted deletion.
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String>;

    /// Remove every TXT record this adapter created at `fqdn`. Best-effort:
    /// an adapter that cannot enumerate its own records falls back to a
    /// no-op rather than fail the renewal.
    async fn cleanup_txt_records(&self, fqdn: &str) -> Result<()>;

    /// Delete a single record by the id `create_txt_record` returned.
    /// Never fails the caller if the record is already gone.
    async fn delete_txt_record(&self, record_id: &str) -> Result<()>;

    /// Query the provider's own API (not public DNS) for whether `fqdn`
    /// currently carries a TXT record equal to `expected_value`.
    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool>;

    /// Create an arbitrary record, used by the manual/custom adapter's
    /// callers and by device enrollment flows that need a CNAME.
    async fn create_dns_record(
        &self,
        name: &str,
        value: &str,
        record_type: DnsRecordType,
    ) -> Result<String>;
}

/// Resolve the hosted zone for `fqdn` by longest-suffix match over the
/// zone names an account's credentials can list. Mirrors what every cloud
/// provider's console does when you type a subdomain into its UI.
pub fn longest_suffix_zone_match<'a>(fqdn: &str, zones: &'a [String]) -> Result<&'a str> {
    let fqdn = fqdn.trim_end_matches('.');
    zones
        .iter()
        .filter(|zone| {
            let zone = zone.trim_end_matches('.');
            fqdn == zone || fqdn.ends_with(&format!(".{}", zone))
        })
        .max_by_key(|zone| zone.trim_end_matches('.').len())
        .map(|zone| zone.as_str())
        .ok_or_else(|| AcmeError::zone_not_found(fqdn.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_longest_matching_suffix() {
        let zones = vec!["example.com".to_string(), "dev.example.com".to_string()];
        let zone = longest_suffix_zone_match("_acme-challenge.dev.example.com", &zones).unwrap();
        assert_eq!(zone, "dev.example.com");
    }

    #[test]
    fn falls_back_to_shorter_zone_when_only_it_matches() {
        let zones = vec!["example.com".to_string(), "other.net".to_string()];
        let zone = longest_suffix_zone_match("www.example.com", &zones).unwrap();
        assert_eq!(zone, "example.com");
    }

    #[test]
    fn errors_when_no_zone_matches() {
        let zones = vec!["example.com".to_string()];
        let err = longest_suffix_zone_match("foo.example.org", &zones).unwrap_err();
        assert!(matches!(err, AcmeError::ZoneNotFound(_)));
    }
}
