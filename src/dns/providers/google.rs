//! Google Cloud DNS adapter.
//!
//! Google's OAuth2 service-account flow is not reimplemented here (see
//! DESIGN.md): the adapter is constructed with an already-valid access
//! token, refreshed by whatever owns the `Setting` row before it is handed
//! to this provider.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::dns::provider::{DnsProvider, DnsRecordType, longest_suffix_zone_match};
use crate::error::{AcmeError, Result};

#[derive(Debug, Clone)]
pub struct GoogleCloudDnsConfig {
    pub project_id: String,
    pub access_token: String,
}

pub struct GoogleCloudDnsProvider {
    config: GoogleCloudDnsConfig,
    client: reqwest::Client,
}

impl GoogleCloudDnsProvider {
    pub fn new(config: GoogleCloudDnsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn managed_zone_for(&self, fqdn: &str) -> Result<String> {
        let api_url = format!(
            "https://dns.googleapis.com/dns/v1/projects/{}/managedZones",
            self.config.project_id
        );

        let response = self
            .client
            .get(&api_url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing google cloud dns zones: {}", e)))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing google cloud dns zones: {}", e)))?;

        let zones: Vec<(String, String)> = body["managedZones"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|z| {
                let name = z["dnsName"].as_str()?.trim_end_matches('.').to_string();
                let id = z["name"].as_str()?.to_string();
                Some((name, id))
            })
            .collect();

        let names: Vec<String> = zones.iter().map(|(n, _)| n.clone()).collect();
        let matched = longest_suffix_zone_match(fqdn, &names)?.to_string();
        zones
            .into_iter()
            .find(|(n, _)| *n == matched)
            .map(|(_, id)| id)
            .ok_or_else(|| AcmeError::zone_not_found(fqdn.to_string()))
    }

    async fn change_rrset(&self, zone_id: &str, name: &str, values: &[String], action: &str) -> Result<()> {
        let api_url = format!(
            "https://dns.googleapis.com/dns/v1/projects/{}/managedZones/{}/rrsets",
            self.config.project_id, zone_id
        );

        let rrdatas: Vec<String> = values.iter().map(|v| format!("\"{}\"", v)).collect();
        let changes = serde_json::json!({
            "changes": [{
                "action": action,
                "rrset": { "name": name, "type": "TXT", "ttl": 120, "rrdatas": rrdatas }
            }]
        });

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.config.access_token)
            .json(&changes)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("google cloud dns rrset change: {}", e)))?;

        if !response.status().is_success() {
            return Err(AcmeError::dns_provider(format!("google cloud dns rrset change: HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn find_rrset_values(&self, zone_id: &str, name: &str) -> Result<Vec<String>> {
        let api_url = format!(
            "https://dns.googleapis.com/dns/v1/projects/{}/managedZones/{}/rrsets",
            self.config.project_id, zone_id
        );
        let response = self
            .client
            .get(&api_url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing google cloud dns rrsets: {}", e)))?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing google cloud dns rrsets: {}", e)))?;

        Ok(body["rrsets"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|r| r["name"].as_str() == Some(name) && r["type"].as_str() == Some("TXT"))
            .flat_map(|r| r["rrdatas"].as_array().cloned().unwrap_or_default())
            .filter_map(|v| v.as_str().map(|s| s.trim_matches('"').to_string()))
            .collect())
    }
}

#[async_trait]
impl DnsProvider for GoogleCloudDnsProvider {
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String> {
        info!(fqdn, "creating google cloud dns TXT record");
        let zone_id = self.managed_zone_for(fqdn).await?;
        let name = format!("{}.", fqdn.trim_end_matches('.'));

        debug!(fqdn, zone_id = %zone_id, "creating google cloud dns rrset");
        self.change_rrset(&zone_id, &name, std::slice::from_ref(&value.to_string()), "CREATE").await?;
        Ok(format!("{}:{}", zone_id, name))
    }

    async fn cleanup_txt_records(&self, fqdn: &str) -> Result<()> {
        let zone_id = match self.managed_zone_for(fqdn).await {
            Ok(z) => z,
            Err(_) => return Ok(()),
        };
        let name = format!("{}.", fqdn.trim_end_matches('.'));
        let values = self.find_rrset_values(&zone_id, &name).await.unwrap_or_default();
        if values.is_empty() {
            return Ok(());
        }
        self.change_rrset(&zone_id, &name, &values, "DELETE").await
    }

    async fn delete_txt_record(&self, record_id: &str) -> Result<()> {
        let Some((zone_id, name)) = record_id.split_once(':') else {
            return Err(AcmeError::dns_provider("malformed google cloud dns record id"));
        };
        let values = self.find_rrset_values(zone_id, name).await.unwrap_or_default();
        if values.is_empty() {
            return Ok(());
        }
        self.change_rrset(zone_id, name, &values, "DELETE").await
    }

    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        let zone_id = match self.managed_zone_for(fqdn).await {
            Ok(z) => z,
            Err(_) => return Ok(false),
        };
        let name = format!("{}.", fqdn.trim_end_matches('.'));
        let values = self.find_rrset_values(&zone_id, &name).await.unwrap_or_default();
        Ok(values.iter().any(|v| v == expected_value))
    }

    async fn create_dns_record(&self, name: &str, value: &str, record_type: DnsRecordType) -> Result<String> {
        if !matches!(record_type, DnsRecordType::Txt) {
            return Err(AcmeError::dns_provider("google cloud dns adapter currently only creates TXT records"));
        }
        self.create_txt_record(name, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_pre_fetched_token() {
        let provider = GoogleCloudDnsProvider::new(GoogleCloudDnsConfig {
            project_id: "my-project".into(),
            access_token: "token".into(),
        });
        assert_eq!(provider.config.project_id, "my-project");
    }
}
