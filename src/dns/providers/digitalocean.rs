//! DigitalOcean DNS adapter (API v2).
//!
//! Record ids returned to callers are `"{domain}:{record_id}"` since
//! DigitalOcean's delete endpoint is scoped by domain, not globally unique.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::dns::provider::{DnsProvider, DnsRecordType, longest_suffix_zone_match};
use crate::error::{AcmeError, Result};

const API_BASE: &str = "https://api.digitalocean.com/v2";

#[derive(Debug, Clone)]
pub struct DigitalOceanConfig {
    pub api_token: String,
}

pub struct DigitalOceanDnsProvider {
    config: DigitalOceanConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    domains: Vec<DoDomain>,
}

#[derive(Debug, Deserialize)]
struct DoDomain {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    domain_record: DoRecord,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    domain_records: Vec<DoRecord>,
}

#[derive(Debug, Deserialize)]
struct DoRecord {
    id: u64,
    #[serde(default)]
    data: String,
    #[serde(default)]
    name: String,
}

impl DigitalOceanDnsProvider {
    pub fn new(config: DigitalOceanConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn zone_for(&self, fqdn: &str) -> Result<String> {
        let response = self
            .http_client
            .get(format!("{}/domains?per_page=200", API_BASE))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing digitalocean domains: {}", e)))?;

        let body: DomainsResponse = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing digitalocean domains: {}", e)))?;

        let names: Vec<String> = body.domains.into_iter().map(|d| d.name).collect();
        Ok(longest_suffix_zone_match(fqdn, &names)?.to_string())
    }

    fn relative_name<'a>(&self, fqdn: &'a str, zone: &str) -> &'a str {
        if fqdn == zone {
            "@"
        } else {
            fqdn.strip_suffix(&format!(".{}", zone)).unwrap_or(fqdn)
        }
    }

    async fn create_record(&self, fqdn: &str, value: &str, record_type: &str) -> Result<String> {
        let zone = self.zone_for(fqdn).await?;
        let name = self.relative_name(fqdn, &zone).to_string();

        let response = self
            .http_client
            .post(format!("{}/domains/{}/records", API_BASE, zone))
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "type": record_type, "name": name, "data": value, "ttl": 120 }))
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("digitalocean create record: {}", e)))?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AcmeError::dns_provider(format!("digitalocean create record: {}", text)));
        }

        let body: RecordResponse = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing digitalocean response: {}", e)))?;

        info!(fqdn, zone = %zone, record_id = body.domain_record.id, "digitalocean record created");
        Ok(format!("{}:{}", zone, body.domain_record.id))
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanDnsProvider {
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String> {
        self.create_record(fqdn, value, "TXT").await
    }

    async fn cleanup_txt_records(&self, fqdn: &str) -> Result<()> {
        let zone = self.zone_for(fqdn).await?;
        let name = self.relative_name(fqdn, &zone).to_string();

        let response = self
            .http_client
            .get(format!("{}/domains/{}/records?type=TXT&name={}.{}", API_BASE, zone, name, zone))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing digitalocean records: {}", e)))?;

        if !response.status().is_success() {
            return Ok(());
        }
        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing digitalocean records: {}", e)))?;

        for record in body.domain_records {
            let id = format!("{}:{}", zone, record.id);
            if let Err(e) = self.delete_txt_record(&id).await {
                warn!(fqdn, record_id = record.id, error = %e, "digitalocean cleanup failed for one record");
            }
        }
        Ok(())
    }

    async fn delete_txt_record(&self, record_id: &str) -> Result<()> {
        let Some((zone, id)) = record_id.split_once(':') else {
            return Err(AcmeError::dns_provider("malformed digitalocean record id"));
        };
        debug!(zone, id, "deleting digitalocean record");

        let response = self
            .http_client
            .delete(format!("{}/domains/{}/records/{}", API_BASE, zone, id))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("digitalocean delete record: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AcmeError::dns_provider(format!("digitalocean delete record: {}", text)));
        }
        Ok(())
    }

    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        let zone = match self.zone_for(fqdn).await {
            Ok(z) => z,
            Err(_) => return Ok(false),
        };

        let response = self
            .http_client
            .get(format!("{}/domains/{}/records?type=TXT", API_BASE, zone))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("digitalocean verify: {}", e)))?;

        if !response.status().is_success() {
            return Ok(false);
        }
        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing digitalocean records: {}", e)))?;

        let relative = self.relative_name(fqdn, &zone);
        Ok(body
            .domain_records
            .iter()
            .any(|r| r.name == relative && r.data == expected_value))
    }

    async fn create_dns_record(&self, name: &str, value: &str, record_type: DnsRecordType) -> Result<String> {
        self.create_record(name, value, record_type.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_name_strips_zone_suffix() {
        let provider = DigitalOceanDnsProvider::new(DigitalOceanConfig { api_token: "t".into() });
        assert_eq!(provider.relative_name("_acme-challenge.example.com", "example.com"), "_acme-challenge");
        assert_eq!(provider.relative_name("example.com", "example.com"), "@");
    }
}
