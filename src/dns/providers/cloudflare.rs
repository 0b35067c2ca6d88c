//! Cloudflare DNS adapter, authenticated with a scoped API token.
//!
//! Record ids returned to callers are `"{zone_id}:{record_id}"` so that
//! `delete_txt_record` — which only receives the id — can address a
//! specific Cloudflare zone without the caller tracking it separately.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::dns::provider::{DnsProvider, DnsRecordType, longest_suffix_zone_match};
use crate::error::{AcmeError, Result};

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_token: String,
}

pub struct CloudflareDnsProvider {
    config: CloudflareConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CfEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CfApiError>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Deserialize, Default)]
struct CfApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CfZone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CfRecord {
    id: String,
    #[serde(default)]
    content: String,
}

impl CloudflareDnsProvider {
    pub fn new(config: CloudflareConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn err(context: &str, errors: &[CfApiError]) -> AcmeError {
        let detail = errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
        AcmeError::dns_provider(format!("cloudflare {}: {}", context, detail))
    }

    async fn list_zones(&self) -> Result<Vec<CfZone>> {
        let response = self
            .http_client
            .get(format!("{}/zones?per_page=50", API_BASE))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing cloudflare zones: {}", e)))?;

        let envelope: CfEnvelope<Vec<CfZone>> = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing cloudflare zones: {}", e)))?;

        if !envelope.success {
            return Err(Self::err("listing zones", &envelope.errors));
        }
        Ok(envelope.result.unwrap_or_default())
    }

    async fn zone_for(&self, fqdn: &str) -> Result<CfZone> {
        let zones = self.list_zones().await?;
        let names: Vec<String> = zones.iter().map(|z| z.name.clone()).collect();
        let matched = longest_suffix_zone_match(fqdn, &names)?.to_string();
        zones.into_iter().find(|z| z.name == matched).ok_or_else(|| AcmeError::zone_not_found(fqdn.to_string()))
    }

    async fn list_records(&self, zone_id: &str, fqdn: &str, record_type: &str) -> Result<Vec<CfRecord>> {
        let response = self
            .http_client
            .get(format!("{}/zones/{}/dns_records?type={}&name={}", API_BASE, zone_id, record_type, fqdn))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing cloudflare records: {}", e)))?;

        let envelope: CfEnvelope<Vec<CfRecord>> = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing cloudflare records: {}", e)))?;

        if !envelope.success {
            return Err(Self::err("listing records", &envelope.errors));
        }
        Ok(envelope.result.unwrap_or_default())
    }

    async fn delete_in_zone(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(format!("{}/zones/{}/dns_records/{}", API_BASE, zone_id, record_id))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("deleting cloudflare record: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let envelope: CfEnvelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing cloudflare response: {}", e)))?;
        if !envelope.success {
            return Err(Self::err("deleting record", &envelope.errors));
        }
        Ok(())
    }

    async fn create_record(&self, name: &str, value: &str, record_type: &str) -> Result<String> {
        let zone = self.zone_for(name).await?;
        let response = self
            .http_client
            .post(format!("{}/zones/{}/dns_records", API_BASE, zone.id))
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "type": record_type, "name": name, "content": value, "ttl": 120 }))
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("creating cloudflare record: {}", e)))?;

        let envelope: CfEnvelope<CfRecord> = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing cloudflare response: {}", e)))?;

        if !envelope.success {
            return Err(Self::err("creating record", &envelope.errors));
        }
        let record = envelope.result.ok_or_else(|| AcmeError::dns_provider("cloudflare returned no record"))?;
        tracing::info!(fqdn = name, zone = %zone.name, record_id = %record.id, "cloudflare record created");
        Ok(format!("{}:{}", zone.id, record.id))
    }
}

#[async_trait]
impl DnsProvider for CloudflareDnsProvider {
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String> {
        self.create_record(fqdn, value, "TXT").await
    }

    async fn cleanup_txt_records(&self, fqdn: &str) -> Result<()> {
        let zone = self.zone_for(fqdn).await?;
        let records = self.list_records(&zone.id, fqdn, "TXT").await?;
        for record in records {
            if let Err(e) = self.delete_in_zone(&zone.id, &record.id).await {
                tracing::warn!(fqdn, record_id = %record.id, error = %e, "cloudflare cleanup failed for one record");
            }
        }
        Ok(())
    }

    async fn delete_txt_record(&self, record_id: &str) -> Result<()> {
        let Some((zone_id, id)) = record_id.split_once(':') else {
            return Err(AcmeError::dns_provider("malformed cloudflare record id"));
        };
        self.delete_in_zone(zone_id, id).await
    }

    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        let zone = match self.zone_for(fqdn).await {
            Ok(zone) => zone,
            Err(_) => return Ok(false),
        };
        let records = self.list_records(&zone.id, fqdn, "TXT").await?;
        Ok(records.iter().any(|r| r.content == expected_value))
    }

    async fn create_dns_record(&self, name: &str, value: &str, record_type: DnsRecordType) -> Result<String> {
        self.create_record(name, value, record_type.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_round_trips_zone_and_record() {
        let id = format!("{}:{}", "zone1", "rec1");
        let (zone_id, record_id) = id.split_once(':').unwrap();
        assert_eq!(zone_id, "zone1");
        assert_eq!(record_id, "rec1");
    }
}
