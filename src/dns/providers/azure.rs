//! Azure DNS adapter, authenticated with a service principal's
//! client-credentials OAuth2 flow against Azure Resource Manager.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::dns::provider::{DnsProvider, DnsRecordType, longest_suffix_zone_match};
use crate::error::{AcmeError, Result};

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

pub struct AzureDnsProvider {
    config: AzureConfig,
    client: reqwest::Client,
}

impl AzureDnsProvider {
    pub fn new(config: AzureConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn get_access_token(&self) -> Result<String> {
        let token_url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.config.tenant_id
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", "https://management.azure.com/.default"),
        ];
        let form_body = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .client
            .post(&token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form_body)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("azure oauth2 token request: {}", e)))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing azure token response: {}", e)))?;

        body["access_token"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AcmeError::dns_provider("azure token response missing access_token"))
    }

    async fn list_zones(&self, token: &str) -> Result<Vec<String>> {
        let api_url = format!(
            "https://management.azure.com/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/dnsZones?api-version=2018-05-01",
            self.config.subscription_id, self.config.resource_group
        );

        let response = self
            .client
            .get(&api_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("listing azure zones: {}", e)))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AcmeError::dns_provider(format!("parsing azure zone list: {}", e)))?;

        Ok(body["value"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|z| z["name"].as_str().map(|s| s.to_string()))
            .collect())
    }

    fn relative_name<'a>(&self, fqdn: &'a str, zone: &str) -> &'a str {
        if fqdn == zone {
            "@"
        } else {
            fqdn.strip_suffix(&format!(".{}", zone)).unwrap_or(fqdn)
        }
    }

    fn record_url(&self, zone: &str, relative_name: &str) -> String {
        format!(
            "https://management.azure.com/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/dnsZones/{}/TXT/{}?api-version=2018-05-01",
            self.config.subscription_id, self.config.resource_group, zone, relative_name
        )
    }
}

#[async_trait]
impl DnsProvider for AzureDnsProvider {
    async fn create_txt_record(&self, fqdn: &str, value: &str) -> Result<String> {
        info!(fqdn, "creating azure TXT record");

        let token = self.get_access_token().await?;
        let zones = self.list_zones(&token).await?;
        let zone = longest_suffix_zone_match(fqdn, &zones)?.to_string();
        let relative_name = self.relative_name(fqdn, &zone).to_string();

        let body = serde_json::json!({
            "properties": { "TTL": 120, "TXTRecords": [{ "value": [value] }] }
        });

        debug!(fqdn, zone = %zone, "creating azure dns record");
        let response = self
            .client
            .put(self.record_url(&zone, &relative_name))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("creating azure record: {}", e)))?;

        if !response.status().is_success() {
            return Err(AcmeError::dns_provider(format!("azure create record: HTTP {}", response.status())));
        }

        Ok(format!("{}:{}", zone, relative_name))
    }

    async fn cleanup_txt_records(&self, fqdn: &str) -> Result<()> {
        let token = self.get_access_token().await?;
        let zones = self.list_zones(&token).await?;
        let zone = match longest_suffix_zone_match(fqdn, &zones) {
            Ok(z) => z.to_string(),
            Err(_) => return Ok(()),
        };
        let relative_name = self.relative_name(fqdn, &zone).to_string();
        self.delete_txt_record(&format!("{}:{}", zone, relative_name)).await
    }

    async fn delete_txt_record(&self, record_id: &str) -> Result<()> {
        let Some((zone, relative_name)) = record_id.split_once(':') else {
            return Err(AcmeError::dns_provider("malformed azure record id"));
        };
        let token = self.get_access_token().await?;

        let response = self
            .client
            .delete(self.record_url(zone, relative_name))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("deleting azure record: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(AcmeError::dns_provider(format!("azure delete record: HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn verify_txt_record(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        let token = match self.get_access_token().await {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };
        let zones = match self.list_zones(&token).await {
            Ok(z) => z,
            Err(_) => return Ok(false),
        };
        let zone = match longest_suffix_zone_match(fqdn, &zones) {
            Ok(z) => z.to_string(),
            Err(_) => return Ok(false),
        };
        let relative_name = self.relative_name(fqdn, &zone).to_string();

        let response = match self.client.get(self.record_url(&zone, &relative_name)).bearer_auth(&token).send().await {
            Ok(r) => r,
            Err(_) => return Ok(false),
        };
        if !response.status().is_success() {
            return Ok(false);
        }
        let body: serde_json::Value = match response.json().await {
            Ok(b) => b,
            Err(_) => return Ok(false),
        };

        if let Some(records) = body["properties"]["TXTRecords"].as_array() {
            for record in records {
                if let Some(values) = record["value"].as_array() {
                    for v in values {
                        if v.as_str() == Some(expected_value) {
                            return Ok(true);
                        }
                    }
                }
            }
        }
        Ok(false)
    }

    async fn create_dns_record(&self, name: &str, value: &str, record_type: DnsRecordType) -> Result<String> {
        if !matches!(record_type, DnsRecordType::Txt) {
            return Err(AcmeError::dns_provider("azure adapter currently only creates TXT records"));
        }
        self.create_txt_record(name, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AzureDnsProvider {
        AzureDnsProvider::new(AzureConfig {
            subscription_id: "sub123".into(),
            resource_group: "rg1".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            tenant_id: "tenant".into(),
        })
    }

    #[test]
    fn relative_name_strips_zone_suffix() {
        let provider = provider();
        assert_eq!(provider.relative_name("example.com", "example.com"), "@");
        assert_eq!(provider.relative_name("_acme-challenge.example.com", "example.com"), "_acme-challenge");
        assert_eq!(provider.relative_name("sub.example.com", "example.com"), "sub");
    }
}
