//! REST adapter for VOS appliances (CUCM, IM&P, and similar Cisco voice
//! platforms): CSR generation, identity certificate upload, and trust
//! bundle reconciliation. Appliances commonly present a self-signed cert
//! before their own renewal completes, so TLS validation is disabled here
//! the same way the ACME client would refuse to (the device is the thing
//! being fixed, not the thing being trusted).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AcmeError, Result};
use crate::model::Connection;

const TOMCAT_SERVICE: &str = "tomcat";

#[derive(Debug, Deserialize)]
struct CsrResponse {
    csr: String,
}

/// Normalizes PEM text for equality comparisons (whitespace differences
/// between what we hold and what the device reports shouldn't count as
/// "different certificates").
fn normalize_pem(pem: &str) -> String {
    pem.split_whitespace().collect::<Vec<_>>().join("")
}

#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    async fn generate_csr(&self, conn: &Connection) -> Result<String>;
    async fn upload_identity_certificate(&self, conn: &Connection, leaf_pem: &str) -> Result<()>;
    async fn list_trust_certificates(&self, conn: &Connection) -> Result<Vec<String>>;
    async fn upload_trust_certificates(&self, conn: &Connection, chain_pems: &[String]) -> Result<()>;
}

pub struct VosDeviceAdapter {
    client: reqwest::Client,
}

impl Default for VosDeviceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl VosDeviceAdapter {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client with relaxed TLS validation should always build");
        Self { client }
    }

    fn base_url(&self, conn: &Connection) -> String {
        format!("https://{}", conn.fqdn())
    }
}

#[async_trait]
impl DeviceAdapter for VosDeviceAdapter {
    async fn generate_csr(&self, conn: &Connection) -> Result<String> {
        let url = format!("{}/platformcom/api/v1/certmgr/config/csr", self.base_url(conn));
        let mut body = serde_json::json!({
            "service": TOMCAT_SERVICE,
            "distribution": "this-server",
            "commonName": conn.fqdn(),
            "keyType": "rsa",
            "keyLength": 2048,
            "hashAlgorithm": "sha256",
        });
        if !conn.alt_names.is_empty() {
            body["altNames"] = serde_json::json!(conn.alt_names);
        }

        info!(fqdn = %conn.fqdn(), "requesting CSR from device");
        let response = self
            .client
            .post(&url)
            .basic_auth(&conn.username, Some(&conn.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("device CSR request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AcmeError::device_api(status.as_u16(), text));
        }

        let parsed: CsrResponse = response
            .json()
            .await
            .map_err(|e| AcmeError::device_api(status.as_u16(), format!("unparsable CSR response: {}", e)))?;
        Ok(parsed.csr)
    }

    async fn upload_identity_certificate(&self, conn: &Connection, leaf_pem: &str) -> Result<()> {
        let url = format!(
            "{}/platformcom/api/v1/certmgr/config/identity/certificates",
            self.base_url(conn)
        );
        let body = serde_json::json!({
            "service": TOMCAT_SERVICE,
            "certificates": [leaf_pem],
        });

        info!(fqdn = %conn.fqdn(), "uploading identity certificate to device");
        let response = self
            .client
            .post(&url)
            .basic_auth(&conn.username, Some(&conn.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("device identity upload: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(AcmeError::device_api(status.as_u16(), text))
        }
    }

    async fn list_trust_certificates(&self, conn: &Connection) -> Result<Vec<String>> {
        let url = format!(
            "{}/platformcom/api/v1/certmgr/config/trust/certificate?service={}",
            self.base_url(conn),
            TOMCAT_SERVICE
        );

        let response = match self
            .client
            .get(&url)
            .basic_auth(&conn.username, Some(&conn.password))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(fqdn = %conn.fqdn(), error = %e, "listing trust certificates failed, treating as empty");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            warn!(fqdn = %conn.fqdn(), status = %response.status(), "listing trust certificates failed, treating as empty");
            return Ok(Vec::new());
        }

        #[derive(Deserialize)]
        struct TrustListResponse {
            #[serde(default)]
            certificates: Vec<String>,
        }
        match response.json::<TrustListResponse>().await {
            Ok(parsed) => Ok(parsed.certificates),
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn upload_trust_certificates(&self, conn: &Connection, chain_pems: &[String]) -> Result<()> {
        let existing = self.list_trust_certificates(conn).await?;
        let existing_normalized: Vec<String> = existing.iter().map(|p| normalize_pem(p)).collect();

        let new_only: Vec<String> = chain_pems
            .iter()
            .filter(|p| !existing_normalized.contains(&normalize_pem(p)))
            .cloned()
            .collect();

        if new_only.is_empty() {
            debug!(fqdn = %conn.fqdn(), "trust bundle already contains all chain certificates, skipping upload");
            return Ok(());
        }

        let url = format!(
            "{}/platformcom/api/v1/certmgr/config/trust/certificates",
            self.base_url(conn)
        );
        let body = serde_json::json!({
            "service": [TOMCAT_SERVICE],
            "certificates": new_only,
            "description": "Trust Certificate",
        });

        info!(fqdn = %conn.fqdn(), count = new_only.len(), "uploading trust certificates to device");
        let response = self
            .client
            .post(&url)
            .basic_auth(&conn.username, Some(&conn.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("device trust upload: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(AcmeError::device_api(status.as_u16(), text))
        }
    }
}

/// Splits a downloaded certificate chain into the leaf (first certificate)
/// and the remaining intermediates, at PEM boundaries.
pub fn split_leaf_and_chain(fullchain_pem: &str) -> (String, Vec<String>) {
    let mut certs = Vec::new();
    let mut current = String::new();
    for line in fullchain_pem.lines() {
        current.push_str(line);
        current.push('\n');
        if line.trim() == "-----END CERTIFICATE-----" {
            certs.push(std::mem::take(&mut current));
        }
    }
    if certs.is_empty() {
        return (fullchain_pem.to_string(), Vec::new());
    }
    let leaf = certs.remove(0);
    (leaf, certs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_A: &str = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
    const CERT_B: &str = "-----BEGIN CERTIFICATE-----\nBBBB\n-----END CERTIFICATE-----\n";

    #[test]
    fn splits_leaf_from_intermediates() {
        let fullchain = format!("{}{}", CERT_A, CERT_B);
        let (leaf, chain) = split_leaf_and_chain(&fullchain);
        assert!(leaf.contains("AAAA"));
        assert_eq!(chain.len(), 1);
        assert!(chain[0].contains("BBBB"));
    }

    #[test]
    fn single_certificate_has_no_intermediates() {
        let (leaf, chain) = split_leaf_and_chain(CERT_A);
        assert!(leaf.contains("AAAA"));
        assert!(chain.is_empty());
    }

    #[test]
    fn normalize_pem_ignores_whitespace_differences() {
        let a = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        let b = "-----BEGIN CERTIFICATE----- AAAA -----END CERTIFICATE-----";
        assert_eq!(normalize_pem(a), normalize_pem(b));
    }
}
