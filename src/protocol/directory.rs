//! ACME directory discovery (RFC 8555 §7.1.1)

use crate::error::{AcmeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Directory {
    #[serde(rename = "newNonce")]
    pub new_nonce: String,
    #[serde(rename = "newAccount")]
    pub new_account: String,
    #[serde(rename = "newOrder")]
    pub new_order: String,
    #[serde(rename = "revokeCert")]
    pub revoke_cert: String,
    #[serde(rename = "keyChange")]
    pub key_change: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DirectoryMeta>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryMeta {
    #[serde(rename = "termsOfService")]
    pub terms_of_service: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "caaIdentities")]
    pub caa_identities: Option<Vec<String>>,
    #[serde(rename = "externalAccountRequired")]
    pub external_account_required: Option<bool>,
}

/// Fetches and caches the ACME directory document for a CA environment.
#[derive(Clone)]
pub struct DirectoryManager {
    url: String,
    directory: Arc<RwLock<Option<Directory>>>,
    http_client: reqwest::Client,
}

impl DirectoryManager {
    pub fn new(url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            directory: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    pub async fn fetch(&self) -> Result<Directory> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("fetching directory: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AcmeError::acme_protocol(
                self.url.clone(),
                format!("directory fetch returned HTTP {}", status),
            ));
        }

        let directory: Directory = response
            .json()
            .await
            .map_err(|e| AcmeError::acme_protocol(self.url.clone(), format!("malformed directory: {}", e)))?;

        let mut cached = self.directory.write().await;
        *cached = Some(directory.clone());

        Ok(directory)
    }

    pub async fn get(&self) -> Result<Directory> {
        {
            let cached = self.directory.read().await;
            if let Some(dir) = cached.clone() {
                return Ok(dir);
            }
        }
        self.fetch().await
    }

    pub async fn clear_cache(&self) {
        let mut cached = self.directory.write().await;
        *cached = None;
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_directory() {
        let json = r#"{
            "newNonce": "https://example.com/acme/new-nonce",
            "newAccount": "https://example.com/acme/new-account",
            "newOrder": "https://example.com/acme/new-order",
            "revokeCert": "https://example.com/acme/revoke-cert",
            "keyChange": "https://example.com/acme/key-change"
        }"#;

        let dir: Directory = serde_json::from_str(json).unwrap();
        assert_eq!(dir.new_nonce, "https://example.com/acme/new-nonce");
        assert_eq!(dir.new_account, "https://example.com/acme/new-account");
        assert!(dir.meta.is_none());
    }

    #[test]
    fn parses_directory_with_meta() {
        let json = r#"{
            "newNonce": "https://example.com/acme/new-nonce",
            "newAccount": "https://example.com/acme/new-account",
            "newOrder": "https://example.com/acme/new-order",
            "revokeCert": "https://example.com/acme/revoke-cert",
            "keyChange": "https://example.com/acme/key-change",
            "meta": {
                "termsOfService": "https://example.com/tos",
                "website": "https://example.com",
                "caaIdentities": ["example.com"],
                "externalAccountRequired": false
            }
        }"#;

        let dir: Directory = serde_json::from_str(json).unwrap();
        let meta = dir.meta.unwrap();
        assert_eq!(meta.terms_of_service.as_deref(), Some("https://example.com/tos"));
        assert_eq!(meta.external_account_required, Some(false));
    }

    #[tokio::test]
    async fn get_caches_after_first_fetch() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "newNonce": format!("{}/acme/new-nonce", server.url()),
            "newAccount": format!("{}/acme/new-account", server.url()),
            "newOrder": format!("{}/acme/new-order", server.url()),
            "revokeCert": format!("{}/acme/revoke-cert", server.url()),
            "keyChange": format!("{}/acme/key-change", server.url()),
        });
        let mock = server
            .mock("GET", "/directory")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let manager = DirectoryManager::new(format!("{}/directory", server.url()), reqwest::Client::new());
        let first = manager.get().await.unwrap();
        let second = manager.get().await.unwrap();
        assert_eq!(first.new_nonce, second.new_nonce);
        mock.assert_async().await;
    }
}
