//! ACME account lifecycle: registration, lookup, contact updates, deactivation
//!
//! Owns its collaborators by value (clones of cheaply-`Clone`able handles)
//! rather than borrowing them, since one lives inside a spawned renewal task.

use crate::error::{AcmeError, Result};
use crate::protocol::{DirectoryManager, Jws, JwsSigner, Jwk, NonceManager};
use crate::types::Contact;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use super::credentials::KeyPair;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(rename = "termsOfServiceAgreed", default)]
    pub terms_of_service_agreed: bool,
    #[serde(default)]
    pub orders: Option<String>,
}

/// Signs and sends account-scoped ACME requests for one account key.
#[derive(Clone)]
pub struct AccountManager {
    key_pair: Arc<KeyPair>,
    jwk: Jwk,
    nonce_manager: NonceManager,
    directory_manager: DirectoryManager,
    http_client: reqwest::Client,
}

impl AccountManager {
    pub fn new(
        key_pair: Arc<KeyPair>,
        nonce_manager: NonceManager,
        directory_manager: DirectoryManager,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let jwk = Jwk::from_p256_uncompressed_point(key_pair.public_key_bytes())?;

        Ok(Self {
            key_pair,
            jwk,
            nonce_manager,
            directory_manager,
            http_client,
        })
    }

    fn signer(&self) -> JwsSigner<'_> {
        JwsSigner::new(self.key_pair.signing_key())
    }

    /// Signs a request with a JSON payload using this account's key.
    pub fn sign(&self, protected_header: &Value, payload: &Value) -> Result<Jws> {
        self.signer().sign(protected_header, payload)
    }

    /// Signs a POST-as-GET request (empty payload) using this account's key.
    pub fn sign_empty(&self, protected_header: &Value) -> Result<Jws> {
        self.signer().sign_empty(protected_header)
    }

    async fn cache_response_nonce(&self, response: &reqwest::Response) {
        if let Some(nonce_header) = response.headers().get("replay-nonce")
            && let Ok(nonce_str) = nonce_header.to_str()
        {
            self.nonce_manager.cache_nonce(nonce_str.to_string()).await;
        }
    }

    /// `POST newAccount`: create the account, or return the existing one —
    /// the account key alone determines identity on Let's Encrypt-shaped CAs.
    pub async fn register(&self, contacts: Vec<Contact>, terms_of_service_agreed: bool) -> Result<Account> {
        let directory = self.directory_manager.get().await?;
        let nonce = self.nonce_manager.get_nonce().await?;

        let header = json!({
            "alg": "ES256",
            "jwk": self.jwk.to_value(),
            "nonce": nonce,
            "url": directory.new_account,
        });

        let contacts_uri: Vec<String> = contacts.iter().filter_map(|c| c.to_uri()).collect();
        let payload = json!({
            "termsOfServiceAgreed": terms_of_service_agreed,
            "contact": contacts_uri,
        });

        let jws = self.sign(&header, &payload)?;

        let response = self
            .http_client
            .post(&directory.new_account)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("registering account: {}", e)))?;

        self.cache_response_nonce(&response).await;

        let account_url = response
            .headers()
            .get("location")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AcmeError::account("newAccount response is missing a Location header"))?
            .to_string();

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcmeError::account(format!("newAccount failed: HTTP {} - {}", status, body)));
        }

        let mut account: Account = response
            .json()
            .await
            .map_err(|e| AcmeError::account(format!("parsing account response: {}", e)))?;
        account.id = account_url;
        Ok(account)
    }

    pub async fn update_contacts(&self, account_id: &str, contacts: Vec<Contact>) -> Result<Account> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": account_id,
            "nonce": nonce,
            "url": account_id,
        });
        let contacts_uri: Vec<String> = contacts.iter().filter_map(|c| c.to_uri()).collect();
        let payload = json!({ "contact": contacts_uri });

        let jws = self.sign(&header, &payload)?;
        let response = self
            .http_client
            .post(account_id)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("updating account contacts: {}", e)))?;

        self.cache_response_nonce(&response).await;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcmeError::account(format!("updating account failed: HTTP {} - {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AcmeError::account(format!("parsing account response: {}", e)))
    }

    /// POST-as-GET the account resource.
    pub async fn get_account(&self, account_id: &str) -> Result<Account> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": account_id,
            "nonce": nonce,
            "url": account_id,
        });

        let jws = self.sign_empty(&header)?;
        let response = self
            .http_client
            .post(account_id)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("fetching account: {}", e)))?;

        self.cache_response_nonce(&response).await;

        let status = response.status();
        if !status.is_success() {
            return Err(AcmeError::account(format!("fetching account failed: HTTP {}", status)));
        }

        let mut account: Account = response
            .json()
            .await
            .map_err(|e| AcmeError::account(format!("parsing account response: {}", e)))?;
        account.id = account_id.to_string();
        Ok(account)
    }

    pub async fn deactivate(&self, account_id: &str) -> Result<()> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": account_id,
            "nonce": nonce,
            "url": account_id,
        });
        let payload = json!({ "status": "deactivated" });

        let jws = self.sign(&header, &payload)?;
        let response = self
            .http_client
            .post(account_id)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("deactivating account: {}", e)))?;

        self.cache_response_nonce(&response).await;

        let status = response.status();
        if !status.is_success() {
            return Err(AcmeError::account(format!("deactivating account failed: HTTP {}", status)));
        }
        Ok(())
    }

    /// `token.base64url(sha256(jwk_thumbprint))`, the DNS-01 key authorization.
    pub fn compute_key_authorization(&self, token: &str) -> String {
        format!("{}.{}", token, self.jwk.thumbprint_sha256())
    }

    pub fn jwk_thumbprint(&self) -> String {
        self.jwk.thumbprint_sha256()
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_response() {
        let json = r#"{
            "status": "valid",
            "contact": ["mailto:admin@example.com"],
            "termsOfServiceAgreed": true,
            "orders": "https://example.com/acme/acct/123/orders"
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.status, "valid");
        assert_eq!(account.contact, vec!["mailto:admin@example.com".to_string()]);
        assert!(account.terms_of_service_agreed);
    }
}
