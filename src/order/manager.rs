//! Order lifecycle: creation, authorization/challenge lookup, challenge
//! response, polling to a terminal status, finalization, and download.

use crate::account::AccountManager;
use crate::error::{AcmeError, Result};
use crate::order::{Authorization, Challenge, NewOrderRequest, Order};
use crate::protocol::{DirectoryManager, NonceManager};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::Instant;

/// Drives ACME order resources on behalf of one account.
///
/// Owned rather than borrowed, so it can be cloned into a spawned renewal
/// task alongside the rest of that renewal's collaborators.
#[derive(Clone)]
pub struct OrderManager {
    account_manager: AccountManager,
    directory_manager: DirectoryManager,
    nonce_manager: NonceManager,
    http_client: reqwest::Client,
    account_id: String,
}

impl OrderManager {
    pub fn new(
        account_manager: AccountManager,
        directory_manager: DirectoryManager,
        nonce_manager: NonceManager,
        http_client: reqwest::Client,
        account_id: String,
    ) -> Self {
        Self {
            account_manager,
            directory_manager,
            nonce_manager,
            http_client,
            account_id,
        }
    }

    async fn post_as_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": &self.account_id,
            "nonce": nonce,
            "url": url,
        });
        let jws = self.account_manager.sign_empty(&header)?;

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("POST-as-GET {}: {}", url, e)))?;

        self.cache_nonce(&response).await;

        let status = response.status();
        if !status.is_success() {
            return Err(AcmeError::acme_protocol(
                url.to_string(),
                format!("HTTP {}", status),
            ));
        }
        response
            .json()
            .await
            .map_err(|e| AcmeError::acme_protocol(url.to_string(), format!("malformed response: {}", e)))
    }

    async fn post_signed<T: serde::de::DeserializeOwned>(&self, url: &str, payload: &Value) -> Result<T> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": &self.account_id,
            "nonce": nonce,
            "url": url,
        });
        let jws = self.account_manager.sign(&header, payload)?;

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("POST {}: {}", url, e)))?;

        self.cache_nonce(&response).await;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcmeError::acme_protocol(url.to_string(), format!("HTTP {} - {}", status, body)));
        }
        response
            .json()
            .await
            .map_err(|e| AcmeError::acme_protocol(url.to_string(), format!("malformed response: {}", e)))
    }

    async fn cache_nonce(&self, response: &reqwest::Response) {
        if let Some(nonce_header) = response.headers().get("replay-nonce")
            && let Ok(nonce_str) = nonce_header.to_str()
        {
            self.nonce_manager.cache_nonce(nonce_str.to_string()).await;
        }
    }

    /// Creates a new order; the returned `Location` header is the order url.
    pub async fn create_order(&self, request: &NewOrderRequest) -> Result<(String, Order)> {
        let directory = self.directory_manager.get().await?;
        let nonce = self.nonce_manager.get_nonce().await?;

        let header = json!({
            "alg": "ES256",
            "kid": &self.account_id,
            "nonce": nonce,
            "url": &directory.new_order,
        });
        let payload = json!(request);
        let jws = self.account_manager.sign(&header, &payload)?;

        let response = self
            .http_client
            .post(&directory.new_order)
            .header("Content-Type", "application/jose+json")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("creating order: {}", e)))?;

        self.cache_nonce(&response).await;

        let order_url = response
            .headers()
            .get("location")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AcmeError::acme_protocol(directory.new_order.clone(), "response missing Location header"))?
            .to_string();

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcmeError::acme_protocol(directory.new_order.clone(), format!("HTTP {} - {}", status, body)));
        }

        let order: Order = response
            .json()
            .await
            .map_err(|e| AcmeError::acme_protocol(order_url.clone(), format!("malformed order: {}", e)))?;

        tracing::info!(url = %order_url, "order created");
        Ok((order_url, order))
    }

    pub async fn get_order(&self, order_url: &str) -> Result<Order> {
        self.post_as_get(order_url).await
    }

    pub async fn get_authorization(&self, auth_url: &str) -> Result<Authorization> {
        self.post_as_get(auth_url).await
    }

    /// Signals the ACME server to attempt validation of this challenge.
    pub async fn respond_to_challenge(&self, challenge_url: &str) -> Result<Challenge> {
        let challenge = self.post_signed(challenge_url, &json!({})).await?;
        tracing::info!(url = %challenge_url, "challenge response submitted");
        Ok(challenge)
    }

    /// Polls the order url until it reaches `valid` or `invalid`, or `deadline` elapses.
    pub async fn wait_for_order_completion(&self, order_url: &str, deadline: Duration, poll_interval: Duration) -> Result<Order> {
        let started = Instant::now();
        loop {
            let order = self.get_order(order_url).await?;
            match order.status_enum() {
                Some(crate::types::OrderStatus::Valid) => return Ok(order),
                Some(crate::types::OrderStatus::Invalid) => {
                    return Err(AcmeError::order_invalid(self.describe_invalid_order(order_url, &order).await));
                }
                _ => {
                    if started.elapsed() >= deadline {
                        return Err(AcmeError::acme_protocol(
                            order_url.to_string(),
                            "order did not complete before the deadline",
                        ));
                    }
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    /// Fetches every authorization of an `invalid` order and folds each
    /// failed challenge's CA-provided problem document into one message.
    async fn describe_invalid_order(&self, order_url: &str, order: &Order) -> String {
        let mut problems = Vec::new();
        for auth_url in &order.authorizations {
            let authorization = match self.get_authorization(auth_url).await {
                Ok(authorization) => authorization,
                Err(e) => {
                    problems.push(format!("{}: failed to fetch authorization: {}", auth_url, e));
                    continue;
                }
            };
            for challenge in &authorization.challenges {
                let Some(error) = &challenge.error else { continue };
                let detail = serde_json::from_value::<crate::types::AcmeErrorDetail>(error.clone())
                    .map(|problem| problem.summarize())
                    .unwrap_or_else(|_| error.to_string());
                problems.push(format!("{}: {}", authorization.identifier.value, detail));
            }
        }
        if problems.is_empty() {
            format!("order {} became invalid with no authorization detail available", order_url)
        } else {
            problems.join("; ")
        }
    }

    pub async fn finalize_order(&self, finalize_url: &str, csr_der: &[u8]) -> Result<Order> {
        let csr_b64 = URL_SAFE_NO_PAD.encode(csr_der);
        let order = self.post_signed(finalize_url, &json!({ "csr": csr_b64 })).await?;
        tracing::info!(url = %finalize_url, "order finalized");
        Ok(order)
    }

    /// Downloads the PEM certificate chain once the order's `certificate` url is set.
    pub async fn download_certificate(&self, certificate_url: &str) -> Result<String> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": &self.account_id,
            "nonce": nonce,
            "url": certificate_url,
        });
        let jws = self.account_manager.sign_empty(&header)?;

        let response = self
            .http_client
            .post(certificate_url)
            .header("Content-Type", "application/jose+json")
            .header("Accept", "application/pem-certificate-chain")
            .json(&jws.to_json())
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("downloading certificate: {}", e)))?;

        self.cache_nonce(&response).await;

        let status = response.status();
        if !status.is_success() {
            return Err(AcmeError::acme_protocol(
                certificate_url.to_string(),
                format!("HTTP {}", status),
            ));
        }

        let chain_pem = response
            .text()
            .await
            .map_err(|e| AcmeError::acme_protocol(certificate_url.to_string(), format!("reading body: {}", e)))?;

        tracing::info!(url = %certificate_url, "certificate downloaded");
        Ok(chain_pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountManager, KeyPair};
    use std::sync::Arc;

    async fn test_manager(server: &mockito::ServerGuard) -> OrderManager {
        let http_client = reqwest::Client::new();
        let nonce_manager = NonceManager::new(format!("{}/acme/new-nonce", server.url()), http_client.clone());
        nonce_manager.cache_nonce("nonce-1".to_string()).await;
        nonce_manager.cache_nonce("nonce-2".to_string()).await;
        let directory_manager = DirectoryManager::new(format!("{}/directory", server.url()), http_client.clone());
        let key_pair = KeyPair::generate().unwrap();
        let account_manager = AccountManager::new(Arc::new(key_pair), nonce_manager.clone(), directory_manager.clone(), http_client.clone()).unwrap();
        OrderManager::new(account_manager, directory_manager, nonce_manager, http_client, format!("{}/acme/acct/1", server.url()))
    }

    #[tokio::test]
    async fn wait_for_order_completion_folds_challenge_errors_into_the_detail() {
        let mut server = mockito::Server::new_async().await;
        let authz_url = format!("{}/acme/authz/1", server.url());
        let order_url = format!("{}/acme/order/1", server.url());

        let order_body = serde_json::json!({
            "status": "invalid",
            "identifiers": [{"type": "dns", "value": "example.com"}],
            "authorizations": [authz_url],
            "finalize": format!("{}/acme/finalize/1", server.url()),
        });
        let order_mock = server
            .mock("POST", "/acme/order/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(order_body.to_string())
            .create_async()
            .await;

        let authz_body = serde_json::json!({
            "identifier": {"type": "dns", "value": "example.com"},
            "status": "invalid",
            "expires": "2024-01-01T00:00:00Z",
            "challenges": [{
                "type": "dns-01",
                "url": format!("{}/acme/challenge/1", server.url()),
                "status": "invalid",
                "token": "tok",
                "error": {
                    "type": "urn:ietf:params:acme:error:dns",
                    "detail": "DNS query timed out",
                },
            }],
        });
        let authz_mock = server
            .mock("POST", "/acme/authz/1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(authz_body.to_string())
            .create_async()
            .await;

        let manager = test_manager(&server).await;
        let result = manager
            .wait_for_order_completion(&order_url, Duration::from_secs(1), Duration::from_millis(10))
            .await;

        let err = result.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("example.com"), "{}", message);
        assert!(message.contains("DNS query timed out"), "{}", message);
        order_mock.assert_async().await;
        authz_mock.assert_async().await;
    }
}
