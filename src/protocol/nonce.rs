//! Replay-nonce management (RFC 8555 §6.5): every signed request needs a
//! fresh nonce, and every ACME response carries one in `Replay-Nonce` that
//! should be cached rather than wasted on a dedicated `HEAD newNonce` call.

use crate::error::{AcmeError, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone)]
pub struct NonceManager {
    new_nonce_url: String,
    http_client: reqwest::Client,
    pool: Arc<Mutex<VecDeque<String>>>,
    refill_below: usize,
}

impl NonceManager {
    pub fn new(new_nonce_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            new_nonce_url: new_nonce_url.into(),
            http_client,
            pool: Arc::new(Mutex::new(VecDeque::new())),
            refill_below: 2,
        }
    }

    /// Pop a cached nonce, or fetch a fresh one via `HEAD newNonce` if the
    /// pool is empty.
    pub async fn get_nonce(&self) -> Result<String> {
        {
            let mut pool = self.pool.lock().await;
            if let Some(nonce) = pool.pop_front() {
                if pool.len() < self.refill_below {
                    let clone = self.clone();
                    tokio::spawn(async move {
                        match clone.fetch_nonce().await {
                            Ok(n) => clone.cache_nonce(n).await,
                            Err(e) => debug!("nonce prefetch failed: {}", e),
                        }
                    });
                }
                return Ok(nonce);
            }
        }

        self.fetch_nonce().await
    }

    async fn fetch_nonce(&self) -> Result<String> {
        let response = self
            .http_client
            .head(&self.new_nonce_url)
            .send()
            .await
            .map_err(|e| AcmeError::transport(format!("fetching replay nonce: {}", e)))?;

        if !response.status().is_success() {
            return Err(AcmeError::acme_protocol(
                self.new_nonce_url.clone(),
                format!("newNonce returned HTTP {}", response.status()),
            ));
        }

        response
            .headers()
            .get("replay-nonce")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AcmeError::acme_protocol(self.new_nonce_url.clone(), "missing Replay-Nonce header")
            })
    }

    /// Cache a nonce taken from a previous response's `Replay-Nonce` header.
    pub async fn cache_nonce(&self, nonce: String) {
        let mut pool = self.pool.lock().await;
        pool.push_back(nonce);
    }

    pub async fn clear_pool(&self) {
        let mut pool = self.pool.lock().await;
        pool.clear();
    }

    pub async fn pool_size(&self) -> usize {
        self.pool.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_with_empty_pool() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        assert_eq!(manager.pool_size().await, 0);
    }

    #[tokio::test]
    async fn cached_nonce_is_returned_before_a_fetch() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        manager.cache_nonce("cached-nonce".to_string()).await;
        assert_eq!(manager.get_nonce().await.unwrap(), "cached-nonce");
    }

    #[tokio::test]
    async fn clear_pool_empties_it() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        manager.cache_nonce("a".to_string()).await;
        manager.cache_nonce("b".to_string()).await;
        manager.clear_pool().await;
        assert_eq!(manager.pool_size().await, 0);
    }

    #[tokio::test]
    async fn fetch_nonce_reads_replay_nonce_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/acme/new-nonce")
            .with_status(200)
            .with_header("replay-nonce", "server-issued-nonce")
            .create_async()
            .await;

        let manager = NonceManager::new(format!("{}/acme/new-nonce", server.url()), reqwest::Client::new());
        let nonce = manager.get_nonce().await.unwrap();
        assert_eq!(nonce, "server-issued-nonce");
        mock.assert_async().await;
    }
}
