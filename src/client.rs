//! High-level ACME v2 façade: account lifecycle, order submission, DNS-01
//! challenge bookkeeping, and finalization. Challenge *solving* (talking to
//! a DNS provider, waiting for propagation) lives in the orchestrator —
//! this module only speaks the authority's protocol.

use std::sync::Arc;
use std::time::Duration;

use crate::account::{AccountManager, KeyPair};
use crate::certificate_store::CertificateStore;
use crate::crypto::Sha256Hash;
use crate::error::{AcmeError, Result};
use crate::model::AcmeAccount;
use crate::order::{Authorization, Challenge, NewOrderRequest, Order, OrderManager};
use crate::protocol::{DirectoryManager, NonceManager};
use crate::types::Contact;

const LETSENCRYPT_PRODUCTION_DIRECTORY: &str = "https://acme-v02.api.letsencrypt.org/directory";
const LETSENCRYPT_STAGING_DIRECTORY: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";
const DEFAULT_ORDER_DEADLINE: Duration = Duration::from_secs(120);
const ORDER_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// A freshly submitted order, with every identifier's authorization already
/// fetched so the orchestrator can pull out DNS-01 challenges without a
/// second round trip per identifier.
pub struct SubmittedOrder {
    pub order_url: String,
    pub order: Order,
    pub authorizations: Vec<Authorization>,
}

/// An account ready to sign requests, paired with the url the authority
/// assigned it.
pub struct ActiveAccount {
    pub account_manager: AccountManager,
    pub account_url: String,
}

/// RFC 8555 order-protocol client for one (directory, environment) pair.
/// `LETSENCRYPT_STAGING=1` selects the staging directory; the flag is also
/// folded into every account/artifact path so staging and production
/// material never collide on disk.
#[derive(Clone)]
pub struct AcmeClient {
    directory_manager: DirectoryManager,
    nonce_manager: NonceManager,
    http_client: reqwest::Client,
    staging: bool,
}

impl AcmeClient {
    pub async fn new(staging: bool) -> Result<Self> {
        let directory_url = if staging {
            LETSENCRYPT_STAGING_DIRECTORY
        } else {
            LETSENCRYPT_PRODUCTION_DIRECTORY
        };
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AcmeError::transport(format!("building HTTP client: {}", e)))?;
        let directory_manager = DirectoryManager::new(directory_url, http_client.clone());
        let directory = directory_manager.fetch().await?;
        let nonce_manager = NonceManager::new(&directory.new_nonce, http_client.clone());

        Ok(Self {
            directory_manager,
            nonce_manager,
            http_client,
            staging,
        })
    }

    /// `LETSENCRYPT_STAGING=1|true` selects the staging directory; anything
    /// else (including unset) selects production.
    pub async fn from_env() -> Result<Self> {
        let staging = matches!(
            std::env::var("LETSENCRYPT_STAGING").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        Self::new(staging).await
    }

    pub fn is_staging(&self) -> bool {
        self.staging
    }

    /// Reconstructs a signer for a previously created account.
    fn account_manager_for(&self, account: &AcmeAccount) -> Result<AccountManager> {
        let key_pair = KeyPair::from_pem(&account.key_pem)?;
        AccountManager::new(
            Arc::new(key_pair),
            self.nonce_manager.clone(),
            self.directory_manager.clone(),
            self.http_client.clone(),
        )
    }

    fn order_manager_for(&self, account_manager: AccountManager, account_url: String) -> OrderManager {
        OrderManager::new(
            account_manager,
            self.directory_manager.clone(),
            self.nonce_manager.clone(),
            self.http_client.clone(),
            account_url,
        )
    }

    /// Loads the account persisted for `(fqdn, self.staging)`, if one exists.
    pub async fn load_account(&self, store: &CertificateStore, fqdn: &str) -> Result<Option<ActiveAccount>> {
        let Some(account) = store.load_account(fqdn, self.staging).await? else {
            return Ok(None);
        };
        let account_manager = self.account_manager_for(&account)?;
        Ok(Some(ActiveAccount {
            account_manager,
            account_url: account.account_url,
        }))
    }

    /// Registers a new account with the authority and persists it for reuse.
    pub async fn create_account(&self, store: &CertificateStore, contact_email: &str, fqdn: &str) -> Result<ActiveAccount> {
        let key_pair = KeyPair::generate()?;
        let key_pem = key_pair.serialize_pem();
        let account_manager = AccountManager::new(
            Arc::new(key_pair),
            self.nonce_manager.clone(),
            self.directory_manager.clone(),
            self.http_client.clone(),
        )?;

        let account = account_manager.register(vec![Contact::email(contact_email)], true).await?;

        store
            .save_account(
                fqdn,
                &AcmeAccount {
                    domain: fqdn.to_string(),
                    staging: self.staging,
                    account_url: account.id.clone(),
                    contact_email: contact_email.to_string(),
                    key_pem,
                },
            )
            .await?;

        Ok(ActiveAccount {
            account_manager,
            account_url: account.id,
        })
    }

    /// Loads a persisted account for `(fqdn, environment)`, creating one if
    /// absent. Fails with `ConfigMissing` if no contact email is configured
    /// and no account already exists.
    pub async fn ensure_account(
        &self,
        store: &CertificateStore,
        fqdn: &str,
        contact_email: Option<&str>,
    ) -> Result<ActiveAccount> {
        if let Some(account) = self.load_account(store, fqdn).await? {
            return Ok(account);
        }
        let email = contact_email
            .ok_or_else(|| AcmeError::config_missing(format!("no contact email configured to create an ACME account for {}", fqdn)))?;
        self.create_account(store, email, fqdn).await
    }

    /// Submits a new order for `domains` and eagerly fetches every
    /// authorization so DNS-01 challenges are ready to read off.
    pub async fn request_certificate(&self, account: &ActiveAccount, domains: Vec<String>) -> Result<SubmittedOrder> {
        let order_manager = self.order_manager_for(account.account_manager.clone(), account.account_url.clone());
        let request = NewOrderRequest::new(domains);
        let (order_url, order) = order_manager.create_order(&request).await?;

        let mut authorizations = Vec::with_capacity(order.authorizations.len());
        for auth_url in &order.authorizations {
            authorizations.push(order_manager.get_authorization(auth_url).await?);
        }

        Ok(SubmittedOrder {
            order_url,
            order,
            authorizations,
        })
    }

    /// `token || "." || base64url(sha256(JWK(account_key)))`.
    pub fn get_challenge_key_authorization(&self, account: &ActiveAccount, challenge: &Challenge) -> String {
        account.account_manager.compute_key_authorization(&challenge.token)
    }

    /// `base64url(sha256(keyAuth))`, the DNS TXT record value for DNS-01.
    pub fn get_dns_record_value(key_authorization: &str) -> String {
        Sha256Hash::hash_base64(key_authorization.as_bytes())
    }

    /// Tells the authority this challenge is ready to be validated.
    pub async fn complete_challenge(&self, account: &ActiveAccount, challenge: &Challenge) -> Result<Challenge> {
        let order_manager = self.order_manager_for(account.account_manager.clone(), account.account_url.clone());
        order_manager.respond_to_challenge(&challenge.url).await
    }

    /// Polls the order until `valid` (success) or `invalid` (fatal), bounded
    /// by a 2-minute deadline.
    pub async fn wait_for_order_completion(&self, account: &ActiveAccount, order_url: &str) -> Result<Order> {
        let order_manager = self.order_manager_for(account.account_manager.clone(), account.account_url.clone());
        order_manager
            .wait_for_order_completion(order_url, DEFAULT_ORDER_DEADLINE, ORDER_POLL_INTERVAL)
            .await
    }

    /// Submits the CSR to the order's finalize url, waits for the order to
    /// become valid, and downloads the issued PEM chain.
    pub async fn finalize_certificate(
        &self,
        account: &ActiveAccount,
        order_url: &str,
        finalize_url: &str,
        csr_der: &[u8],
    ) -> Result<String> {
        let order_manager = self.order_manager_for(account.account_manager.clone(), account.account_url.clone());
        order_manager.finalize_order(finalize_url, csr_der).await?;

        let order = order_manager
            .wait_for_order_completion(order_url, DEFAULT_ORDER_DEADLINE, ORDER_POLL_INTERVAL)
            .await?;

        let certificate_url = order
            .certificate
            .ok_or_else(|| AcmeError::acme_protocol(order_url.to_string(), "order valid but missing a certificate url"))?;

        order_manager.download_certificate(&certificate_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_record_value_matches_known_vector() {
        // RFC 8555 §8.4 worked example.
        let key_auth = "evaGxfADs6pSRb2LAv9IZf17Dt3juxGJ-PCt92wr-oA.pNmLNfB40TGysytDjwD9b93-iGkPzsHCPJkIhJLxa6I";
        let value = AcmeClient::get_dns_record_value(key_auth);
        assert_eq!(value, "LoqXcYV8q5ONbJQxCLP_4zW8xgNmd8kj-otnVpqQN4A");
    }
}
