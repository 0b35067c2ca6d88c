//! Filesystem layout for everything a renewal produces or reuses: CSRs,
//! private keys, issued certificate artifacts, and the per-(domain,
//! environment) ACME account. Writes go to a tempfile in the target
//! directory and are renamed into place so a reader never observes a
//! half-written file; per-FQDN locking serializes writers to the same
//! domain while leaving unrelated domains free to proceed concurrently.

use jiff::Timestamp;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use x509_parser::asn1_rs::FromDer;
use x509_parser::certificate::X509Certificate;

use crate::error::{AcmeError, Result};
use crate::model::AcmeAccount;

const REUSE_WINDOW_DAYS: i64 = 30;

fn environment_dir_name(staging: bool) -> &'static str {
    if staging { "staging" } else { "prod" }
}

pub struct CertificateStore {
    root: PathBuf,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl CertificateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        let root = std::env::var("ACCOUNTS_DIR").unwrap_or_else(|_| "./accounts".to_string());
        Self::new(root)
    }

    fn domain_dir(&self, fqdn: &str) -> PathBuf {
        self.root.join(fqdn)
    }

    fn env_dir(&self, fqdn: &str, staging: bool) -> PathBuf {
        self.domain_dir(fqdn).join(environment_dir_name(staging))
    }

    async fn lock_for(&self, fqdn: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(fqdn) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks.entry(fqdn.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("new")
        ));
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    /// True iff a cached certificate for `fqdn` in the given environment is
    /// still good for at least another 30 days. Never fails: any I/O or
    /// parse error is treated as "not reusable".
    pub async fn reusable(&self, fqdn: &str, staging: bool) -> bool {
        let env_dir = self.env_dir(fqdn, staging);
        let candidates = [env_dir.join("fullchain.pem"), env_dir.join("certificate.pem")];

        for path in candidates {
            let Ok(pem_text) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            if let Ok(not_after) = Self::leaf_not_after(&pem_text) {
                let cutoff = match Timestamp::now().as_second().checked_add(REUSE_WINDOW_DAYS * 86_400) {
                    Some(secs) => secs,
                    None => return false,
                };
                return not_after > cutoff;
            }
        }
        false
    }

    fn leaf_not_after(pem_text: &str) -> Result<i64> {
        let parsed = pem::parse_many(pem_text.as_bytes()).map_err(|e| AcmeError::pem(e.to_string()))?;
        let leaf_der = parsed
            .iter()
            .find(|p| p.tag() == "CERTIFICATE")
            .ok_or_else(|| AcmeError::certificate_parse("no certificate found in PEM"))?
            .contents();
        let (_, cert) =
            X509Certificate::from_der(leaf_der).map_err(|e| AcmeError::certificate_parse(e.to_string()))?;
        Ok(cert.validity().not_after.timestamp())
    }

    pub async fn save_csr(&self, fqdn: &str, csr_pem: &str) -> Result<()> {
        let _guard = self.lock_for(fqdn).await.lock_owned().await;
        Self::atomic_write(&self.domain_dir(fqdn).join("csr.pem"), csr_pem.as_bytes()).await
    }

    pub async fn load_csr(&self, fqdn: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.domain_dir(fqdn).join("csr.pem")).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save_private_key(&self, fqdn: &str, key_pem: &str) -> Result<()> {
        let _guard = self.lock_for(fqdn).await.lock_owned().await;
        Self::atomic_write(&self.domain_dir(fqdn).join("private_key.pem"), key_pem.as_bytes()).await
    }

    /// Persists the issued chain, and for `general` connections also writes
    /// `<fqdn>.crt`/`<fqdn>.key` convenience copies alongside it.
    pub async fn save_certificate_artifacts(
        &self,
        fqdn: &str,
        staging: bool,
        certificate_pem: &str,
        chain_pem: &str,
        fullchain_pem: &str,
        write_general_convenience_copies: bool,
    ) -> Result<()> {
        let _guard = self.lock_for(fqdn).await.lock_owned().await;
        let env_dir = self.env_dir(fqdn, staging);
        Self::atomic_write(&env_dir.join("certificate.pem"), certificate_pem.as_bytes()).await?;
        Self::atomic_write(&env_dir.join("chain.pem"), chain_pem.as_bytes()).await?;
        Self::atomic_write(&env_dir.join("fullchain.pem"), fullchain_pem.as_bytes()).await?;

        if write_general_convenience_copies {
            Self::atomic_write(&env_dir.join(format!("{}.crt", fqdn)), fullchain_pem.as_bytes()).await?;
            if let Ok(key_pem) = tokio::fs::read(self.domain_dir(fqdn).join("private_key.pem")).await {
                Self::atomic_write(&env_dir.join(format!("{}.key", fqdn)), &key_pem).await?;
            }
        }
        Ok(())
    }

    pub async fn append_log(&self, fqdn: &str, line: &str) -> Result<()> {
        let _guard = self.lock_for(fqdn).await.lock_owned().await;
        let path = self.domain_dir(fqdn).join("renewal.log");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    /// Loads a previously persisted leaf certificate and chain, for the
    /// short-circuit path where a reusable certificate skips re-issuance
    /// but still needs to be (re-)installed onto its target.
    pub async fn load_certificate_artifacts(&self, fqdn: &str, staging: bool) -> Result<Option<(String, Vec<String>)>> {
        let env_dir = self.env_dir(fqdn, staging);
        let fullchain = match tokio::fs::read_to_string(env_dir.join("fullchain.pem")).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (leaf, chain) = crate::device::split_leaf_and_chain(&fullchain);
        Ok(Some((leaf, chain)))
    }

    pub async fn save_account(&self, fqdn: &str, account: &AcmeAccount) -> Result<()> {
        let _guard = self.lock_for(fqdn).await.lock_owned().await;
        let path = self.env_dir(fqdn, account.staging).join("account.json");
        let json = serde_json::to_vec_pretty(account)?;
        Self::atomic_write(&path, &json).await
    }

    pub async fn load_account(&self, fqdn: &str, staging: bool) -> Result<Option<AcmeAccount>> {
        let path = self.env_dir(fqdn, staging).join("account.json");
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::CertificateParams;

    /// rcgen's default validity window runs decades into the future, which
    /// is exactly the "comfortably reusable" shape this store checks for.
    fn self_signed_pem() -> String {
        let params = CertificateParams::new(vec!["example.com".to_string()]).unwrap();
        let key_pair = rcgen::KeyPair::generate().unwrap();
        params.self_signed(&key_pair).unwrap().pem()
    }

    #[tokio::test]
    async fn round_trips_csr_and_marks_long_lived_certificate_reusable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertificateStore::new(dir.path());

        store.save_csr("host.example.com", "CSR DATA").await.unwrap();
        assert_eq!(store.load_csr("host.example.com").await.unwrap().unwrap(), "CSR DATA");

        assert!(!store.reusable("host.example.com", false).await);

        let pem = self_signed_pem();
        store
            .save_certificate_artifacts("host.example.com", false, &pem, "", &pem, false)
            .await
            .unwrap();
        assert!(store.reusable("host.example.com", false).await);
    }

    #[tokio::test]
    async fn missing_certificate_is_not_reusable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertificateStore::new(dir.path());
        assert!(!store.reusable("never-issued.example.com", false).await);
    }

    #[tokio::test]
    async fn account_round_trips_per_environment() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertificateStore::new(dir.path());
        let account = AcmeAccount {
            domain: "host.example.com".to_string(),
            staging: true,
            account_url: "https://acme-staging.example/acct/1".to_string(),
            contact_email: "ops@example.com".to_string(),
            key_pem: "PRIVATE KEY".to_string(),
        };
        store.save_account("host.example.com", &account).await.unwrap();

        let loaded = store.load_account("host.example.com", true).await.unwrap().unwrap();
        assert_eq!(loaded.account_url, account.account_url);
        assert!(store.load_account("host.example.com", false).await.unwrap().is_none());
    }
}
