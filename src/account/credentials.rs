//! Account key pair: ECDSA P-256, persisted as PKCS#8 PEM

use crate::crypto::PemEncoding;
use crate::crypto::keypair;
use crate::error::Result;
use ring::signature::EcdsaKeyPair;
use std::fs;
use std::path::Path;

/// An ACME account's signing key pair.
pub struct KeyPair {
    pkcs8_der: Vec<u8>,
    signing_key: EcdsaKeyPair,
}

impl KeyPair {
    pub fn generate() -> Result<Self> {
        let pkcs8_der = keypair::generate_pkcs8()?;
        let signing_key = keypair::load_pkcs8(&pkcs8_der)?;
        Ok(Self {
            pkcs8_der,
            signing_key,
        })
    }

    pub fn from_pkcs8_der(pkcs8_der: Vec<u8>) -> Result<Self> {
        let signing_key = keypair::load_pkcs8(&pkcs8_der)?;
        Ok(Self {
            pkcs8_der,
            signing_key,
        })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let der = PemEncoding::extract_data(pem_str, Some("PRIVATE KEY"))?;
        Self::from_pkcs8_der(der)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.serialize_pem())?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_pem(&content)
    }

    pub fn serialize_pem(&self) -> String {
        PemEncoding::encode(&self.pkcs8_der, "PRIVATE KEY")
    }

    /// 65-byte uncompressed P-256 point: `0x04 || X || Y`.
    pub fn public_key_bytes(&self) -> &[u8] {
        self.signing_key.public_key().as_ref()
    }

    pub fn signing_key(&self) -> &EcdsaKeyPair {
        &self.signing_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_usable_key() {
        let keypair = KeyPair::generate().unwrap();
        assert_eq!(keypair.public_key_bytes().len(), 65);
    }

    #[test]
    fn pem_roundtrip_preserves_public_key() {
        let keypair1 = KeyPair::generate().unwrap();
        let pem = keypair1.serialize_pem();

        let keypair2 = KeyPair::from_pem(&pem).unwrap();
        assert_eq!(keypair1.public_key_bytes(), keypair2.public_key_bytes());
    }
}
