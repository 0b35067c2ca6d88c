//! Key pair generation - ECDSA P-256, the only key type ACME accounts and CSRs need here

use crate::error::{AcmeError, Result};
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    EcdsaP256,
}

impl KeyType {
    pub fn jwa_algorithm(&self) -> &'static str {
        match self {
            KeyType::EcdsaP256 => "ES256",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::EcdsaP256 => write!(f, "ECDSA-P256"),
        }
    }
}

/// Generates a fresh ECDSA P-256 key pair as a PKCS#8 document, ready for
/// `EcdsaKeyPair::from_pkcs8` or for PEM persistence.
pub fn generate_pkcs8() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let doc = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|_| AcmeError::crypto("failed to generate ECDSA P-256 key pair"))?;
    Ok(doc.as_ref().to_vec())
}

/// Loads a PKCS#8-encoded ECDSA P-256 key pair back into a signer.
pub fn load_pkcs8(pkcs8_der: &[u8]) -> Result<EcdsaKeyPair> {
    let rng = SystemRandom::new();
    EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8_der, &rng)
        .map_err(|_| AcmeError::crypto("failed to parse ECDSA P-256 PKCS#8 key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwa_algorithm_is_es256() {
        assert_eq!(KeyType::EcdsaP256.jwa_algorithm(), "ES256");
    }

    #[test]
    fn generate_then_load_roundtrips() {
        let pkcs8 = generate_pkcs8().unwrap();
        let key_pair = load_pkcs8(&pkcs8).unwrap();
        assert_eq!(key_pair.public_key().as_ref().len(), 65); // uncompressed P-256 point
    }
}
