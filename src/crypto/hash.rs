//! Hashing helpers - SHA-256 is the one DNS-01 needs; SHA-384/512 kept for completeness

use crate::error::Result;
use sha2::{Digest, Sha256, Sha384, Sha512};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn hash(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                Ok(hasher.finalize().to_vec())
            }
            HashAlgorithm::Sha384 => {
                let mut hasher = Sha384::new();
                hasher.update(data);
                Ok(hasher.finalize().to_vec())
            }
            HashAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(data);
                Ok(hasher.finalize().to_vec())
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "SHA256"),
            HashAlgorithm::Sha384 => write!(f, "SHA384"),
            HashAlgorithm::Sha512 => write!(f, "SHA512"),
        }
    }
}

/// SHA-256 convenience wrapper used for JWK thumbprints and DNS-01 TXT values
pub struct Sha256Hash;

impl Sha256Hash {
    pub fn hash(data: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().to_vec()
    }

    /// base64url(sha256(data)), no padding - the DNS-01 TXT record value form
    pub fn hash_base64(data: &[u8]) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(Self::hash(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encoding::Base64Encoding;

    #[test]
    fn sha256_matches_known_vector() {
        let hash = Sha256Hash::hash(b"test data");
        let hex: String = hash.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(
            hex,
            "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f"
        );
    }

    #[test]
    fn hash_base64_roundtrips_through_decode() {
        let value = Sha256Hash::hash_base64(b"key-authorization-bytes");
        let decoded = Base64Encoding::decode(&value).unwrap();
        assert_eq!(decoded, Sha256Hash::hash(b"key-authorization-bytes"));
    }
}
