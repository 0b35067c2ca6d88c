//! JSON Web Key representation for the ACME account key (ECDSA P-256 only)

use crate::error::{AcmeError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

/// JSON Web Key for an ECDSA P-256 public key, as embedded in JWS headers
/// and used to compute the RFC 7638 thumbprint for `key_authorization`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl Jwk {
    /// Build a JWK from the 65-byte uncompressed P-256 point `ring::EcdsaKeyPair::public_key()`
    /// returns (`0x04 || X (32 bytes) || Y (32 bytes)`).
    pub fn from_p256_uncompressed_point(point: &[u8]) -> Result<Self> {
        if point.len() != 65 || point[0] != 0x04 {
            return Err(AcmeError::crypto(
                "expected a 65-byte uncompressed P-256 public key point",
            ));
        }
        let x = URL_SAFE_NO_PAD.encode(&point[1..33]);
        let y = URL_SAFE_NO_PAD.encode(&point[33..65]);
        Ok(Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x,
            y,
        })
    }

    /// RFC 7638 thumbprint: SHA-256 over the JSON object of required members
    /// sorted lexicographically by key, base64url-encoded with no padding.
    pub fn thumbprint_sha256(&self) -> String {
        let required = json!({
            "crv": self.crv,
            "kty": self.kty,
            "x": self.x,
            "y": self.y,
        });
        let mut hasher = Sha256::new();
        hasher.update(required.to_string().as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Convert to a JSON value for embedding in a JWS protected header.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keypair;

    #[test]
    fn from_point_rejects_wrong_length() {
        assert!(Jwk::from_p256_uncompressed_point(&[0u8; 10]).is_err());
    }

    #[test]
    fn from_point_rejects_wrong_tag() {
        let mut point = [0u8; 65];
        point[0] = 0x02;
        assert!(Jwk::from_p256_uncompressed_point(&point).is_err());
    }

    #[test]
    fn thumbprint_is_stable_base64url() {
        let pkcs8 = keypair::generate_pkcs8().unwrap();
        let key_pair = keypair::load_pkcs8(&pkcs8).unwrap();
        let jwk = Jwk::from_p256_uncompressed_point(key_pair.public_key().as_ref()).unwrap();

        let thumbprint_a = jwk.thumbprint_sha256();
        let thumbprint_b = jwk.thumbprint_sha256();
        assert_eq!(thumbprint_a, thumbprint_b);
        assert!(
            thumbprint_a
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn thumbprint_has_expected_base64url_length() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: "WKn-ZIGevcwGIyyrzFoZNBdaq9_TsqzGl96oc0CWuis".to_string(),
            y: "y8lrnvOohSs2gksT69r56Fq3MZ_yCjL8MyCvD94PoWU".to_string(),
        };
        assert_eq!(jwk.thumbprint_sha256().len(), 43); // 32-byte sha256 -> 43 base64url chars, no pad
    }
}
