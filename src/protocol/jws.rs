//! JWS (JSON Web Signature) signing for ACME requests, RFC 7515 flattened
//! JSON serialization as RFC 8555 §6.2 requires (not compact `h.p.s` form).

use crate::error::{AcmeError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::SystemRandom;
use ring::signature::EcdsaKeyPair;
use serde_json::{Value, json};

/// A signed ACME request body, ready to serialize and POST.
#[derive(Debug, Clone)]
pub struct Jws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

impl Jws {
    pub fn to_json(&self) -> Value {
        json!({
            "protected": self.protected,
            "payload": self.payload,
            "signature": self.signature,
        })
    }
}

/// Signs ACME request bodies with an account's ECDSA P-256 key.
pub struct JwsSigner<'a> {
    key_pair: &'a EcdsaKeyPair,
    rng: SystemRandom,
}

impl<'a> JwsSigner<'a> {
    pub fn new(key_pair: &'a EcdsaKeyPair) -> Self {
        Self {
            key_pair,
            rng: SystemRandom::new(),
        }
    }

    /// Sign a request carrying a JSON payload (e.g. `{"termsOfServiceAgreed": true}`).
    pub fn sign(&self, protected_header: &Value, payload: &Value) -> Result<Jws> {
        self.sign_raw(protected_header, Some(&payload.to_string()))
    }

    /// Sign a POST-as-GET request, whose payload is the empty string, not `{}`.
    pub fn sign_empty(&self, protected_header: &Value) -> Result<Jws> {
        self.sign_raw(protected_header, None)
    }

    fn sign_raw(&self, protected_header: &Value, payload_json: Option<&str>) -> Result<Jws> {
        let protected_encoded = URL_SAFE_NO_PAD.encode(protected_header.to_string().as_bytes());
        let payload_encoded = match payload_json {
            Some(p) => URL_SAFE_NO_PAD.encode(p.as_bytes()),
            None => String::new(),
        };

        let signing_input = format!("{}.{}", protected_encoded, payload_encoded);
        let signature = self
            .key_pair
            .sign(&self.rng, signing_input.as_bytes())
            .map_err(|_| AcmeError::crypto("failed to sign JWS with account key"))?;

        Ok(Jws {
            protected: protected_encoded,
            payload: payload_encoded,
            signature: URL_SAFE_NO_PAD.encode(signature.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keypair;

    fn signer_with_fresh_key() -> (Vec<u8>, EcdsaKeyPair) {
        let pkcs8 = keypair::generate_pkcs8().unwrap();
        let key_pair = keypair::load_pkcs8(&pkcs8).unwrap();
        (pkcs8, key_pair)
    }

    #[test]
    fn sign_produces_valid_base64url_parts_and_signature_length() {
        let (_pkcs8, key_pair) = signer_with_fresh_key();
        let signer = JwsSigner::new(&key_pair);

        let header = json!({
            "alg": "ES256",
            "nonce": "test-nonce",
            "url": "https://example.com/acme/new-account"
        });
        let payload = json!({"termsOfServiceAgreed": true});

        let jws = signer.sign(&header, &payload).unwrap();

        assert!(URL_SAFE_NO_PAD.decode(&jws.protected).is_ok());
        assert!(URL_SAFE_NO_PAD.decode(&jws.payload).is_ok());
        let sig_bytes = URL_SAFE_NO_PAD.decode(&jws.signature).unwrap();
        assert_eq!(sig_bytes.len(), 64); // ECDSA P-256 fixed r||s signature
    }

    #[test]
    fn sign_empty_has_empty_payload_part() {
        let (_pkcs8, key_pair) = signer_with_fresh_key();
        let signer = JwsSigner::new(&key_pair);

        let header = json!({
            "alg": "ES256",
            "kid": "https://example.com/acme/acct/1",
            "nonce": "another-nonce",
            "url": "https://example.com/acme/order/1"
        });

        let jws = signer.sign_empty(&header).unwrap();
        assert_eq!(jws.payload, "");
        assert!(!jws.signature.is_empty());
    }

    #[test]
    fn to_json_round_trips_through_serde() {
        let (_pkcs8, key_pair) = signer_with_fresh_key();
        let signer = JwsSigner::new(&key_pair);
        let jws = signer
            .sign(&json!({"alg": "ES256"}), &json!({"a": 1}))
            .unwrap();

        let value = jws.to_json();
        assert_eq!(value["protected"], jws.protected);
        assert_eq!(value["payload"], jws.payload);
        assert_eq!(value["signature"], jws.signature);
    }

    #[test]
    fn different_signing_inputs_produce_different_signatures() {
        let (_pkcs8, key_pair) = signer_with_fresh_key();
        let signer = JwsSigner::new(&key_pair);

        let jws_a = signer
            .sign(&json!({"alg": "ES256", "url": "a"}), &json!({}))
            .unwrap();
        let jws_b = signer
            .sign(&json!({"alg": "ES256", "url": "b"}), &json!({}))
            .unwrap();

        assert_ne!(jws_a.signature, jws_b.signature);
    }
}
