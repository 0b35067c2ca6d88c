//! Encoding helpers - Base64, PEM and hex

use crate::error::{AcmeError, Result};
use base64::Engine;

/// Base64 encoder
pub struct Base64Encoding;

impl Base64Encoding {
    /// URL-safe base64, no padding (JWS/ACME convention)
    pub fn encode(data: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
    }

    /// URL-safe base64 decode, restoring padding first
    pub fn decode(data: &str) -> Result<Vec<u8>> {
        let padded = match data.len() % 4 {
            2 => format!("{}==", data),
            3 => format!("{}=", data),
            _ => data.to_string(),
        };

        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&padded)
            .map_err(|e| AcmeError::crypto(format!("base64 decode error: {}", e)))
    }

    pub fn encode_standard(data: &[u8]) -> String {
        use base64::engine::general_purpose::STANDARD;
        STANDARD.encode(data)
    }

    pub fn decode_standard(data: &str) -> Result<Vec<u8>> {
        use base64::engine::general_purpose::STANDARD;
        STANDARD
            .decode(data)
            .map_err(|e| AcmeError::crypto(format!("base64 decode error: {}", e)))
    }
}

/// PEM encoder/decoder
pub struct PemEncoding;

impl PemEncoding {
    pub fn encode(data: &[u8], label: &str) -> String {
        let pem = pem::Pem::new(label.to_string(), data.to_vec());
        pem::encode(&pem)
    }

    pub fn decode(pem_data: &str) -> Result<(String, Vec<u8>)> {
        let pem = pem::parse(pem_data)
            .map_err(|e| AcmeError::crypto(format!("PEM parse error: {}", e)))?;

        Ok((pem.tag().to_string(), pem.contents().to_vec()))
    }

    pub fn is_valid(data: &str) -> bool {
        pem::parse(data).is_ok()
    }

    pub fn extract_data(pem_data: &str, expected_label: Option<&str>) -> Result<Vec<u8>> {
        let (label, data) = Self::decode(pem_data)?;

        if let Some(expected) = expected_label
            && label != expected
        {
            return Err(AcmeError::crypto(format!(
                "expected PEM label '{}', got '{}'",
                expected, label
            )));
        }

        Ok(data)
    }

    /// Split a concatenated PEM bundle into its individual blocks, in order.
    /// Used to split a downloaded fullchain into leaf + intermediates.
    pub fn split_blocks(bundle: &str) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut current = String::new();
        for line in bundle.lines() {
            current.push_str(line);
            current.push('\n');
            if line.starts_with("-----END ") {
                blocks.push(current.trim_end().to_string());
                current.clear();
            }
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_encode_decode_roundtrip() {
        let data = b"hello world";
        let encoded = Base64Encoding::encode(data);
        let decoded = Base64Encoding::decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn base64_is_url_safe() {
        let data = b"\xfb\xff\xfe";
        let encoded = Base64Encoding::encode(data);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
    }

    #[test]
    fn pem_encode_decode_roundtrip() {
        let data = b"test data";
        let pem = PemEncoding::encode(data, "TEST");

        assert!(pem.contains("-----BEGIN TEST-----"));
        assert!(pem.contains("-----END TEST-----"));

        let (label, decoded) = PemEncoding::decode(&pem).unwrap();
        assert_eq!(label, "TEST");
        assert_eq!(decoded, data);
    }

    #[test]
    fn split_blocks_separates_leaf_from_intermediate() {
        let leaf = PemEncoding::encode(b"leaf", "CERTIFICATE");
        let intermediate = PemEncoding::encode(b"intermediate", "CERTIFICATE");
        let bundle = format!("{}\n{}\n", leaf, intermediate);

        let blocks = PemEncoding::split_blocks(&bundle);
        assert_eq!(blocks.len(), 2);
        assert_eq!(PemEncoding::decode(&blocks[0]).unwrap().1, b"leaf");
        assert_eq!(PemEncoding::decode(&blocks[1]).unwrap().1, b"intermediate");
    }
}
