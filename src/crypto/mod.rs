//! Cryptographic primitives: key generation, hashing, and encoding

pub mod encoding;
pub mod hash;
pub mod keypair;

pub use encoding::{Base64Encoding, PemEncoding};
pub use hash::{HashAlgorithm, Sha256Hash};
pub use keypair::KeyType;
