//! ACME v2 (RFC 8555) wire-level primitives: directory discovery, replay
//! nonces, JWK and JWS signing.

pub mod directory;
pub mod jwk;
pub mod jws;
pub mod nonce;

pub use directory::{Directory, DirectoryManager, DirectoryMeta};
pub use jwk::Jwk;
pub use jws::{Jws, JwsSigner};
pub use nonce::NonceManager;
