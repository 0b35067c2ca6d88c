/// Error taxonomy for the renewal orchestrator and its collaborators
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, AcmeError>;

/// Error types for orchestrator, ACME, DNS, device and storage operations
#[derive(Error, Debug)]
pub enum AcmeError {
    /// A non-terminal renewal already exists for this connection
    #[error("connection {0} already has an active renewal")]
    AlreadyActive(i64),

    /// Requested resource (connection, renewal, account) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Required configuration (credentials, contact email, custom CSR) is missing
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// Supplied CSR is not well-formed PEM
    #[error("CSR is not valid PEM: {0}")]
    CsrFormatInvalid(String),

    /// Non-2xx response from a device's REST API
    #[error("device API error: HTTP {status} - {body}")]
    DeviceApiError { status: u16, body: String },

    /// Protocol-level error from the ACME directory, with URL and problem document
    #[error("ACME protocol error at {url}: {problem}")]
    AcmeProtocolError { url: String, problem: String },

    /// DNS provider API call failed
    #[error("DNS provider error: {0}")]
    DnsProviderError(String),

    /// No hosted zone matches a target FQDN by longest-suffix match
    #[error("no DNS zone matches {0}")]
    ZoneNotFound(String),

    /// DNS propagation did not complete before the deadline
    #[error("DNS propagation did not complete before the deadline")]
    PropagationTimeout,

    /// Manual DNS entry was not published before the 5-minute deadline
    #[error("manual DNS entry was not published before the deadline")]
    ManualDnsTimeout,

    /// Order transitioned to `invalid`
    #[error("order became invalid: {authz_detail}")]
    OrderInvalid { authz_detail: String },

    /// Certificate parsing failed
    #[error("failed to parse certificate: {0}")]
    CertificateParseError(String),

    /// Renewal was cancelled via its cancellation token
    #[error("renewal was cancelled")]
    Cancelled,

    /// A non-terminal renewal was found at process start and marked failed
    #[error("renewal was interrupted")]
    Interrupted,

    /// Account-related error
    #[error("Account error: {0}")]
    Account(String),

    /// Cryptographic operation error (key generation, signing, hashing)
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// HTTP transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    Pem(String),
}

impl AcmeError {
    pub fn already_active(connection_id: i64) -> Self {
        AcmeError::AlreadyActive(connection_id)
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AcmeError::NotFound(msg.into())
    }

    pub fn config_missing<S: Into<String>>(msg: S) -> Self {
        AcmeError::ConfigMissing(msg.into())
    }

    pub fn csr_format_invalid<S: Into<String>>(msg: S) -> Self {
        AcmeError::CsrFormatInvalid(msg.into())
    }

    pub fn device_api<S: Into<String>>(status: u16, body: S) -> Self {
        AcmeError::DeviceApiError {
            status,
            body: body.into(),
        }
    }

    pub fn acme_protocol<U: Into<String>, P: Into<String>>(url: U, problem: P) -> Self {
        AcmeError::AcmeProtocolError {
            url: url.into(),
            problem: problem.into(),
        }
    }

    pub fn dns_provider<S: Into<String>>(msg: S) -> Self {
        AcmeError::DnsProviderError(msg.into())
    }

    pub fn zone_not_found<S: Into<String>>(fqdn: S) -> Self {
        AcmeError::ZoneNotFound(fqdn.into())
    }

    pub fn order_invalid<S: Into<String>>(authz_detail: S) -> Self {
        AcmeError::OrderInvalid {
            authz_detail: authz_detail.into(),
        }
    }

    pub fn certificate_parse<S: Into<String>>(msg: S) -> Self {
        AcmeError::CertificateParseError(msg.into())
    }

    pub fn account<S: Into<String>>(msg: S) -> Self {
        AcmeError::Account(msg.into())
    }

    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        AcmeError::Crypto(msg.into())
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        AcmeError::Transport(msg.into())
    }

    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        AcmeError::Configuration(msg.into())
    }

    pub fn pem<S: Into<String>>(msg: S) -> Self {
        AcmeError::Pem(msg.into())
    }

    /// True for errors that are logged as warnings but never fail a renewal:
    /// service restart failures and trust-certificate listing failures.
    pub fn is_advisory(&self) -> bool {
        matches!(self, AcmeError::DeviceApiError { .. } | AcmeError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_active_carries_connection_id() {
        let err = AcmeError::already_active(42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn device_api_formats_status_and_body() {
        let err = AcmeError::device_api(500, "boom");
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }
}
