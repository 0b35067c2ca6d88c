/// Common wire types shared across the ACME client and orchestrator
use serde::{Deserialize, Serialize};

/// ACME problem document, as returned on non-2xx responses (RFC 7807)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<AcmeSubproblem>>,
}

impl AcmeErrorDetail {
    /// Collapse the problem document (including sub-problems) into a single
    /// human-readable string suitable for `RenewalStatus.error`.
    pub fn summarize(&self) -> String {
        let mut out = self.detail.clone().unwrap_or_else(|| self.error_type.clone());
        if let Some(subs) = &self.subproblems {
            for sub in subs {
                out.push_str("; ");
                out.push_str(&sub.detail.clone().unwrap_or_else(|| sub.error_type.clone()));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeSubproblem {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
}

/// Identifier for domain authorization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub id_type: String,
    pub value: String,
}

impl Identifier {
    pub fn dns(domain: impl Into<String>) -> Self {
        Self {
            id_type: "dns".to_string(),
            value: domain.into(),
        }
    }
}

/// Contact information for an ACME account
#[derive(Debug, Clone)]
pub struct Contact {
    pub email: Option<String>,
}

impl Contact {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    /// Convert to the ACME `mailto:` URI form expected in `contact` arrays
    pub fn to_uri(&self) -> Option<String> {
        self.email.as_ref().map(|e| format!("mailto:{}", e))
    }
}

/// Challenge type. Only `dns-01` is used by the orchestrator; the others are
/// retained so ACME directory/order parsing does not reject unknown values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeType {
    Http01,
    Dns01,
    TlsAlpn01,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Http01 => "http-01",
            ChallengeType::Dns01 => "dns-01",
            ChallengeType::TlsAlpn01 => "tls-alpn-01",
        }
    }
}

impl std::str::FromStr for ChallengeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "http-01" => Ok(ChallengeType::Http01),
            "dns-01" => Ok(ChallengeType::Dns01),
            "tls-alpn-01" => Ok(ChallengeType::TlsAlpn01),
            _ => Err(format!("unknown challenge type: {}", s)),
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ACME order status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Ready,
    Processing,
    Valid,
    Invalid,
    Expired,
    Deactivated,
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "ready" => Ok(OrderStatus::Ready),
            "processing" => Ok(OrderStatus::Processing),
            "valid" => Ok(OrderStatus::Valid),
            "invalid" => Ok(OrderStatus::Invalid),
            "expired" => Ok(OrderStatus::Expired),
            "deactivated" => Ok(OrderStatus::Deactivated),
            _ => Err(format!("unknown order status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_dns() {
        let id = Identifier::dns("example.com");
        assert_eq!(id.id_type, "dns");
        assert_eq!(id.value, "example.com");
    }

    #[test]
    fn contact_email_uri() {
        let contact = Contact::email("admin@example.com");
        assert_eq!(contact.to_uri().as_deref(), Some("mailto:admin@example.com"));
    }

    #[test]
    fn challenge_type_roundtrip() {
        assert_eq!(ChallengeType::Dns01.as_str(), "dns-01");
        assert_eq!("dns-01".parse::<ChallengeType>().unwrap(), ChallengeType::Dns01);
    }

    #[test]
    fn problem_document_summary_includes_subproblems() {
        let detail = AcmeErrorDetail {
            error_type: "urn:ietf:params:acme:error:malformed".into(),
            detail: Some("invalid identifier".into()),
            status: Some(400),
            title: None,
            subproblems: Some(vec![AcmeSubproblem {
                error_type: "urn:ietf:params:acme:error:rejectedIdentifier".into(),
                detail: Some("example.invalid rejected".into()),
                identifier: Some(Identifier::dns("example.invalid")),
            }]),
        };
        let summary = detail.summarize();
        assert!(summary.contains("invalid identifier"));
        assert!(summary.contains("example.invalid rejected"));
    }
}
