//! ACME order/authorization/challenge resources (RFC 8555 §7.1.3-7.1.6)

use crate::types::{Identifier, OrderStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "type")]
    pub challenge_type: String,
    pub url: String,
    pub status: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Challenge {
    pub fn is_valid(&self) -> bool {
        self.status == "valid"
    }

    pub fn is_dns01(&self) -> bool {
        self.challenge_type == "dns-01"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub identifier: Identifier,
    pub status: String,
    pub expires: String,
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub wildcard: Option<bool>,
}

impl Authorization {
    pub fn dns01_challenge(&self) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.is_dns01())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub status: String,
    pub expires: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub authorizations: Vec<String>,
    pub finalize: String,
    #[serde(default)]
    pub certificate: Option<String>,
}

impl Order {
    pub fn status_enum(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status_enum(), Some(OrderStatus::Ready))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.status_enum(), Some(OrderStatus::Valid))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.status_enum(), Some(OrderStatus::Invalid))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status_enum(),
            Some(OrderStatus::Valid | OrderStatus::Invalid)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub identifiers: Vec<Identifier>,
}

impl NewOrderRequest {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            identifiers: domains.into_iter().map(Identifier::dns).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizationRequest {
    pub csr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dns01_challenge() {
        let json = r#"{
            "type": "dns-01",
            "url": "https://example.com/acme/challenge/123",
            "status": "pending",
            "token": "test-token"
        }"#;
        let challenge: Challenge = serde_json::from_str(json).unwrap();
        assert!(challenge.is_dns01());
        assert!(!challenge.is_valid());
    }

    #[test]
    fn authorization_finds_dns01_challenge() {
        let json = r#"{
            "identifier": {"type": "dns", "value": "example.com"},
            "status": "pending",
            "expires": "2024-01-01T00:00:00Z",
            "challenges": [
                {"type": "http-01", "url": "https://example.com/1", "status": "pending", "token": "t1"},
                {"type": "dns-01", "url": "https://example.com/2", "status": "pending", "token": "t2"}
            ]
        }"#;
        let auth: Authorization = serde_json::from_str(json).unwrap();
        assert_eq!(auth.dns01_challenge().unwrap().token, "t2");
    }

    #[test]
    fn order_status_transitions() {
        let mut order: Order = serde_json::from_str(
            r#"{
            "status": "pending",
            "expires": "2024-01-01T00:00:00Z",
            "identifiers": [{"type": "dns", "value": "example.com"}],
            "authorizations": ["https://example.com/acme/authz/1"],
            "finalize": "https://example.com/acme/finalize/1"
        }"#,
        )
        .unwrap();

        assert!(!order.is_ready());
        assert!(!order.is_terminal());

        order.status = "valid".to_string();
        assert!(order.is_valid());
        assert!(order.is_terminal());
    }

    #[test]
    fn new_order_request_builds_dns_identifiers() {
        let req = NewOrderRequest::new(vec!["example.com".to_string(), "www.example.com".to_string()]);
        assert_eq!(req.identifiers.len(), 2);
        assert_eq!(req.identifiers[0].id_type, "dns");
    }
}
