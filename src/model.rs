//! Domain types shared between the orchestrator and its collaborators:
//! the connection being renewed, provider credentials, and the lifecycle
//! record exposed to callers as renewal status.

use serde::{Deserialize, Serialize};

use crate::dns::providers::ManualDnsEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Vos,
    General,
    Portal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslProvider {
    AcmePrimary,
    AcmeAlt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsProviderKind {
    Cloudflare,
    Digitalocean,
    Route53,
    Azure,
    Google,
    Custom,
}

impl DnsProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsProviderKind::Cloudflare => "cloudflare",
            DnsProviderKind::Digitalocean => "digitalocean",
            DnsProviderKind::Route53 => "route53",
            DnsProviderKind::Azure => "azure",
            DnsProviderKind::Google => "google",
            DnsProviderKind::Custom => "custom",
        }
    }
}

/// The unit of renewal: one device/endpoint and how to reach and validate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub name: String,
    pub application_type: ApplicationType,
    pub hostname: String,
    pub domain: String,
    #[serde(default)]
    pub alt_names: Vec<String>,
    pub username: String,
    pub password: String,
    pub ssl_provider: SslProvider,
    pub dns_provider: DnsProviderKind,
    #[serde(default)]
    pub custom_csr: Option<String>,
    #[serde(default)]
    pub enable_ssh: bool,
    #[serde(default)]
    pub auto_restart_service: bool,
    #[serde(default)]
    pub last_cert_issued: Option<String>,
    #[serde(default)]
    pub cert_count_this_week: u32,
    #[serde(default)]
    pub cert_count_reset_date: Option<String>,
}

impl Connection {
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.hostname, self.domain)
    }

    pub fn domains(&self) -> Vec<String> {
        let mut domains = vec![self.fqdn()];
        domains.extend(self.alt_names.iter().cloned());
        domains
    }
}

/// A scoped credential tuple, e.g. `(provider="cloudflare", key="CF_KEY", value="...")`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub provider: String,
    pub key: String,
    pub value: String,
}

/// Where a renewal currently stands. Mirrors §4.1.3's fixed state→progress
/// mapping; keep that table and `progress()` in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalState {
    Pending,
    GeneratingCsr,
    CreatingAccount,
    RequestingCertificate,
    CreatingDnsChallenge,
    WaitingDnsPropagation,
    WaitingManualDns,
    CompletingValidation,
    DownloadingCertificate,
    UploadingCertificate,
    Completed,
    Failed,
}

impl RenewalState {
    pub fn progress(&self) -> u8 {
        match self {
            RenewalState::Pending => 0,
            RenewalState::GeneratingCsr => 10,
            RenewalState::CreatingAccount => 15,
            RenewalState::RequestingCertificate => 20,
            RenewalState::CreatingDnsChallenge => 30,
            RenewalState::WaitingDnsPropagation => 50,
            RenewalState::WaitingManualDns => 65,
            RenewalState::CompletingValidation => 70,
            RenewalState::DownloadingCertificate => 80,
            RenewalState::UploadingCertificate => 90,
            RenewalState::Completed => 100,
            RenewalState::Failed => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenewalState::Completed | RenewalState::Failed)
    }
}

/// Lifecycle record of one renewal attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalStatus {
    pub id: String,
    pub connection_id: i64,
    pub state: RenewalState,
    pub message: String,
    pub progress: u8,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub manual_dns_entry: Option<ManualDnsEntry>,
}

impl RenewalStatus {
    pub fn new(id: String, connection_id: i64, start_time: String) -> Self {
        Self {
            id,
            connection_id,
            state: RenewalState::Pending,
            message: "renewal queued".to_string(),
            progress: RenewalState::Pending.progress(),
            start_time,
            end_time: None,
            error: None,
            logs: Vec::new(),
            manual_dns_entry: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A registered ACME account, scoped to one (domain, environment) pair and
/// reused across renewals rather than re-registered each time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeAccount {
    pub domain: String,
    pub staging: bool,
    pub account_url: String,
    pub contact_email: String,
    pub key_pem: String,
}

/// A DNS-01 TXT record created for the lifetime of one renewal. Deliberately
/// not an orchestrator field — these live inside the renewal task's local
/// state so that concurrent renewals never share or overwrite each other's
/// record lists.
#[derive(Debug, Clone)]
pub struct DnsChallengeRecord {
    pub record_id: String,
    pub fqdn: String,
    pub expected_value: String,
    pub challenge_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_joins_hostname_and_domain() {
        let conn = sample_connection();
        assert_eq!(conn.fqdn(), "ucm01.lab.example.com");
    }

    #[test]
    fn domains_includes_alt_names() {
        let mut conn = sample_connection();
        conn.alt_names = vec!["alt.lab.example.com".to_string()];
        assert_eq!(conn.domains(), vec!["ucm01.lab.example.com", "alt.lab.example.com"]);
    }

    #[test]
    fn progress_mapping_is_monotone_through_the_happy_path() {
        let happy_path = [
            RenewalState::Pending,
            RenewalState::GeneratingCsr,
            RenewalState::CreatingAccount,
            RenewalState::RequestingCertificate,
            RenewalState::CreatingDnsChallenge,
            RenewalState::WaitingDnsPropagation,
            RenewalState::CompletingValidation,
            RenewalState::DownloadingCertificate,
            RenewalState::UploadingCertificate,
            RenewalState::Completed,
        ];
        let mut last = 0;
        for state in happy_path {
            assert!(state.progress() >= last, "{:?} regressed progress", state);
            last = state.progress();
        }
    }

    #[test]
    fn progress_mapping_is_monotone_through_the_manual_dns_path() {
        let manual_path = [
            RenewalState::Pending,
            RenewalState::GeneratingCsr,
            RenewalState::CreatingAccount,
            RenewalState::RequestingCertificate,
            RenewalState::CreatingDnsChallenge,
            RenewalState::WaitingManualDns,
            RenewalState::CompletingValidation,
            RenewalState::DownloadingCertificate,
            RenewalState::UploadingCertificate,
            RenewalState::Completed,
        ];
        let mut last = 0;
        for state in manual_path {
            assert!(state.progress() >= last, "{:?} regressed progress", state);
            last = state.progress();
        }
    }

    fn sample_connection() -> Connection {
        Connection {
            id: 1,
            name: "ucm01".to_string(),
            application_type: ApplicationType::Vos,
            hostname: "ucm01".to_string(),
            domain: "lab.example.com".to_string(),
            alt_names: vec![],
            username: "admin".to_string(),
            password: "p".to_string(),
            ssl_provider: SslProvider::AcmePrimary,
            dns_provider: DnsProviderKind::Cloudflare,
            custom_csr: None,
            enable_ssh: false,
            auto_restart_service: false,
            last_cert_issued: None,
            cert_count_this_week: 0,
            cert_count_reset_date: None,
        }
    }
}
