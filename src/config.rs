//! Orchestrator-level configuration: ACME directory selection, the
//! certificate store root, and DNS cleanup policy. Loads from TOML with
//! `${VAR}` environment-variable expansion, then applies the three
//! environment-variable overrides of the external interface — file first,
//! environment second, same layering the ecosystem favors for services that
//! run both from a checked-in file and from a container's env block.

use crate::error::{AcmeError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

fn default_staging() -> bool {
    true
}

fn default_accounts_dir() -> String {
    "./accounts".to_string()
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `true` selects the ACME staging directory; `false` selects production.
    #[serde(default = "default_staging")]
    pub staging: bool,

    /// Root directory for the certificate store (`${ACCOUNTS_DIR}`).
    #[serde(default = "default_accounts_dir")]
    pub accounts_dir: String,

    /// Force DNS record cleanup even when issuing against the staging
    /// directory (normally staging records are left in place to save the
    /// round trips of a throwaway renewal).
    #[serde(default)]
    pub cleanup_dns: bool,

    /// Contact email used when registering new ACME accounts, falling back
    /// to `ACME_CONTACT_EMAIL` if absent here.
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging: default_staging(),
            accounts_dir: default_accounts_dir(),
            cleanup_dns: false,
            contact_email: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML file, expands `${VAR}` references, then applies the
    /// `LETSENCRYPT_STAGING` / `LETSENCRYPT_CLEANUP_DNS` / `ACCOUNTS_DIR`
    /// environment overrides on top.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AcmeError::configuration(format!("reading config file: {}", e)))?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_var(content)?;
        let mut config: Self = toml::from_str(&expanded).map_err(|e| AcmeError::configuration(format!("parsing TOML: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies the three external-interface environment overrides on top of
    /// whatever the file (or the struct default) already holds.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(staging) = env::var("LETSENCRYPT_STAGING") {
            self.staging = matches!(staging.as_str(), "1" | "true" | "TRUE");
        }
        if let Ok(cleanup) = env::var("LETSENCRYPT_CLEANUP_DNS") {
            self.cleanup_dns = matches!(cleanup.as_str(), "1" | "true" | "TRUE");
        }
        if let Ok(dir) = env::var("ACCOUNTS_DIR") {
            self.accounts_dir = dir;
        }
    }

    /// Expands every `${VAR}` occurrence in `value` with the environment
    /// variable of the same name, leaving the placeholder untouched if the
    /// variable isn't set.
    pub fn expand_env_var(value: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| AcmeError::configuration(format!("invalid env-var pattern: {}", e)))?;
        Ok(re
            .replace_all(value, |caps: &regex::Captures| {
                let var_name = &caps[1];
                env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_staging_and_the_conventional_accounts_dir() {
        let config = Config::default();
        assert!(config.staging);
        assert_eq!(config.accounts_dir, "./accounts");
        assert!(!config.cleanup_dns);
    }

    #[test]
    fn parses_toml_and_expands_env_vars() {
        temp_env::with_var("CF_TOKEN_FOR_TEST", Some("secret-token"), || {
            let toml = r#"
                staging = false
                accounts_dir = "/srv/acme-accounts"
                contact_email = "${CF_TOKEN_FOR_TEST}"
            "#;
            let config = Config::from_str(toml).unwrap();
            assert!(!config.staging);
            assert_eq!(config.accounts_dir, "/srv/acme-accounts");
            assert_eq!(config.contact_email.as_deref(), Some("secret-token"));
        });
    }

    #[test]
    fn env_overrides_win_over_the_file() {
        temp_env::with_vars(
            [("LETSENCRYPT_STAGING", Some("false")), ("ACCOUNTS_DIR", Some("/override"))],
            || {
                let config = Config::from_str("staging = true\naccounts_dir = \"/from-file\"\n").unwrap();
                assert!(!config.staging);
                assert_eq!(config.accounts_dir, "/override");
            },
        );
    }

    #[test]
    fn expand_env_var_leaves_unset_placeholders_untouched() {
        let result = Config::expand_env_var("${THIS_VAR_IS_DEFINITELY_NOT_SET}").unwrap();
        assert_eq!(result, "${THIS_VAR_IS_DEFINITELY_NOT_SET}");
    }
}
