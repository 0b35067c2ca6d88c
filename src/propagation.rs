//! Confirms a DNS-01 TXT record has actually propagated before asking the
//! ACME server to validate it. Polls a panel of public resolvers directly —
//! independent of whatever provider API created the record — since the
//! provider's own "the record exists" answer says nothing about what
//! recursive resolvers out on the internet will see.

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{AcmeError, Result};

/// Public recursive resolvers queried in parallel; propagation is only
/// declared complete once every one of them agrees.
const DEFAULT_RESOLVERS: &[(&str, &str)] = &[("google", "8.8.8.8:53"), ("cloudflare", "1.1.1.1:53")];

pub struct PropagationVerifier {
    resolvers: Vec<hickory_resolver::TokioResolver>,
    poll_interval: Duration,
}

impl PropagationVerifier {
    pub fn new() -> Result<Self> {
        Self::with_poll_interval(Duration::from_secs(10))
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Result<Self> {
        let resolvers = DEFAULT_RESOLVERS
            .iter()
            .map(|(_, addr)| {
                let socket: std::net::SocketAddr = addr
                    .parse()
                    .map_err(|e| AcmeError::configuration(format!("bad resolver address {}: {}", addr, e)))?;
                let config = ResolverConfig::from_parts(
                    None,
                    vec![],
                    NameServerConfigGroup::from_ips_clear(&[socket.ip()], socket.port(), true),
                );
                Ok(hickory_resolver::TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                    .with_options(ResolverOpts::default())
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { resolvers, poll_interval })
    }

    /// Queries every resolver once; true iff all of them return `expected_value`.
    pub async fn check_once(&self, fqdn: &str, expected_value: &str) -> Result<bool> {
        for (i, resolver) in self.resolvers.iter().enumerate() {
            match resolver.txt_lookup(fqdn).await {
                Ok(lookup) => {
                    let seen = lookup.iter().any(|txt| txt.to_string() == expected_value);
                    if !seen {
                        return Ok(false);
                    }
                }
                Err(e) => {
                    tracing::debug!(fqdn, resolver = i, error = %e, "propagation lookup failed, treating as not yet propagated");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Polls every `poll_interval` until all resolvers agree or `deadline` elapses.
    pub async fn wait_for_propagation(&self, fqdn: &str, expected_value: &str, deadline: Duration) -> Result<bool> {
        let started = Instant::now();
        loop {
            if self.check_once(fqdn, expected_value).await? {
                return Ok(true);
            }
            if started.elapsed() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_resolver_panel() {
        let verifier = PropagationVerifier::new().unwrap();
        assert_eq!(verifier.resolvers.len(), DEFAULT_RESOLVERS.len());
    }
}
