//! Runtime secret resolution.
//!
//! Config holds env var NAMES only. [`resolve_secrets`] is called once at
//! startup and its result is passed into constructors. `Debug` redacts every
//! value and errors name the variable, never its value.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::EscrowSyncConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// JSON-RPC URL per chain id.
    pub rpc_urls: BTreeMap<u64, String>,
    /// `None` when the named env var is unset; the daemon then refuses to
    /// start and the CLI db commands fail with the var name.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chains: Vec<(&u64, &str)> = self.rpc_urls.keys().map(|k| (k, "<REDACTED>")).collect();
        f.debug_struct("ResolvedSecrets")
            .field("rpc_urls", &chains)
            .field("database_url", &self.database_url.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Every configured chain must have its RPC URL set. The database URL is
/// optional at this layer.
pub fn resolve_secrets(cfg: &EscrowSyncConfig) -> Result<ResolvedSecrets> {
    let mut rpc_urls = BTreeMap::new();
    for chain in &cfg.chains {
        let Some(url) = resolve_env(&chain.rpc_url_env) else {
            bail!(
                "SECRETS_MISSING: required env var '{}' (rpc url for chain {}) is not set or empty",
                chain.rpc_url_env,
                chain.chain_id
            );
        };
        rpc_urls.insert(chain.chain_id, url);
    }

    Ok(ResolvedSecrets {
        rpc_urls,
        database_url: resolve_env(&cfg.database.url_env),
    })
}
