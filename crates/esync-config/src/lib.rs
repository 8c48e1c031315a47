//! esync-config
//!
//! Layered YAML configuration for the escrow sync services.
//!
//! - Layers merge in order; later documents override earlier ones.
//! - The merged document is canonicalised to JSON and hashed (SHA-256), so
//!   two deployments with the same effective config report the same hash.
//! - Literal secrets are rejected with `CONFIG_SECRET_DETECTED`. Config
//!   stores env var NAMES; [`resolve_secrets`] reads the values once.

mod model;
mod secrets;

pub use model::*;
pub use secrets::{resolve_secrets, ResolvedSecrets};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Env var listing config layer paths, comma separated, base first.
pub const CONFIG_PATHS_ENV: &str = "ESYNC_CONFIG";

/// Leaf strings starting with any of these abort loading.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "postgres://",
    "postgresql://",
];

/// Top-level sections read by [`EscrowSyncConfig`].
const KNOWN_SECTIONS: &[&str] = &[
    "/reconciliation",
    "/health",
    "/chains",
    "/daemon",
    "/database",
    "/autostart",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Deserialize and validate the typed view.
    pub fn typed(&self) -> Result<EscrowSyncConfig> {
        let cfg: EscrowSyncConfig = serde_json::from_value(self.config_json.clone())
            .context("config does not match the expected schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Leaf pointers outside every known section, sorted.
    pub fn unused_keys(&self) -> Vec<String> {
        let mut leaves = Vec::new();
        collect_leaf_pointers(&self.config_json, "", &mut leaves);
        let mut unused: Vec<String> = leaves
            .into_iter()
            .filter(|lp| lp != "/" && !KNOWN_SECTIONS.iter().any(|p| is_prefix_pointer(p, lp)))
            .collect();
        unused.sort();
        unused.dedup();
        unused
    }
}

/// Split the `ESYNC_CONFIG` value into paths. Unset yields no layers.
pub fn paths_from_env() -> Vec<String> {
    std::env::var(CONFIG_PATHS_ENV)
        .map(|v| split_paths(&v))
        .unwrap_or_default()
}

fn split_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load layers from disk. No paths yields the all-defaults config.
pub fn load_layered_yaml<P: AsRef<str>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let p = p.as_ref();
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

// ---------------------------------------------------------------------------
// Merge / canonical form
// ---------------------------------------------------------------------------

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        // Arrays (e.g. `chains`) replace wholesale.
        (_, b_other) => b_other,
    }
}

// serde_json's Map is ordered by key here, so plain serialization is canonical.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Secret guard
// ---------------------------------------------------------------------------

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    // RPC URLs often embed an API key in the path.
    if (t.starts_with("https://") || t.starts_with("wss://")) && t.contains("/v3/") {
        return true;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// JSON pointer helpers
// ---------------------------------------------------------------------------

/// "/a/b" consumes "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix) && leaf.as_bytes().get(prefix.len()) == Some(&b'/')
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_paths_trims_and_skips_blanks() {
        assert_eq!(
            split_paths(" config/base.yaml, ,config/prod.yaml "),
            vec!["config/base.yaml".to_string(), "config/prod.yaml".to_string()]
        );
        assert!(split_paths("").is_empty());
    }

    #[test]
    fn prefix_pointer_respects_segment_boundary() {
        assert!(is_prefix_pointer("/health", "/health/interval_ms"));
        assert!(!is_prefix_pointer("/health", "/healthz"));
        assert!(is_prefix_pointer("/chains", "/chains"));
    }

    #[test]
    fn keyed_rpc_urls_look_like_secrets() {
        assert!(looks_like_secret("https://mainnet.infura.io/v3/abcdef0123"));
        assert!(looks_like_secret("postgres://user:pw@db/esync"));
        assert!(!looks_like_secret("ESYNC_RPC_URL_1"));
        assert!(!looks_like_secret("short"));
    }

    #[test]
    fn empty_documents_are_ignored() {
        let a = load_layered_yaml_from_strings(&["", "{}"]).unwrap();
        assert_eq!(a.canonical_json, "{}");
    }
}
