//! Layered loading, hashing and the typed view.

use esync_config::{load_layered_yaml, load_layered_yaml_from_strings};
use std::io::Write;

const BASE_YAML: &str = r#"
reconciliation:
  interval_ms: 300000
  batch_size: 5
  alert_medium: "0.01"
  alert_high: "0.1"
health:
  interval_ms: 60000
  endpoints:
    website: "http://127.0.0.1:3000/"
chains:
  - chain_id: 1
    rpc_url_env: "ESYNC_RPC_URL_1"
    escrow_address: "0x00000000000000000000000000000000000000e5"
"#;

const BASE_YAML_REORDERED: &str = r#"
chains:
  - escrow_address: "0x00000000000000000000000000000000000000e5"
    rpc_url_env: "ESYNC_RPC_URL_1"
    chain_id: 1
health:
  endpoints:
    website: "http://127.0.0.1:3000/"
  interval_ms: 60000
reconciliation:
  alert_high: "0.1"
  alert_medium: "0.01"
  batch_size: 5
  interval_ms: 300000
"#;

const OVERLAY_YAML: &str = r#"
reconciliation:
  interval_ms: 60000
autostart:
  reconciliation: true
"#;

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn overlay_overrides_base_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let cfg = merged.typed().unwrap();
    assert_eq!(cfg.reconciliation.interval_ms, 60_000);
    assert_eq!(cfg.reconciliation.batch_size, 5);
    assert!(cfg.autostart.reconciliation);
    assert!(!cfg.autostart.health);
    assert_eq!(cfg.chain_ids(), vec![1]);
    assert_eq!(cfg.contract_chain_id(), Some(1));
    assert_eq!(
        cfg.health.endpoints.website.as_deref(),
        Some("http://127.0.0.1:3000/")
    );
}

#[test]
fn literal_database_url_rejected() {
    let yaml = r#"
database:
  url_env: "postgres://esync:hunter2@db:5432/esync"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err().to_string();
    assert!(err.contains("CONFIG_SECRET_DETECTED"), "{err}");
    assert!(!err.contains("hunter2"));
}

#[test]
fn unknown_keys_are_reported_and_rejected_by_typed_view() {
    let yaml = r#"
reconciliation:
  interval_ms: 1000
dashboards:
  theme: "dark"
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    assert_eq!(loaded.unused_keys(), vec!["/dashboards/theme".to_string()]);
    assert!(loaded.typed().is_err());
}

#[test]
fn loads_layers_from_disk_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let prod = dir.path().join("prod.yaml");
    std::fs::File::create(&base)
        .unwrap()
        .write_all(BASE_YAML.as_bytes())
        .unwrap();
    std::fs::File::create(&prod)
        .unwrap()
        .write_all(OVERLAY_YAML.as_bytes())
        .unwrap();

    let paths = [
        base.to_string_lossy().to_string(),
        prod.to_string_lossy().to_string(),
    ];
    let from_disk = load_layered_yaml(&paths).unwrap();
    let from_mem = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_disk.config_hash, from_mem.config_hash);
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/nonexistent/esync.yaml"])
        .unwrap_err()
        .to_string();
    assert!(err.contains("/nonexistent/esync.yaml"), "{err}");
}

#[test]
fn no_layers_yields_valid_defaults() {
    let loaded = load_layered_yaml::<&str>(&[]).unwrap();
    let cfg = loaded.typed().unwrap();
    assert_eq!(cfg.daemon.bind, "127.0.0.1:8899");
    assert!(cfg.chains.is_empty());
}

#[test]
fn shipped_base_layer_is_valid_and_fully_read() {
    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/base.yaml");
    let loaded = load_layered_yaml(&[base]).unwrap();
    let cfg = loaded.typed().unwrap();

    assert!(loaded.unused_keys().is_empty(), "{:?}", loaded.unused_keys());
    assert_eq!(cfg.chain_ids(), vec![137]);
    assert_eq!(cfg.contract_chain_id(), Some(137));
    assert!(cfg.autostart.health);
    assert!(!cfg.autostart.reconciliation);
}
