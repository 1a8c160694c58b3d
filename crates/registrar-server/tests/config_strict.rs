#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use registrar_server::config::{self, ServerConfig};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
database:
  host: "db"
  retrys: 3 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIGURATION");
}

#[test]
fn ok_minimal_config_uses_defaults() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.server.listen, "0.0.0.0:3000");
    assert_eq!(cfg.metrics.path, "/metrics");
    assert_eq!(
        cfg.metrics.duration_buckets,
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]
    );
    assert_eq!(cfg.database.host, "localhost");
    assert_eq!(cfg.database.port, 3306);
    assert_eq!(cfg.database.retries, 10);
    assert_eq!(cfg.database.retry_delay_ms, 3000);
}

#[test]
fn rejects_unsupported_version() {
    assert!(config::load_from_str("version: 2\n").is_err());
}

#[test]
fn rejects_malformed_buckets() {
    let bad = r#"
version: 1
metrics:
  duration_buckets: [0.5, 0.1]
"#;
    let err = config::load_from_str(bad).expect_err("descending buckets");
    let msg = err.to_string();
    assert!(
        msg.contains("metrics.duration_buckets: bucket bounds must be strictly ascending"),
        "{msg}"
    );
    assert_eq!(msg.matches("invalid config").count(), 1, "{msg}");
}

#[test]
fn rejects_bad_listen_and_metrics_path() {
    assert!(config::load_from_str("version: 1\nserver:\n  listen: \"nope\"\n").is_err());
    assert!(config::load_from_str("version: 1\nmetrics:\n  path: \"metrics\"\n").is_err());
    assert!(config::load_from_str("version: 1\nmetrics:\n  path: \"/healthz\"\n").is_err());
}

#[test]
fn metrics_path_must_not_capture() {
    for path in ["/:x", "/*rest", "/ops/:name/metrics", "/{id}"] {
        let yaml = format!("version: 1\nmetrics:\n  path: \"{path}\"\n");
        let err = config::load_from_str(&yaml).expect_err(path);
        assert!(err.to_string().contains("metrics.path"), "{err}");
    }
    let ok = config::load_from_str("version: 1\nmetrics:\n  path: \"/ops/metrics\"\n").unwrap();
    assert_eq!(ok.metrics.path, "/ops/metrics");
}

#[test]
fn connect_timeout_defaults_and_bounds() {
    let cfg = config::load_from_str("version: 1\n").unwrap();
    assert_eq!(cfg.database.connect_timeout_ms, 5000);
    assert_eq!(cfg.metrics.max_unmatched_routes, 100);
    assert!(config::load_from_str("version: 1\ndatabase:\n  connect_timeout_ms: 0\n").is_err());
}

#[test]
fn env_overrides_connection_parameters() {
    let env: HashMap<&str, &str> = [
        ("DB_HOST", "mysql"),
        ("DB_USER", "app"),
        ("DB_PASS", "secret"),
        ("DB_NAME", "school"),
        ("DB_PORT", "3307"),
        ("BACKEND_PORT", "8081"),
    ]
    .into_iter()
    .collect();

    let mut cfg = ServerConfig::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
    cfg.validate().unwrap();

    assert_eq!(cfg.database.host, "mysql");
    assert_eq!(cfg.database.user, "app");
    assert_eq!(cfg.database.password, "secret");
    assert_eq!(cfg.database.name, "school");
    assert_eq!(cfg.database.port, 3307);
    assert_eq!(cfg.server.listen, "0.0.0.0:8081");
}

#[test]
fn db_password_wins_over_alias() {
    let mut cfg = ServerConfig::default();
    cfg.apply_env(|k| match k {
        "DB_PASSWORD" => Some("primary".into()),
        "DB_PASS" => Some("alias".into()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.database.password, "primary");
}

#[test]
fn bad_port_env_is_a_config_error() {
    let mut cfg = ServerConfig::default();
    let err = cfg
        .apply_env(|k| (k == "DB_PORT").then(|| "mysql".to_string()))
        .expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIGURATION");
}
