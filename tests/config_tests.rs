// Config loading and validation tests

use std::io::Write;
use volshrink::config::AppConfig;

const VALID_CONFIG: &str = r#"
[orchestrator]
agent_port = 7070
agent_scheme = "http"
request_timeout_ms = 5000
max_targets = 16
parallel_collection = false
local_aliases = ["localhost"]

[agent]
host = "127.0.0.1"
port = 7071
username = "admin"
password = "secret"
minimum_headroom_bytes = 1048576
resize_command = ["lvresize", "-L", "{size}B", "{device}"]

[audit]
enabled = true
path = "data/audit.db"
retention_days = 30
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.orchestrator.request_timeout_ms, 5000);
    assert_eq!(config.orchestrator.max_targets, 16);
    assert!(!config.orchestrator.parallel_collection);
    assert_eq!(config.orchestrator.local_aliases, vec!["localhost"]);
    assert_eq!(config.agent.port, 7071);
    assert_eq!(config.agent.minimum_headroom_bytes, 1_048_576);
    assert_eq!(config.agent.resize_command.len(), 4);
    assert_eq!(config.audit.retention_days, 30);
}

#[test]
fn test_config_empty_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.orchestrator.agent_port, 7070);
    assert_eq!(config.orchestrator.request_timeout().as_secs(), 30);
    assert!(config.orchestrator.parallel_collection);
    assert!(config.audit.enabled);
    assert!(config.agent.resize_command.is_empty());
}

#[test]
fn test_config_validation_rejects_zero_timeout() {
    let bad = VALID_CONFIG.replace("request_timeout_ms = 5000", "request_timeout_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("orchestrator.request_timeout_ms"));
}

#[test]
fn test_config_validation_rejects_unknown_scheme() {
    let bad = VALID_CONFIG.replace("agent_scheme = \"http\"", "agent_scheme = \"ftp\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("orchestrator.agent_scheme"));
}

#[test]
fn test_config_validation_rejects_zero_max_targets() {
    let bad = VALID_CONFIG.replace("max_targets = 16", "max_targets = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("orchestrator.max_targets"));
}

#[test]
fn test_config_validation_rejects_agent_port_zero() {
    let bad = VALID_CONFIG.replace("port = 7071", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("agent.port"));
}

#[test]
fn test_config_validation_rejects_empty_audit_path() {
    let bad = VALID_CONFIG.replace("path = \"data/audit.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("audit.path"));
}

#[test]
fn test_config_disabled_audit_skips_audit_checks() {
    let cfg = VALID_CONFIG
        .replace("enabled = true", "enabled = false")
        .replace("retention_days = 30", "retention_days = 0");
    assert!(AppConfig::load_from_str(&cfg).is_ok());
}

#[test]
fn test_agent_requires_credentials() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    assert!(config.validate_agent().is_ok());

    let bad = VALID_CONFIG.replace("password = \"secret\"", "password = \"\"");
    let config = AppConfig::load_from_str(&bad).unwrap();
    let err = config.validate_agent().unwrap_err();
    assert!(err.to_string().contains("agent.password"));
}

#[test]
fn test_config_load_from_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VALID_CONFIG.as_bytes()).unwrap();
    let config = AppConfig::load(Some(file.path())).expect("load");
    assert_eq!(config.agent.username, "admin");
}

#[test]
fn test_config_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(AppConfig::load(Some(&missing)).is_err());
}

#[test]
fn test_plain_http_scheme_is_flagged() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    assert!(config.orchestrator.sends_plaintext_credentials());

    let tls = VALID_CONFIG.replace("agent_scheme = \"http\"", "agent_scheme = \"https\"");
    let config = AppConfig::load_from_str(&tls).unwrap();
    assert!(!config.orchestrator.sends_plaintext_credentials());
}
