//! Unit tests for configuration parsing and validation.

use atlas_gateway::config::GlobalConfig;
use atlas_gateway::AppError;

fn minimal_toml() -> &'static str {
    r#"
data_dir = "/var/lib/atlas-gateway"

[evaluator]
endpoint_url = "https://oracle.example.com/score"
"#
}

#[test]
fn parses_minimal_config_with_defaults() {
    let config = GlobalConfig::from_toml_str(minimal_toml()).expect("valid config");

    assert_eq!(config.http_port, 8080);
    assert_eq!(config.risk_threshold, 70);
    assert_eq!(config.decision_timeout_seconds, 86_400);
    assert_eq!(config.sweep_interval_seconds, 60);
    assert!(config.authorized_reviewer_ids.is_empty());
    assert_eq!(config.evaluator.timeout_seconds, 10);
    assert!(config.api_token.is_empty());
}

#[test]
fn parses_full_config_overrides() {
    let toml = r#"
data_dir = "/tmp/gw"
http_port = 9090
risk_threshold = 50
decision_timeout_seconds = 3600
sweep_interval_seconds = 30
authorized_reviewer_ids = ["sarah", "case-officer-2"]

[evaluator]
endpoint_url = "http://localhost:9000/infer"
timeout_seconds = 5
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("valid config");

    assert_eq!(config.http_port, 9090);
    assert_eq!(config.risk_threshold, 50);
    assert_eq!(config.decision_timeout_seconds, 3600);
    assert_eq!(config.sweep_interval_seconds, 30);
    assert_eq!(
        config.authorized_reviewer_ids,
        vec!["sarah", "case-officer-2"]
    );
    assert_eq!(config.evaluator.timeout_seconds, 5);
}

#[test]
fn rejects_zero_risk_threshold() {
    let toml = r#"
data_dir = "/tmp/gw"
risk_threshold = 0

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn rejects_risk_threshold_above_100() {
    let toml = r#"
data_dir = "/tmp/gw"
risk_threshold = 101

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn accepts_risk_threshold_100() {
    let toml = r#"
data_dir = "/tmp/gw"
risk_threshold = 100

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("valid config");
    assert_eq!(config.risk_threshold, 100);
}

#[test]
fn rejects_zero_decision_timeout() {
    let toml = r#"
data_dir = "/tmp/gw"
decision_timeout_seconds = 0

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn rejects_zero_sweep_interval() {
    let toml = r#"
data_dir = "/tmp/gw"
sweep_interval_seconds = 0

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn rejects_empty_evaluator_endpoint() {
    let toml = r#"
data_dir = "/tmp/gw"

[evaluator]
endpoint_url = ""
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn rejects_missing_evaluator_section() {
    let toml = r#"
data_dir = "/tmp/gw"
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn rejects_zero_evaluator_timeout() {
    let toml = r#"
data_dir = "/tmp/gw"

[evaluator]
endpoint_url = "http://localhost:9000/infer"
timeout_seconds = 0
"#;
    assert!(matches!(
        GlobalConfig::from_toml_str(toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn derives_store_paths_from_data_dir() {
    let config = GlobalConfig::from_toml_str(minimal_toml()).expect("valid config");
    assert!(config.db_path().ends_with("governance.db"));
    assert!(config.audit_dir().ends_with("audit"));
    assert!(config.db_path().starts_with("/var/lib/atlas-gateway"));
}

#[test]
fn empty_allow_list_accepts_any_reviewer() {
    let config = GlobalConfig::from_toml_str(minimal_toml()).expect("valid config");
    assert!(config.ensure_reviewer_authorized("anyone").is_ok());
}

#[test]
fn allow_list_rejects_unlisted_reviewer() {
    let toml = r#"
data_dir = "/tmp/gw"
authorized_reviewer_ids = ["sarah"]

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("valid config");
    assert!(config.ensure_reviewer_authorized("sarah").is_ok());
    assert!(matches!(
        config.ensure_reviewer_authorized("mallory"),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn decision_timeout_converts_to_duration() {
    let toml = r#"
data_dir = "/tmp/gw"
decision_timeout_seconds = 120

[evaluator]
endpoint_url = "http://localhost:9000/infer"
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("valid config");
    assert_eq!(config.decision_timeout(), chrono::Duration::seconds(120));
    assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(60));
}
