use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use repairdesk_cli::commands::{config, evaluate, migrate, rules, scenarios};
use serde_json::{json, Value};

#[test]
fn evaluate_decides_a_case_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let case_path = write_case(
        dir.path(),
        json!({
            "device_type": "cooktop",
            "brand": "V-Zug",
            "age": 3,
            "error_description": "F7 and E3 error codes, heating element not working"
        }),
    );
    let rules_path = dir.path().join("absent_rules.json").display().to_string();

    with_env(&[("REPAIRDESK_RULES_PATH", rules_path.as_str())], || {
        let result = evaluate::run(&case_path, None);
        assert_eq!(result.exit_code, 0, "expected successful evaluation: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "evaluate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["outcome"]["recommendation"], "repair");
        assert!(payload["message"].as_str().unwrap_or_default().starts_with("repair (95% confidence)"));
        assert_eq!(
            payload["data"]["audit_trail"].as_array().and_then(|trail| trail.last()),
            Some(&json!("workflow.decision_recorded"))
        );
    });

    assert!(!dir.path().join("absent_rules.json").exists(), "evaluate must not write a rule book");
}

#[test]
fn evaluate_applies_override_rules_from_a_custom_rule_book() {
    let dir = tempfile::tempdir().expect("tempdir");
    let case_path = write_case(
        dir.path(),
        json!({
            "device_type": "dishwasher",
            "brand": "V-Zug",
            "age": 5,
            "error_description": "Water leak from door seal"
        }),
    );
    let rules_path = dir.path().join("recall_rules.json");
    fs::write(
        &rules_path,
        json!({
            "version": "2.0",
            "last_updated": "2026-01-15",
            "rule_sets": {
                "recalls": {
                    "priority": 1,
                    "rules": [{
                        "name": "seal_recall",
                        "conditions": [
                            {"field": "brand", "operator": "equals", "value": "V-Zug"},
                            {"field": "device_type", "operator": "equals", "value": "dishwasher"}
                        ],
                        "action": "refer_manufacturer",
                        "override": true,
                        "reasoning": "Door seal recall handled by the manufacturer"
                    }]
                }
            }
        })
        .to_string(),
    )
    .expect("write rule book");

    with_env(&[], || {
        let result = evaluate::run(&case_path, Some(rules_path.clone()));
        assert_eq!(result.exit_code, 0, "expected successful evaluation: {}", result.output);

        let payload = parse_payload(&result.output);
        let outcome = &payload["data"]["outcome"];
        assert_eq!(outcome["recommendation"], "manufacturer_referral");
        assert_eq!(outcome["rules_override_applied"], true);
    });
}

#[test]
fn evaluate_reports_unreadable_case_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.json");
    let malformed = dir.path().join("malformed.json");
    fs::write(&malformed, "{ \"age\": \"old\" }").expect("write case");

    with_env(&[], || {
        for path in [&missing, &malformed] {
            let result = evaluate::run(path, Some(dir.path().join("rules.json")));
            assert_eq!(result.exit_code, 7);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "invalid_input");
        }
    });
}

#[test]
fn evaluate_fails_on_malformed_rule_book() {
    let dir = tempfile::tempdir().expect("tempdir");
    let case_path = write_case(dir.path(), json!({"device_type": "oven", "brand": "Siemens", "age": 4}));
    let rules_path = dir.path().join("rules.json");
    fs::write(&rules_path, "[]").expect("write rules");

    with_env(&[], || {
        let result = evaluate::run(&case_path, Some(rules_path.clone()));
        assert_eq!(result.exit_code, 8);
        assert_eq!(parse_payload(&result.output)["error_class"], "rules_load");
    });
}

#[test]
fn scenarios_all_reach_their_expected_outcome() {
    with_env(&[], || {
        let result = scenarios::run();
        assert_eq!(result.exit_code, 0, "expected all scenarios to pass: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "4/4 demo scenarios reached their expected outcome");
        let checks = payload["data"].as_array().expect("scenario checks");
        assert_eq!(checks[2]["actual"], "manufacturer_referral");
        assert_eq!(checks[2]["confidence_score"], 1.0);
    });
}

#[test]
fn rules_summarizes_built_in_defaults_when_file_is_absent() {
    let dir = tempfile::tempdir().expect("tempdir");

    with_env(&[], || {
        let result = rules::run(Some(dir.path().join("business_rules.json")));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "rules");
        assert_eq!(payload["data"]["total_rules"], 10);
        assert_eq!(payload["data"]["version"], "1.0");
        assert!(payload["message"].as_str().unwrap_or_default().ends_with("source built-in defaults)"));
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("REPAIRDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_database() {
    with_env(&[("REPAIRDESK_DATABASE_URL", "postgres://localhost/repairdesk")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_attributes_values_to_their_source() {
    with_env(&[("REPAIRDESK_SERVER_PORT", "9100"), ("REPAIRDESK_LOG_LEVEL", "debug")], || {
        let output = config::run();

        assert!(output.contains("- server.port = 9100 (source: env (REPAIRDESK_SERVER_PORT))"));
        assert!(output.contains("- logging.level = debug (source: env (REPAIRDESK_LOG_LEVEL))"));
        assert!(output.contains("- batch.max_cases = 100 (source: default)"));
    });
}

fn write_case(dir: &Path, case: Value) -> std::path::PathBuf {
    let path = dir.join("case.json");
    fs::write(&path, case.to_string()).expect("write case");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "REPAIRDESK_DATABASE_URL",
        "REPAIRDESK_DATABASE_MAX_CONNECTIONS",
        "REPAIRDESK_DATABASE_TIMEOUT_SECS",
        "REPAIRDESK_SERVER_BIND_ADDRESS",
        "REPAIRDESK_SERVER_PORT",
        "REPAIRDESK_RULES_PATH",
        "REPAIRDESK_RULES_ENFORCE_OVERRIDES",
        "REPAIRDESK_BATCH_MAX_CASES",
        "REPAIRDESK_LOGGING_LEVEL",
        "REPAIRDESK_LOGGING_FORMAT",
        "REPAIRDESK_LOG_LEVEL",
        "REPAIRDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
