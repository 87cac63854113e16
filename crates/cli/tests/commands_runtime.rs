use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use woundrx_cli::commands::recommend::{self, RecommendArgs};
use woundrx_cli::commands::{migrate, seed};

const ENV_KEYS: &[&str] = &[
    "WOUNDRX_DATABASE_URL",
    "WOUNDRX_DATABASE_MAX_CONNECTIONS",
    "WOUNDRX_DATABASE_TIMEOUT_SECS",
    "WOUNDRX_AI_ENABLED",
    "WOUNDRX_AI_ENDPOINT",
    "WOUNDRX_AI_API_KEY",
    "WOUNDRX_AI_TIMEOUT_SECS",
    "WOUNDRX_SERVER_BIND_ADDRESS",
    "WOUNDRX_SERVER_PORT",
    "WOUNDRX_SERVER_GRACEFUL_SHUTDOWN_SECS",
    "WOUNDRX_LOGGING_LEVEL",
    "WOUNDRX_LOGGING_FORMAT",
    "WOUNDRX_LOG_LEVEL",
    "WOUNDRX_LOG_FORMAT",
];

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("WOUNDRX_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "applied pending migrations (2 recorded)");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_ai_timeout() {
    with_env(
        &[("WOUNDRX_DATABASE_URL", "sqlite::memory:"), ("WOUNDRX_AI_TIMEOUT_SECS", "0")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());
    with_env(&[("WOUNDRX_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success: {}", first.output);
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["message"], second_payload["message"]);
        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("7 products, 6 rules"));
        assert!(message.contains("  - Q4154: Biovance (CELULARITY)"));
    });
}

#[test]
fn recommend_uses_seeded_rules_and_gates_pricing_by_role() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());
    let context_path = dir.path().join("request.json");
    fs::write(
        &context_path,
        r#"{
            "context": {
                "product_request_id": "PR-CLI-1",
                "wound_type": "VLU",
                "wound_characteristics": { "area_cm2": 6.0 }
            }
        }"#,
    )
    .expect("write context");

    with_env(&[("WOUNDRX_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let clinician = recommend::run(RecommendArgs {
            context_path: context_path.clone(),
            role: Some("clinician".to_string()),
            show_pricing: true,
        });
        assert_eq!(clinician.exit_code, 0, "recommend failed: {}", clinician.output);
        let response = parse_payload(&clinician.output);
        assert_eq!(response["success"], true);
        assert_eq!(response["ai_enhanced"], false);
        assert_eq!(response["correlation_id"], "PR-CLI-1");
        assert_eq!(response["recommendations"][0]["q_code"], "Q4145");
        assert_eq!(response["recommendations"][1]["q_code"], "Q4191");
        assert!(response["recommendations"][0].get("pricing").map_or(true, Value::is_null));

        let provider = recommend::run(RecommendArgs {
            context_path: context_path.clone(),
            role: Some("provider".to_string()),
            show_pricing: true,
        });
        let response = parse_payload(&provider.output);
        assert!(response["recommendations"][0]["pricing"]["estimated_cost"].is_string()
            || response["recommendations"][0]["pricing"]["estimated_cost"].is_number());
    });
}

#[test]
fn recommend_rejects_missing_context_file() {
    with_env(&[("WOUNDRX_DATABASE_URL", "sqlite::memory:")], || {
        let result = recommend::run(RecommendArgs {
            context_path: Path::new("does-not-exist.json").to_path_buf(),
            role: None,
            show_pricing: false,
        });

        assert_eq!(result.exit_code, 7);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("woundrx.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let previous_values: Vec<(&str, Option<String>)> =
        ENV_KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in ENV_KEYS {
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
