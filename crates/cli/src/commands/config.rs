use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use woundrx_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};

struct ConfigField {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let field = |key, env_key, value: String| ConfigField { key, env_key, value };
    vec![
        field("database.url", "WOUNDRX_DATABASE_URL", config.database.url.clone()),
        field(
            "database.max_connections",
            "WOUNDRX_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            "WOUNDRX_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        field("ai.enabled", "WOUNDRX_AI_ENABLED", config.ai.enabled.to_string()),
        field(
            "ai.endpoint",
            "WOUNDRX_AI_ENDPOINT",
            config.ai.endpoint.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        field(
            "ai.api_key",
            "WOUNDRX_AI_API_KEY",
            redact_secret(config.ai.api_key.as_ref().map(|key| key.expose_secret())),
        ),
        field("ai.timeout_secs", "WOUNDRX_AI_TIMEOUT_SECS", config.ai.timeout_secs.to_string()),
        field(
            "server.bind_address",
            "WOUNDRX_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        field("server.port", "WOUNDRX_SERVER_PORT", config.server.port.to_string()),
        field(
            "server.graceful_shutdown_secs",
            "WOUNDRX_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field("logging.level", "WOUNDRX_LOGGING_LEVEL", config.logging.level.clone()),
        field("logging.format", "WOUNDRX_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&str>) -> String {
    match secret.map(str::trim) {
        None => "<unset>".to_string(),
        Some("") => "<empty>".to_string(),
        Some(value) => match value.split_once('-') {
            Some((prefix, _)) if !prefix.is_empty() => format!("{prefix}-***"),
            _ => "<redacted>".to_string(),
        },
    }
}
