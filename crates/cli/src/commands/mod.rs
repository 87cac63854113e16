pub mod config;
pub mod doctor;
pub mod migrate;
pub mod recommend;
pub mod seed;

use serde::Serialize;
use tokio::runtime::Runtime;
use woundrx_core::config::{AppConfig, LoadOptions};
use woundrx_db::{connect_with_settings, migrations, DbPool};

/// `(error_class, message, exit_code)` for a failed step inside a command.
pub(crate) type StepFailure = (&'static str, String, u8);

pub(crate) struct Prepared {
    pub config: AppConfig,
    pub runtime: Runtime,
}

/// Loads configuration and a current-thread runtime, or the failure to print.
pub(crate) fn prepare(command: &str) -> Result<Prepared, CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        },
    )?;

    Ok(Prepared { config, runtime })
}

pub(crate) async fn open_migrated_pool(config: &AppConfig) -> Result<DbPool, StepFailure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Prints `payload` itself rather than the status envelope.
    pub fn json<T: Serialize>(command: &str, payload: &T, exit_code: u8) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 3),
        }
    }

    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
