use crate::commands::{open_migrated_pool, prepare, CommandResult, StepFailure};
use woundrx_db::migrations;

pub fn run() -> CommandResult {
    let prepared = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = prepared.runtime.block_on(async {
        let pool = open_migrated_pool(&prepared.config).await?;
        let applied = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<i64, StepFailure>(applied)
    });

    match result {
        Ok(applied) => CommandResult::success(
            "migrate",
            format!("applied pending migrations ({applied} recorded)"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
