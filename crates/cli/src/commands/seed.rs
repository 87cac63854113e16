use crate::commands::{open_migrated_pool, prepare, CommandResult, StepFailure};
use woundrx_db::{SeedResult, WoundCareSeedDataset};

pub fn run() -> CommandResult {
    let prepared = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = prepared.runtime.block_on(async {
        let pool = open_migrated_pool(&prepared.config).await?;

        let seed_result = WoundCareSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = WoundCareSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, StepFailure> = if verification.all_present {
            Ok(seed_result)
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", success_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn success_message(seeded: &SeedResult) -> String {
    let products = WoundCareSeedDataset::products()
        .into_iter()
        .map(|product| format!("  - {}: {} ({})", product.q_code, product.name, product.manufacturer))
        .collect::<Vec<_>>();
    format!(
        "wound care seed dataset loaded: {} products, {} rules\n{}",
        seeded.products_seeded,
        seeded.rules_seeded,
        products.join("\n")
    )
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
