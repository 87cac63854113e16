use serde::Serialize;
use woundrx_agent::HttpRecommendationEnhancer;
use woundrx_core::config::{AppConfig, LoadOptions};
use woundrx_db::repositories::{load_catalog, SqlProductRepository};
use woundrx_db::{connect_with_settings, migrations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_ai_readiness(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["ai_enhancement", "database_connectivity", "product_catalog"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_ai_readiness(config: &AppConfig) -> DoctorCheck {
    if !config.ai.enabled {
        return DoctorCheck::new(
            "ai_enhancement",
            CheckStatus::Skipped,
            "AI enhancement disabled; recommendations are rule-based only",
        );
    }

    match HttpRecommendationEnhancer::from_config(&config.ai) {
        Ok(Some(enhancer)) => DoctorCheck::new(
            "ai_enhancement",
            CheckStatus::Pass,
            format!(
                "client configured for `{}` with {}s timeout",
                enhancer.endpoint(),
                config.ai.timeout_secs
            ),
        ),
        Ok(None) => DoctorCheck::new(
            "ai_enhancement",
            CheckStatus::Fail,
            "AI enhancement enabled without an endpoint",
        ),
        Err(error) => DoctorCheck::new("ai_enhancement", CheckStatus::Fail, error.to_string()),
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            )];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::new(
                        "database_connectivity",
                        CheckStatus::Fail,
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::new(
                        "product_catalog",
                        CheckStatus::Skipped,
                        "skipped because the database is unreachable",
                    ),
                ];
            }
        };

        let mut checks = vec![DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`", config.database.url),
        )];

        let catalog_check = match migrations::applied_count(&pool).await {
            Err(_) => DoctorCheck::new(
                "product_catalog",
                CheckStatus::Fail,
                "schema is not migrated; run `woundrx migrate`",
            ),
            Ok(_) => match load_catalog(&SqlProductRepository::new(pool.clone())).await {
                Ok(catalog) if catalog.is_empty() => DoctorCheck::new(
                    "product_catalog",
                    CheckStatus::Fail,
                    "no active wound products; run `woundrx seed` or import a catalog",
                ),
                Ok(catalog) => DoctorCheck::new(
                    "product_catalog",
                    CheckStatus::Pass,
                    format!("{} active wound products", catalog.len()),
                ),
                Err(error) => {
                    DoctorCheck::new("product_catalog", CheckStatus::Fail, error.to_string())
                }
            },
        };
        checks.push(catalog_check);

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
