use woundrx_core::domain::context::{RecommendationContext, WoundCharacteristics, WoundType};
use woundrx_core::recommend::evaluator::RuleEvaluator;
use woundrx_core::recommend::format::RecommendationFormatter;
use woundrx_core::service::RecommendationService;
use woundrx_db::migrations::run_pending;
use woundrx_db::repositories::{load_catalog, SqlProductRepository, SqlRuleRepository};
use woundrx_db::{connect, DbPool, WoundCareSeedDataset};

type SeedTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn seeded_pool(dir: &tempfile::TempDir) -> SeedTestResult<DbPool> {
    let url = format!("sqlite://{}", dir.path().join("woundrx.db").display());
    let pool = connect(&url).await.map_err(|error| format!("connect failed: {error}"))?;
    run_pending(&pool).await.map_err(|error| format!("migrations failed: {error}"))?;
    WoundCareSeedDataset::load(&pool).await.map_err(|error| format!("seed failed: {error}"))?;
    Ok(pool)
}

async fn service(pool: &DbPool) -> SeedTestResult<RecommendationService<SqlRuleRepository>> {
    let catalog = load_catalog(&SqlProductRepository::new(pool.clone()))
        .await
        .map_err(|error| format!("catalog failed: {error}"))?;
    Ok(RecommendationService::new(
        RuleEvaluator::with_default_fallback(SqlRuleRepository::new(pool.clone())),
        RecommendationFormatter::new(catalog),
    ))
}

fn chronic_dfu() -> RecommendationContext {
    let mut characteristics = WoundCharacteristics::default().with_area(16.0);
    characteristics.duration_weeks = Some(6);
    RecommendationContext::new(WoundType::Dfu)
        .with_product_request_id("PR-1001")
        .with_characteristics(characteristics)
}

#[tokio::test]
async fn seeded_rules_drive_dfu_recommendations() -> SeedTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = seeded_pool(&dir).await?;
    let service = service(&pool).await?;

    let response = service.recommend(&chronic_dfu()).await;

    require!(response.success);
    require_eq!(response.correlation_id.as_str(), "PR-1001");
    let codes: Vec<&str> =
        response.recommendations.iter().map(|entry| entry.q_code.as_str()).collect();
    require_eq!(codes, vec!["Q4158", "Q4193", "Q4145", "Q4238"]);
    require!(
        response.recommendations.iter().all(|entry| !entry.is_fallback),
        "seeded rules should match before the fallback table"
    );
    require!(response.recommendations.iter().all(|entry| entry.pricing.is_none()));
    Ok(())
}

#[tokio::test]
async fn contraindicated_patient_skips_first_line_rule() -> SeedTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = seeded_pool(&dir).await?;
    let service = service(&pool).await?;

    let context = chronic_dfu().with_patient_factor("fish_allergy", true);
    let response = service.recommend(&context).await;

    let codes: Vec<&str> =
        response.recommendations.iter().map(|entry| entry.q_code.as_str()).collect();
    require_eq!(codes, vec!["Q4193", "Q4238"]);
    Ok(())
}

#[tokio::test]
async fn unmatched_wound_type_uses_fallback_with_pricing_for_provider() -> SeedTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = seeded_pool(&dir).await?;
    let service = service(&pool).await?;

    let context = RecommendationContext::new(WoundType::Tw)
        .with_characteristics(WoundCharacteristics::default().with_dimensions(2.0, 2.0))
        .with_presentation("provider", true);
    let response = service.recommend(&context).await;

    require!(response.success);
    let codes: Vec<&str> =
        response.recommendations.iter().map(|entry| entry.q_code.as_str()).collect();
    require_eq!(codes, vec!["Q4161", "Q4145"]);
    require!(response.recommendations.iter().all(|entry| entry.is_fallback));
    require!(response.recommendations.iter().all(|entry| entry.pricing.is_some()));
    Ok(())
}

#[tokio::test]
async fn migrations_and_seed_survive_reopening_the_database() -> SeedTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = seeded_pool(&dir).await?;
    pool.close().await;

    let url = format!("sqlite://{}", dir.path().join("woundrx.db").display());
    let reopened = connect(&url).await.map_err(|error| format!("reconnect failed: {error}"))?;
    run_pending(&reopened).await.map_err(|error| format!("re-run migrations failed: {error}"))?;
    let verification = WoundCareSeedDataset::verify(&reopened)
        .await
        .map_err(|error| format!("verify failed: {error}"))?;

    require!(verification.all_present, "missing seed rows: {:?}", verification.checks);
    Ok(())
}
