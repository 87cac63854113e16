use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use woundrx_agent::HttpRecommendationEnhancer;
use woundrx_core::config::AppConfig;
use woundrx_core::recommend::evaluator::RuleEvaluator;
use woundrx_core::recommend::format::RecommendationFormatter;
use woundrx_core::recommend::EnhancementError;
use woundrx_core::service::RecommendationService;
use woundrx_db::repositories::{load_catalog, RepositoryError, SqlProductRepository, SqlRuleRepository};
use woundrx_db::{connect_with_settings, migrations, DbPool};

pub type SharedService = Arc<RecommendationService<SqlRuleRepository>>;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: SharedService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("product catalog could not be loaded: {0}")]
    Catalog(#[source] RepositoryError),
    #[error("AI enhancement client could not be built: {0}")]
    Enhancer(#[source] EnhancementError),
}

/// Wires the recommendation service from a loaded config. The product catalog is read
/// once here; products seeded afterwards are not served until the process restarts.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let catalog = load_catalog(&SqlProductRepository::new(db_pool.clone()))
        .await
        .map_err(BootstrapError::Catalog)?;
    if catalog.is_empty() {
        warn!(
            event_name = "system.bootstrap.catalog_empty",
            correlation_id = "bootstrap",
            "no active wound products; every recommendation will be dropped until a catalog is loaded"
        );
    }

    let mut service = RecommendationService::new(
        RuleEvaluator::with_default_fallback(SqlRuleRepository::new(db_pool.clone())),
        RecommendationFormatter::new(catalog),
    );
    if let Some(enhancer) =
        HttpRecommendationEnhancer::from_config(&config.ai).map_err(BootstrapError::Enhancer)?
    {
        info!(
            event_name = "system.bootstrap.ai_enabled",
            correlation_id = "bootstrap",
            endpoint = %enhancer.endpoint(),
            timeout_secs = config.ai.timeout_secs,
            "AI enhancement enabled"
        );
        service = service.with_enhancer(Arc::new(enhancer), config.ai.timeout());
    }

    Ok(Application { config, db_pool, service: Arc::new(service) })
}
