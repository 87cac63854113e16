use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use woundrx_agent::HttpRecommendationEnhancer;
use woundrx_core::domain::context::RecommendationContext;
use woundrx_core::recommend::evaluator::RuleEvaluator;
use woundrx_core::recommend::format::RecommendationFormatter;
use woundrx_core::service::{RecommendationRequest, RecommendationService};
use woundrx_db::repositories::{load_catalog, SqlProductRepository, SqlRuleRepository};

use crate::commands::{open_migrated_pool, prepare, CommandResult, StepFailure};

#[derive(Debug, Clone)]
pub struct RecommendArgs {
    pub context_path: PathBuf,
    pub role: Option<String>,
    pub show_pricing: bool,
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let context = match read_context(&args) {
        Ok(context) => context,
        Err(error) => {
            return CommandResult::failure("recommend", "invalid_input", format!("{error:#}"), 7);
        }
    };

    let prepared = match prepare("recommend") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = prepared.runtime.block_on(async {
        let pool = open_migrated_pool(&prepared.config).await?;
        let catalog = load_catalog(&SqlProductRepository::new(pool.clone()))
            .await
            .map_err(|error| ("catalog_load", error.to_string(), 4u8))?;

        let mut service = RecommendationService::new(
            RuleEvaluator::with_default_fallback(SqlRuleRepository::new(pool.clone())),
            RecommendationFormatter::new(catalog),
        );
        let enhancer = HttpRecommendationEnhancer::from_config(&prepared.config.ai)
            .map_err(|error| ("ai_client_init", error.to_string(), 3u8))?;
        if let Some(enhancer) = enhancer {
            service = service.with_enhancer(Arc::new(enhancer), prepared.config.ai.timeout());
        }

        let response = service.recommend(&context).await;
        pool.close().await;
        Ok::<_, StepFailure>(response)
    });

    match result {
        Ok(response) => {
            let exit_code = if response.success { 0 } else { 7 };
            CommandResult::json("recommend", &response, exit_code)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

fn read_context(args: &RecommendArgs) -> Result<RecommendationContext> {
    let mut context = parse_context_file(&args.context_path)?;
    if let Some(role) = &args.role {
        context.user_role = Some(role.clone());
    }
    if args.show_pricing {
        context.show_pricing = true;
    }
    Ok(context)
}

/// Accepts either the HTTP request envelope or a bare context document.
fn parse_context_file(path: &Path) -> Result<RecommendationContext> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read context file `{}`", path.display()))?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("context file `{}` is not valid JSON", path.display()))?;

    if document.get("context").is_some() {
        let request: RecommendationRequest = serde_json::from_value(document)
            .context("request envelope does not match the expected shape")?;
        Ok(request.into_context())
    } else {
        serde_json::from_value(document).context("context document does not match the expected shape")
    }
}
