//! Orchestration around the rule evaluator: validation, optional AI enhancement
//! and presentation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::context::RecommendationContext;
use crate::domain::recommendation::RecommendationRecord;
use crate::recommend::evaluator::RuleEvaluator;
use crate::recommend::format::{FormattedRecommendation, RecommendationFormatter};
use crate::recommend::insights::{merge_ai_insights, merged_count};
use crate::recommend::{EnhancementError, RecommendationEnhancer, RuleStore};

pub const DEFAULT_ENHANCEMENT_TIMEOUT: Duration = Duration::from_secs(25);
pub const FAILURE_MESSAGE: &str = "Failed to generate recommendations";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub recommendations: Vec<FormattedRecommendation>,
    pub ai_enhanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub correlation_id: String,
    pub generated_at: DateTime<Utc>,
}

/// Request body shared by the HTTP and CLI surfaces. Top-level presentation
/// fields override the ones inside `context`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub context: RecommendationContext,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub show_pricing: Option<bool>,
}

impl RecommendationRequest {
    pub fn into_context(self) -> RecommendationContext {
        let mut context = self.context;
        if let Some(role) = self.user_role {
            context.user_role = Some(role);
        }
        if let Some(show_pricing) = self.show_pricing {
            context.show_pricing = show_pricing;
        }
        context
    }
}

pub struct RecommendationService<S> {
    evaluator: RuleEvaluator<S>,
    formatter: RecommendationFormatter,
    enhancer: Option<Arc<dyn RecommendationEnhancer>>,
    enhancement_timeout: Duration,
}

impl<S> RecommendationService<S> {
    pub fn new(evaluator: RuleEvaluator<S>, formatter: RecommendationFormatter) -> Self {
        Self { evaluator, formatter, enhancer: None, enhancement_timeout: DEFAULT_ENHANCEMENT_TIMEOUT }
    }

    pub fn with_enhancer(
        mut self,
        enhancer: Arc<dyn RecommendationEnhancer>,
        timeout: Duration,
    ) -> Self {
        self.enhancer = Some(enhancer);
        self.enhancement_timeout = timeout;
        self
    }

    pub fn evaluator(&self) -> &RuleEvaluator<S> {
        &self.evaluator
    }

    pub fn has_enhancer(&self) -> bool {
        self.enhancer.is_some()
    }
}

impl<S> RecommendationService<S>
where
    S: RuleStore,
{
    pub async fn recommend(&self, context: &RecommendationContext) -> RecommendationResponse {
        let correlation_id = context.correlation_id().to_string();

        if let Err(error) = context.validate() {
            warn!(
                event_name = "recommendation.request.invalid",
                correlation_id = %correlation_id,
                error = %error,
                "invalid recommendation context, returning fallback recommendations"
            );
            let fallback = self.evaluator.fallback_table().expand(context);
            return RecommendationResponse {
                success: false,
                recommendations: self.formatter.format(&fallback, context),
                ai_enhanced: false,
                message: Some(FAILURE_MESSAGE.to_string()),
                correlation_id,
                generated_at: Utc::now(),
            };
        }

        let records = self.evaluator.evaluate_rules(context).await;
        let (records, ai_enhanced) = self.enhance(context, records).await;
        let recommendations = self.formatter.format(&records, context);

        info!(
            event_name = "recommendation.request.completed",
            correlation_id = %correlation_id,
            wound_type = %context.wound_type,
            recommendations = recommendations.len(),
            ai_enhanced,
            "recommendations generated"
        );

        RecommendationResponse {
            success: true,
            recommendations,
            ai_enhanced,
            message: None,
            correlation_id,
            generated_at: Utc::now(),
        }
    }

    async fn enhance(
        &self,
        context: &RecommendationContext,
        records: Vec<RecommendationRecord>,
    ) -> (Vec<RecommendationRecord>, bool) {
        let Some(enhancer) = &self.enhancer else {
            return (records, false);
        };
        if records.is_empty() {
            return (records, false);
        }

        let outcome =
            match tokio::time::timeout(self.enhancement_timeout, enhancer.enhance(context, &records))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(EnhancementError::Timeout(self.enhancement_timeout)),
            };

        match outcome {
            Ok(insights) => {
                let merged = merge_ai_insights(records, &insights);
                let enhanced = merged_count(&merged) > 0;
                (merged, enhanced)
            }
            Err(error) => {
                warn!(
                    event_name = "recommendation.enhancement.failed",
                    correlation_id = %context.correlation_id(),
                    error = %error,
                    "AI enhancement failed, keeping rule-based recommendations"
                );
                (records, false)
            }
        }
    }
}
