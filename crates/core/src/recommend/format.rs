use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::context::RecommendationContext;
use crate::domain::recommendation::{AiInsight, RecommendationRecord};
use crate::domain::rule::RuleId;
use crate::recommend::catalog::Catalog;

/// Roles allowed to see MSC pricing when the caller asks for it.
pub const PRICING_ROLES: [&str; 4] = ["provider", "office_manager", "admin", "msc_rep"];

/// Confidence band for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// score >= 0.80
    High,
    /// score 0.60 - 0.79
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.80 {
            ConfidenceLevel::High
        } else if score >= 0.60 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn display_percentage(score: f64) -> String {
        format!("{:.0}% match", score * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPricing {
    pub price_per_sq_cm: Decimal,
    pub estimated_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedRecommendation {
    pub q_code: String,
    pub product_name: String,
    pub manufacturer: String,
    pub category: String,
    pub rank: u32,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub confidence_display: String,
    pub reasoning: String,
    pub suggested_size_cm2: f64,
    pub recommended_size_cm2: Option<f64>,
    pub key_benefits: Vec<String>,
    pub clinical_evidence: Option<String>,
    pub contraindications: Vec<String>,
    pub rule_id: Option<RuleId>,
    pub rule_name: Option<String>,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ProductPricing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insight: Option<AiInsight>,
}

pub fn pricing_visible(context: &RecommendationContext) -> bool {
    context.show_pricing
        && context.user_role.as_deref().is_some_and(|role| {
            let role = role.trim();
            PRICING_ROLES.iter().any(|allowed| allowed.eq_ignore_ascii_case(role))
        })
}

#[derive(Clone, Debug, Default)]
pub struct RecommendationFormatter {
    catalog: Catalog,
}

impl RecommendationFormatter {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn format(
        &self,
        records: &[RecommendationRecord],
        context: &RecommendationContext,
    ) -> Vec<FormattedRecommendation> {
        let show_pricing = pricing_visible(context);

        records
            .iter()
            .filter_map(|record| {
                let Some(product) = self.catalog.find_active(&record.q_code) else {
                    warn!(
                        event_name = "recommendation.format.unknown_product",
                        correlation_id = %context.correlation_id(),
                        q_code = %record.q_code,
                        "recommended product is not in the active catalog, dropping it"
                    );
                    return None;
                };

                let pricing = show_pricing
                    .then(|| {
                        product.total_price(record.suggested_size_cm2, false).map(|estimated_cost| {
                            ProductPricing {
                                price_per_sq_cm: product.msc_price_per_sq_cm(),
                                estimated_cost,
                            }
                        })
                    })
                    .flatten();

                Some(FormattedRecommendation {
                    q_code: product.q_code.clone(),
                    product_name: product.name.clone(),
                    manufacturer: product.manufacturer.clone(),
                    category: product.category.clone(),
                    rank: record.rank,
                    confidence_score: record.confidence_score,
                    confidence_level: ConfidenceLevel::from_score(record.confidence_score),
                    confidence_display: ConfidenceLevel::display_percentage(record.confidence_score),
                    reasoning: record.reasoning.clone(),
                    suggested_size_cm2: record.suggested_size_cm2,
                    recommended_size_cm2: product.closest_available_size(record.suggested_size_cm2),
                    key_benefits: record.key_benefits.clone(),
                    clinical_evidence: record.clinical_evidence.clone(),
                    contraindications: record.contraindications.clone(),
                    rule_id: record.rule_id,
                    rule_name: record.rule_name.clone(),
                    is_fallback: record.is_fallback(),
                    pricing,
                    ai_insight: record.ai_insight.clone(),
                })
            })
            .collect()
    }
}
