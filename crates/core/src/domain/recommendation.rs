use serde::{Deserialize, Serialize};

use crate::domain::rule::RuleId;

/// Rank assigned to product entries that carry no explicit rank.
pub const UNRANKED: u32 = 999;

/// Confidence assigned to product entries that carry no explicit confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Supplementary judgement returned by the AI enhancement endpoint for one product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiInsight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub confidence_adjustment: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_recommendation_cm2: Option<f64>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub alternative_products: Vec<String>,
}

/// Insight keyed by Q-code, as produced by an enhancer before merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInsight {
    pub q_code: String,
    #[serde(flatten)]
    pub insight: AiInsight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub q_code: String,
    pub rank: u32,
    pub rule_id: Option<RuleId>,
    pub rule_name: Option<String>,
    pub confidence_score: f64,
    pub reasoning: String,
    pub suggested_size_cm2: f64,
    #[serde(default)]
    pub key_benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_evidence: Option<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_insight: Option<AiInsight>,
}

impl RecommendationRecord {
    pub fn is_fallback(&self) -> bool {
        self.rule_id.is_none()
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
