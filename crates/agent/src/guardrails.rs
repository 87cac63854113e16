use woundrx_core::domain::recommendation::ProductInsight;

/// Bounds applied to AI insights before they are merged into rule-based records.
#[derive(Clone, Debug, PartialEq)]
pub struct InsightGuardrails {
    pub max_confidence_adjustment: f64,
    pub drop_placeholder_insights: bool,
}

impl Default for InsightGuardrails {
    fn default() -> Self {
        Self { max_confidence_adjustment: 0.3, drop_placeholder_insights: true }
    }
}

const PLACEHOLDER_MARKER: &str = "temporarily unavailable";

impl InsightGuardrails {
    pub fn apply(&self, insights: Vec<ProductInsight>) -> Vec<ProductInsight> {
        insights.into_iter().filter_map(|insight| self.apply_one(insight)).collect()
    }

    fn apply_one(&self, mut product: ProductInsight) -> Option<ProductInsight> {
        if product.q_code.trim().is_empty() {
            return None;
        }
        if self.drop_placeholder_insights && is_placeholder(&product) {
            return None;
        }

        let limit = self.max_confidence_adjustment.abs();
        let insight = &mut product.insight;
        insight.confidence_adjustment = if insight.confidence_adjustment.is_finite() {
            insight.confidence_adjustment.clamp(-limit, limit)
        } else {
            0.0
        };
        insight.size_recommendation_cm2 =
            insight.size_recommendation_cm2.filter(|size| size.is_finite() && *size > 0.0);

        let own_code = product.q_code.clone();
        product.insight.alternative_products.retain(|alternative| {
            let alternative = alternative.trim();
            !alternative.is_empty() && !alternative.eq_ignore_ascii_case(&own_code)
        });

        Some(product)
    }
}

fn is_placeholder(product: &ProductInsight) -> bool {
    product
        .insight
        .reasoning
        .as_deref()
        .is_some_and(|reasoning| reasoning.to_ascii_lowercase().contains(PLACEHOLDER_MARKER))
}
