use chrono::{NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::context::RecommendationContext;
use crate::domain::recommendation::{
    clamp_confidence, RecommendationRecord, DEFAULT_CONFIDENCE, UNRANKED,
};
use crate::domain::rule::{RecommendationRule, RuleId};
use crate::recommend::consolidate::consolidate_recommendations;
use crate::recommend::fallback::FallbackTable;
use crate::recommend::predicate::PredicateError;
use crate::recommend::reasoning::{render_reasoning, ReasoningError, ReasoningVariables};
use crate::recommend::sizing::{calculate_suggested_size, SizeSuggestionKey};
use crate::recommend::RuleStore;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("rule {rule_id} match conditions are invalid: {source}")]
    MatchConditions { rule_id: RuleId, source: PredicateError },
    #[error("rule {rule_id} contraindication conditions are invalid: {source}")]
    Contraindications { rule_id: RuleId, source: PredicateError },
    #[error("rule {rule_id} reasoning for {q_code} failed: {source}")]
    Reasoning { rule_id: RuleId, q_code: String, source: ReasoningError },
}

impl EvaluationError {
    pub fn rule_id(&self) -> RuleId {
        match self {
            Self::MatchConditions { rule_id, .. }
            | Self::Contraindications { rule_id, .. }
            | Self::Reasoning { rule_id, .. } => *rule_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuleOutcome {
    NotMatched,
    Contraindicated,
    Matched(Vec<RecommendationRecord>),
}

pub struct RuleEvaluator<S> {
    store: S,
    fallback: FallbackTable,
}

impl<S> RuleEvaluator<S> {
    pub fn new(store: S, fallback: FallbackTable) -> Self {
        Self { store, fallback }
    }

    pub fn with_default_fallback(store: S) -> Self {
        Self::new(store, FallbackTable::default())
    }

    pub fn fallback_table(&self) -> &FallbackTable {
        &self.fallback
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> RuleEvaluator<S>
where
    S: RuleStore,
{
    pub async fn evaluate_rules(&self, context: &RecommendationContext) -> Vec<RecommendationRecord> {
        self.evaluate_rules_on(context, Utc::now().date_naive()).await
    }

    /// Never fails; every failure short of a per-rule error ends in the fallback list.
    pub async fn evaluate_rules_on(
        &self,
        context: &RecommendationContext,
        as_of: NaiveDate,
    ) -> Vec<RecommendationRecord> {
        let correlation_id = context.correlation_id();
        let wound_type = &context.wound_type;

        let facts = match context.to_fact_document() {
            Ok(facts) => facts,
            Err(error) => {
                warn!(
                    event_name = "recommendation.rules.fallback",
                    correlation_id = %correlation_id,
                    wound_type = %wound_type,
                    reason = "context_unreadable",
                    error = %error,
                    "context could not be evaluated, using fallback recommendations"
                );
                return self.fallback.expand(context);
            }
        };

        let rules = match self.store.applicable_rules(wound_type, as_of).await {
            Ok(rules) => rules,
            Err(error) => {
                warn!(
                    event_name = "recommendation.rules.fallback",
                    correlation_id = %correlation_id,
                    wound_type = %wound_type,
                    reason = "store_error",
                    error = %error,
                    "rule store failed, using fallback recommendations"
                );
                return self.fallback.expand(context);
            }
        };

        if rules.is_empty() {
            warn!(
                event_name = "recommendation.rules.fallback",
                correlation_id = %correlation_id,
                wound_type = %wound_type,
                reason = "no_applicable_rules",
                "no applicable rules, using fallback recommendations"
            );
            return self.fallback.expand(context);
        }

        let mut accumulated = Vec::new();
        for rule in &rules {
            match evaluate_rule(rule, &facts, context) {
                Ok(RuleOutcome::Matched(records)) => {
                    debug!(
                        event_name = "recommendation.rule.matched",
                        correlation_id = %correlation_id,
                        rule_id = %rule.id,
                        products = records.len(),
                        "rule matched"
                    );
                    accumulated.extend(records);
                }
                Ok(RuleOutcome::Contraindicated) => {
                    info!(
                        event_name = "recommendation.rule.contraindicated",
                        correlation_id = %correlation_id,
                        rule_id = %rule.id,
                        rule_name = %rule.name,
                        "rule excluded due to contraindications"
                    );
                }
                Ok(RuleOutcome::NotMatched) => {}
                Err(error) => {
                    warn!(
                        event_name = "recommendation.rule.failed",
                        correlation_id = %correlation_id,
                        rule_id = %error.rule_id(),
                        error = %error,
                        "rule evaluation failed, skipping rule"
                    );
                }
            }
        }

        if accumulated.is_empty() {
            warn!(
                event_name = "recommendation.rules.fallback",
                correlation_id = %correlation_id,
                wound_type = %wound_type,
                reason = "no_rule_contributed",
                evaluated_rules = rules.len(),
                "no rule produced recommendations, using fallback recommendations"
            );
            return self.fallback.expand(context);
        }

        let consolidated = consolidate_recommendations(accumulated);
        info!(
            event_name = "recommendation.rules.evaluated",
            correlation_id = %correlation_id,
            wound_type = %wound_type,
            evaluated_rules = rules.len(),
            recommendations = consolidated.len(),
            "rule evaluation complete"
        );
        consolidated
    }
}

/// Match, contraindication check and product expansion for one rule.
pub fn evaluate_rule(
    rule: &RecommendationRule,
    facts: &Value,
    context: &RecommendationContext,
) -> Result<RuleOutcome, EvaluationError> {
    if let Some(conditions) = &rule.match_conditions {
        let matched = conditions
            .evaluate(facts)
            .map_err(|source| EvaluationError::MatchConditions { rule_id: rule.id, source })?;
        if !matched {
            return Ok(RuleOutcome::NotMatched);
        }
    }

    if let Some(conditions) = &rule.contraindication_conditions {
        let excluded = conditions
            .evaluate(facts)
            .map_err(|source| EvaluationError::Contraindications { rule_id: rule.id, source })?;
        if excluded {
            return Ok(RuleOutcome::Contraindicated);
        }
    }

    let size_key = SizeSuggestionKey::resolve(rule.size_suggestion_key.as_deref());
    let suggested_size_cm2 = calculate_suggested_size(size_key, &context.wound_characteristics);

    let mut records = Vec::with_capacity(rule.recommended_products.len());
    for product in &rule.recommended_products {
        let q_code = product.q_code.trim();
        if q_code.is_empty() {
            continue;
        }

        let variables = ReasoningVariables {
            q_code,
            rule_name: &rule.name,
            suggested_size_cm2,
            context,
            facts,
        };
        let reasoning = render_reasoning(rule.reasoning_template_for(q_code), &variables)
            .map_err(|source| EvaluationError::Reasoning {
                rule_id: rule.id,
                q_code: q_code.to_string(),
                source,
            })?;

        records.push(RecommendationRecord {
            q_code: q_code.to_string(),
            rank: product.rank.unwrap_or(UNRANKED),
            rule_id: Some(rule.id),
            rule_name: Some(rule.name.clone()),
            confidence_score: clamp_confidence(product.confidence.unwrap_or(DEFAULT_CONFIDENCE)),
            reasoning,
            suggested_size_cm2,
            key_benefits: product.key_benefits.clone(),
            clinical_evidence: rule.clinical_evidence.clone(),
            contraindications: rule.contraindications.clone(),
            ai_insight: None,
        });
    }

    Ok(RuleOutcome::Matched(records))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::{evaluate_rule, RuleEvaluator, RuleOutcome};
    use crate::domain::context::{RecommendationContext, WoundCharacteristics, WoundType};
    use crate::domain::rule::{RecommendationRule, RecommendedProduct, RuleId};
    use crate::recommend::predicate::Condition;
    use crate::recommend::{RuleStore, RuleStoreError, FALLBACK_RULE_NAME};

    struct StaticStore(Vec<RecommendationRule>);

    #[async_trait]
    impl RuleStore for StaticStore {
        async fn applicable_rules(
            &self,
            wound_type: &WoundType,
            as_of: NaiveDate,
        ) -> Result<Vec<RecommendationRule>, RuleStoreError> {
            let mut rules: Vec<RecommendationRule> = self
                .0
                .iter()
                .filter(|rule| rule.applies_to(wound_type, as_of))
                .cloned()
                .collect();
            rules.sort_by_key(|rule| (rule.priority, rule.id));
            Ok(rules)
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl RuleStore for BrokenStore {
        async fn applicable_rules(
            &self,
            _wound_type: &WoundType,
            _as_of: NaiveDate,
        ) -> Result<Vec<RecommendationRule>, RuleStoreError> {
            Err(RuleStoreError::Unavailable("database is locked".to_string()))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date")
    }

    fn dfu_context() -> RecommendationContext {
        RecommendationContext::new(WoundType::Dfu)
            .with_product_request_id("req-1")
            .with_characteristics(WoundCharacteristics::default().with_dimensions(4.0, 4.0))
    }

    fn dfu_rule(id: i64) -> RecommendationRule {
        RecommendationRule::new(RuleId(id), format!("dfu-{id}"))
            .for_wound_types(vec![WoundType::Dfu])
            .with_size_suggestion("MATCH_WOUND_AREA")
            .recommend(RecommendedProduct::new("Q4158").with_rank(1).with_confidence(0.9))
    }

    #[tokio::test]
    async fn single_matching_rule_produces_its_product() {
        let evaluator = RuleEvaluator::with_default_fallback(StaticStore(vec![dfu_rule(7)]));

        let records = evaluator.evaluate_rules_on(&dfu_context(), today()).await;

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.q_code, "Q4158");
        assert_eq!(record.rank, 1);
        assert_eq!(record.confidence_score, 0.9);
        assert_eq!(record.suggested_size_cm2, 16.0);
        assert_eq!(record.rule_id, Some(RuleId(7)));
    }

    #[tokio::test]
    async fn no_rules_returns_fallback_for_wound_type() {
        let evaluator = RuleEvaluator::with_default_fallback(StaticStore(Vec::new()));
        let context = RecommendationContext::new(WoundType::Vlu);

        let records = evaluator.evaluate_rules_on(&context, today()).await;

        let summary: Vec<(&str, u32, f64, f64)> = records
            .iter()
            .map(|record| {
                (record.q_code.as_str(), record.rank, record.confidence_score, record.suggested_size_cm2)
            })
            .collect();
        assert_eq!(summary, vec![("Q4158", 1, 0.6, 4.0), ("Q4145", 2, 0.5, 4.0)]);
        assert!(records.iter().all(|record| record.rule_id.is_none()));
    }

    #[tokio::test]
    async fn store_failure_degrades_to_fallback() {
        let evaluator = RuleEvaluator::with_default_fallback(BrokenStore);

        let records = evaluator.evaluate_rules_on(&dfu_context(), today()).await;

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.rule_name.as_deref() == Some(FALLBACK_RULE_NAME)));
    }

    #[tokio::test]
    async fn contraindicated_rule_contributes_nothing() {
        let contraindicated = dfu_rule(1)
            .unless(Condition::equals("patient_factors.active_infection", true))
            .recommend(RecommendedProduct::new("Q4186").with_rank(2));
        let clean = RecommendationRule::new(RuleId(2), "general")
            .with_priority(200)
            .recommend(RecommendedProduct::new("Q4161").with_rank(1).with_confidence(0.7));
        let evaluator = RuleEvaluator::with_default_fallback(StaticStore(vec![contraindicated, clean]));
        let context = dfu_context().with_patient_factor("active_infection", true);

        let records = evaluator.evaluate_rules_on(&context, today()).await;

        let codes: Vec<&str> = records.iter().map(|record| record.q_code.as_str()).collect();
        assert_eq!(codes, vec!["Q4161"]);
    }

    #[tokio::test]
    async fn broken_rule_does_not_stop_later_rules() {
        let broken = RecommendationRule::new(RuleId(1), "broken")
            .with_priority(1)
            .when(Condition::greater_than("payer_context.payer_name", 3.0))
            .recommend(RecommendedProduct::new("Q4145").with_rank(1));
        let clean = dfu_rule(2).with_priority(2);
        let evaluator = RuleEvaluator::with_default_fallback(StaticStore(vec![broken, clean]));
        let context = dfu_context().with_payer_attribute("payer_name", "Medicare");

        let records = evaluator.evaluate_rules_on(&context, today()).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rule_id, Some(RuleId(2)));
    }

    #[tokio::test]
    async fn rules_that_never_match_fall_back() {
        let rule = dfu_rule(3).when(Condition::greater_than("wound_characteristics.area_cm2", 50.0));
        let evaluator = RuleEvaluator::with_default_fallback(StaticStore(vec![rule]));

        let records = evaluator.evaluate_rules_on(&dfu_context(), today()).await;

        assert!(records.iter().all(|record| record.rule_id.is_none()));
        assert_eq!(records[0].q_code, "Q4158");
    }

    #[tokio::test]
    async fn results_are_deterministic_bounded_and_unique() {
        let mut rules = Vec::new();
        for id in 1..=4 {
            let mut rule = RecommendationRule::new(RuleId(id), format!("rule-{id}")).with_priority(id as i32);
            for offset in 0..4 {
                let code = format!("Q41{:02}", id + offset);
                rule = rule.recommend(
                    RecommendedProduct::new(code)
                        .with_rank((offset + 1) as u32)
                        .with_confidence(0.5 + id as f64 / 10.0),
                );
            }
            rules.push(rule);
        }
        let evaluator = RuleEvaluator::with_default_fallback(StaticStore(rules));

        let first = evaluator.evaluate_rules_on(&dfu_context(), today()).await;
        let second = evaluator.evaluate_rules_on(&dfu_context(), today()).await;

        assert_eq!(first, second);
        assert!(first.len() <= 6);
        let mut codes: Vec<&str> = first.iter().map(|record| record.q_code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), first.len());
    }

    #[test]
    fn expansion_applies_defaults_and_skips_blank_codes() {
        let rule = RecommendationRule::new(RuleId(9), "defaults")
            .with_reasoning_template("default", "{{ q_code }} via {{ rule_name }}")
            .with_clinical_evidence("RCT 2019")
            .with_contraindication("Known collagen sensitivity")
            .recommend(RecommendedProduct::new("  "))
            .recommend(RecommendedProduct::new("Q4145").with_benefit("Moisture balance"));
        let context = dfu_context();
        let facts = context.to_fact_document().expect("facts");

        let outcome = evaluate_rule(&rule, &facts, &context).expect("rule evaluates");

        let RuleOutcome::Matched(records) = outcome else {
            panic!("rule should match");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rank, 999);
        assert_eq!(records[0].confidence_score, 0.8);
        assert_eq!(records[0].reasoning, "Q4145 via defaults");
        assert_eq!(records[0].clinical_evidence.as_deref(), Some("RCT 2019"));
        assert_eq!(records[0].key_benefits, vec!["Moisture balance"]);
    }
}
