use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::context::{RecommendationContext, WoundType};
use crate::domain::recommendation::{clamp_confidence, RecommendationRecord};
use crate::recommend::consolidate::consolidate_recommendations;
use crate::recommend::sizing::{calculate_suggested_size, SizeSuggestionKey};
use crate::recommend::FALLBACK_RULE_NAME;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub q_code: String,
    pub rank: u32,
    pub confidence: f64,
}

impl FallbackEntry {
    pub fn new(q_code: impl Into<String>, rank: u32, confidence: f64) -> Self {
        Self { q_code: q_code.into(), rank, confidence }
    }
}

/// Fixed per-wound-type suggestions used when no rule produces anything.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackTable {
    entries: HashMap<WoundType, Vec<FallbackEntry>>,
    default_wound_type: WoundType,
}

impl FallbackTable {
    pub fn new(entries: HashMap<WoundType, Vec<FallbackEntry>>, default_wound_type: WoundType) -> Self {
        Self { entries, default_wound_type }
    }

    pub fn entries_for(&self, wound_type: &WoundType) -> &[FallbackEntry] {
        self.entries
            .get(wound_type)
            .or_else(|| self.entries.get(&self.default_wound_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn covers(&self, wound_type: &WoundType) -> bool {
        self.entries.contains_key(wound_type)
    }

    pub fn expand(&self, context: &RecommendationContext) -> Vec<RecommendationRecord> {
        let wound_type = &context.wound_type;
        if !self.covers(wound_type) {
            warn!(
                event_name = "recommendation.fallback.unknown_wound_type",
                correlation_id = %context.correlation_id(),
                wound_type = %wound_type,
                default_wound_type = %self.default_wound_type,
                "no fallback list for wound type, using default list"
            );
        }

        let size = calculate_suggested_size(
            SizeSuggestionKey::MatchWoundArea,
            &context.wound_characteristics,
        );
        let records = self
            .entries_for(wound_type)
            .iter()
            .map(|entry| RecommendationRecord {
                q_code: entry.q_code.clone(),
                rank: entry.rank,
                rule_id: None,
                rule_name: Some(FALLBACK_RULE_NAME.to_string()),
                confidence_score: clamp_confidence(entry.confidence),
                reasoning: format!(
                    "Standard recommendation for {} ({}) wounds",
                    wound_type.label(),
                    wound_type.code()
                ),
                suggested_size_cm2: size,
                key_benefits: vec![
                    "Standard care option".to_string(),
                    "Clinically appropriate".to_string(),
                ],
                clinical_evidence: None,
                contraindications: Vec::new(),
                ai_insight: None,
            })
            .collect();

        consolidate_recommendations(records)
    }
}

impl Default for FallbackTable {
    fn default() -> Self {
        let entries = HashMap::from([
            (
                WoundType::Dfu,
                vec![
                    FallbackEntry::new("Q4158", 1, 0.7),
                    FallbackEntry::new("Q4161", 2, 0.6),
                    FallbackEntry::new("Q4145", 3, 0.5),
                ],
            ),
            (
                WoundType::Vlu,
                vec![FallbackEntry::new("Q4158", 1, 0.6), FallbackEntry::new("Q4145", 2, 0.5)],
            ),
            (
                WoundType::Pu,
                vec![FallbackEntry::new("Q4145", 1, 0.6), FallbackEntry::new("Q4158", 2, 0.5)],
            ),
            (
                WoundType::Tw,
                vec![FallbackEntry::new("Q4161", 1, 0.6), FallbackEntry::new("Q4145", 2, 0.5)],
            ),
            (
                WoundType::Au,
                vec![FallbackEntry::new("Q4158", 1, 0.5), FallbackEntry::new("Q4161", 2, 0.4)],
            ),
        ]);
        Self::new(entries, WoundType::Dfu)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{FallbackEntry, FallbackTable};
    use crate::domain::context::{RecommendationContext, WoundCharacteristics, WoundType};
    use crate::recommend::FALLBACK_RULE_NAME;

    fn summary(context: &RecommendationContext, table: &FallbackTable) -> Vec<(String, u32, f64)> {
        table
            .expand(context)
            .into_iter()
            .map(|record| (record.q_code, record.rank, record.confidence_score))
            .collect()
    }

    #[test]
    fn vlu_fallback_matches_default_table() {
        let context = RecommendationContext::new(WoundType::Vlu);
        let records = FallbackTable::default().expand(&context);

        assert_eq!(
            summary(&context, &FallbackTable::default()),
            vec![("Q4158".to_string(), 1, 0.6), ("Q4145".to_string(), 2, 0.5)]
        );
        for record in &records {
            assert_eq!(record.rule_id, None);
            assert_eq!(record.rule_name.as_deref(), Some(FALLBACK_RULE_NAME));
            assert_eq!(record.suggested_size_cm2, 4.0);
            assert_eq!(record.key_benefits, vec!["Standard care option", "Clinically appropriate"]);
            assert!(record.reasoning.contains("VLU"));
        }
    }

    #[test]
    fn unknown_wound_type_uses_dfu_list() {
        let context = RecommendationContext::new(WoundType::parse("burn"));
        let codes: Vec<String> =
            FallbackTable::default().expand(&context).into_iter().map(|record| record.q_code).collect();
        assert_eq!(codes, vec!["Q4158", "Q4161", "Q4145"]);
    }

    #[test]
    fn fallback_size_follows_measured_area() {
        let context = RecommendationContext::new(WoundType::Pu)
            .with_characteristics(WoundCharacteristics::default().with_dimensions(2.0, 3.0));
        let records = FallbackTable::default().expand(&context);
        assert!(records.iter().all(|record| record.suggested_size_cm2 == 6.0));
    }

    #[test]
    fn injected_table_replaces_defaults() {
        let table = FallbackTable::new(
            HashMap::from([(WoundType::Tw, vec![FallbackEntry::new("Q4186", 1, 1.3)])]),
            WoundType::Tw,
        );
        let context = RecommendationContext::new(WoundType::Au);
        assert_eq!(summary(&context, &table), vec![("Q4186".to_string(), 1, 1.0)]);
    }
}
