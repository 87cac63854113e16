use crate::domain::recommendation::{clamp_confidence, ProductInsight, RecommendationRecord};

/// Attach AI insights to the rule-based list.
///
/// Order and membership of the list never change: records without a matching insight
/// pass through untouched and insights for Q-codes not on the list are ignored.
pub fn merge_ai_insights(
    records: Vec<RecommendationRecord>,
    insights: &[ProductInsight],
) -> Vec<RecommendationRecord> {
    records
        .into_iter()
        .map(|mut record| {
            let Some(found) = insights
                .iter()
                .find(|candidate| candidate.q_code.trim().eq_ignore_ascii_case(&record.q_code))
            else {
                return record;
            };

            let adjustment = Some(found.insight.confidence_adjustment)
                .filter(|adjustment| adjustment.is_finite())
                .unwrap_or(0.0);
            record.confidence_score = clamp_confidence(record.confidence_score + adjustment);
            record.ai_insight = Some(found.insight.clone());
            record
        })
        .collect()
}

pub fn merged_count(records: &[RecommendationRecord]) -> usize {
    records.iter().filter(|record| record.ai_insight.is_some()).count()
}
