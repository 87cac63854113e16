use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::recommendation::RecommendationRecord;
use crate::recommend::MAX_RECOMMENDATIONS;

/// Collapse records to one per Q-code, order them and cap the list.
pub fn consolidate_recommendations(records: Vec<RecommendationRecord>) -> Vec<RecommendationRecord> {
    consolidate_with_limit(records, MAX_RECOMMENDATIONS)
}

pub fn consolidate_with_limit(
    records: Vec<RecommendationRecord>,
    limit: usize,
) -> Vec<RecommendationRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<RecommendationRecord> = Vec::new();

    for record in records {
        match positions.get(&record.q_code) {
            Some(&index) => {
                // Equal confidence keeps the earlier, higher-priority record.
                if record.confidence_score > unique[index].confidence_score {
                    unique[index] = record;
                }
            }
            None => {
                positions.insert(record.q_code.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique.sort_by(compare_for_ranking);
    unique.truncate(limit);
    unique
}

/// Rank ascending, then confidence descending.
pub fn compare_for_ranking(left: &RecommendationRecord, right: &RecommendationRecord) -> Ordering {
    left.rank.cmp(&right.rank).then_with(|| {
        right.confidence_score.partial_cmp(&left.confidence_score).unwrap_or(Ordering::Equal)
    })
}
