//! Rule-based wound-care product recommendation.
//!
//! The evaluator selects the rules that apply to a wound, expands every matching rule
//! into per-product records and consolidates them into a short ranked list. Anything
//! that goes wrong on the way degrades to the fallback table rather than an error.

pub mod catalog;
pub mod consolidate;
pub mod evaluator;
pub mod fallback;
pub mod format;
pub mod insights;
pub mod predicate;
pub mod reasoning;
pub mod sizing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::context::{RecommendationContext, WoundType};
use crate::domain::recommendation::{ProductInsight, RecommendationRecord};
use crate::domain::rule::RecommendationRule;

pub use consolidate::consolidate_recommendations;
pub use evaluator::{EvaluationError, RuleEvaluator, RuleOutcome};
pub use fallback::{FallbackEntry, FallbackTable};
pub use predicate::{Condition, Operator, PredicateError};
pub use sizing::{calculate_suggested_size, SizeSuggestionKey};

/// Upper bound on the consolidated list length.
pub const MAX_RECOMMENDATIONS: usize = 6;

pub const FALLBACK_RULE_NAME: &str = "Fallback Recommendation";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleStoreError {
    #[error("rule store unavailable: {0}")]
    Unavailable(String),
    #[error("stored rule could not be decoded: {0}")]
    Decode(String),
}

/// Source of persisted recommendation rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Rules that are active, effective on `as_of` and scoped to `wound_type`,
    /// ordered by priority ascending then id.
    async fn applicable_rules(
        &self,
        wound_type: &WoundType,
        as_of: NaiveDate,
    ) -> Result<Vec<RecommendationRule>, RuleStoreError>;
}

#[async_trait]
impl<S> RuleStore for Arc<S>
where
    S: RuleStore + ?Sized,
{
    async fn applicable_rules(
        &self,
        wound_type: &WoundType,
        as_of: NaiveDate,
    ) -> Result<Vec<RecommendationRule>, RuleStoreError> {
        (**self).applicable_rules(wound_type, as_of).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EnhancementError {
    #[error("enhancement timed out after {0:?}")]
    Timeout(Duration),
    #[error("enhancement transport failed: {0}")]
    Transport(String),
    #[error("enhancement endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("enhancement response could not be decoded: {0}")]
    Decode(String),
}

/// Optional second opinion on a rule-based list.
#[async_trait]
pub trait RecommendationEnhancer: Send + Sync {
    async fn enhance(
        &self,
        context: &RecommendationContext,
        records: &[RecommendationRecord],
    ) -> Result<Vec<ProductInsight>, EnhancementError>;
}
