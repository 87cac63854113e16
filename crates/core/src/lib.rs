pub mod config;
pub mod domain;
pub mod errors;
pub mod recommend;
pub mod service;

pub use domain::context::{ContextError, RecommendationContext, WoundCharacteristics, WoundType};
pub use domain::product::WoundProduct;
pub use domain::recommendation::{AiInsight, ProductInsight, RecommendationRecord};
pub use domain::rule::{RecommendationRule, RecommendedProduct, RuleId, WoundScope};
pub use errors::{DomainError, InterfaceError};
pub use recommend::catalog::Catalog;
pub use recommend::format::{FormattedRecommendation, ProductPricing, RecommendationFormatter};
pub use recommend::{
    Condition, EnhancementError, FallbackTable, RecommendationEnhancer, RuleEvaluator, RuleStore,
    RuleStoreError,
};
pub use service::{RecommendationRequest, RecommendationResponse, RecommendationService};
