use async_trait::async_trait;
use thiserror::Error;

use woundrx_core::domain::product::WoundProduct;
use woundrx_core::domain::rule::{RecommendationRule, RuleId};
use woundrx_core::recommend::RuleStoreError;

pub mod memory;
pub mod product;
pub mod rule;

pub use memory::{InMemoryProductRepository, InMemoryRuleRepository};
pub use product::{load_catalog, SqlProductRepository};
pub use rule::SqlRuleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for RuleStoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn find_by_id(&self, id: RuleId) -> Result<Option<RecommendationRule>, RepositoryError>;
    async fn save(&self, rule: RecommendationRule) -> Result<(), RepositoryError>;
    /// Every stored rule, active or not, ordered by priority then id.
    async fn list_all(&self) -> Result<Vec<RecommendationRule>, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_q_code(&self, q_code: &str) -> Result<Option<WoundProduct>, RepositoryError>;
    async fn save(&self, product: WoundProduct) -> Result<(), RepositoryError>;
    async fn list_active(&self) -> Result<Vec<WoundProduct>, RepositoryError>;
}
