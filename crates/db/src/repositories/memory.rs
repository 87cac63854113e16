use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use woundrx_core::domain::context::WoundType;
use woundrx_core::domain::product::WoundProduct;
use woundrx_core::domain::rule::{RecommendationRule, RuleId};
use woundrx_core::recommend::{RuleStore, RuleStoreError};

use super::{ProductRepository, RepositoryError, RuleRepository};

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<HashMap<i64, RecommendationRule>>,
}

impl InMemoryRuleRepository {
    pub fn with_rules(rules: impl IntoIterator<Item = RecommendationRule>) -> Self {
        let rules = rules.into_iter().map(|rule| (rule.id.0, rule)).collect();
        Self { rules: RwLock::new(rules) }
    }
}

fn sorted(mut rules: Vec<RecommendationRule>) -> Vec<RecommendationRule> {
    rules.sort_by(|left, right| left.priority.cmp(&right.priority).then(left.id.cmp(&right.id)));
    rules
}

#[async_trait::async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn find_by_id(&self, id: RuleId) -> Result<Option<RecommendationRule>, RepositoryError> {
        let rules = self.rules.read().await;
        Ok(rules.get(&id.0).cloned())
    }

    async fn save(&self, rule: RecommendationRule) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().await;
        rules.insert(rule.id.0, rule);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<RecommendationRule>, RepositoryError> {
        let rules = self.rules.read().await;
        Ok(sorted(rules.values().cloned().collect()))
    }
}

#[async_trait::async_trait]
impl RuleStore for InMemoryRuleRepository {
    async fn applicable_rules(
        &self,
        wound_type: &WoundType,
        as_of: NaiveDate,
    ) -> Result<Vec<RecommendationRule>, RuleStoreError> {
        let rules = self.rules.read().await;
        Ok(sorted(rules.values().filter(|rule| rule.applies_to(wound_type, as_of)).cloned().collect()))
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, WoundProduct>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_q_code(&self, q_code: &str) -> Result<Option<WoundProduct>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&q_code.trim().to_ascii_uppercase()).cloned())
    }

    async fn save(&self, product: WoundProduct) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.q_code.trim().to_ascii_uppercase(), product);
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<WoundProduct>, RepositoryError> {
        let products = self.products.read().await;
        let mut active: Vec<WoundProduct> =
            products.values().filter(|product| product.active).cloned().collect();
        active.sort_by(|left, right| left.q_code.cmp(&right.q_code));
        Ok(active)
    }
}
