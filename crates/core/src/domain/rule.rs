use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::context::WoundType;
use crate::recommend::predicate::Condition;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub i64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wound types a rule may fire for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "wound_types", rename_all = "snake_case")]
pub enum WoundScope {
    #[default]
    Any,
    Only(Vec<WoundType>),
}

impl WoundScope {
    pub fn includes(&self, wound_type: &WoundType) -> bool {
        match self {
            Self::Any => true,
            Self::Only(types) => types.iter().any(|candidate| candidate == wound_type),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub q_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub key_benefits: Vec<String>,
}

impl RecommendedProduct {
    pub fn new(q_code: impl Into<String>) -> Self {
        Self { q_code: q_code.into(), rank: None, confidence: None, key_benefits: Vec::new() }
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_benefit(mut self, benefit: impl Into<String>) -> Self {
        self.key_benefits.push(benefit.into());
        self
    }
}

pub const DEFAULT_TEMPLATE_KEY: &str = "default";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scope: WoundScope,
    pub priority: i32,
    pub active: bool,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub match_conditions: Option<Condition>,
    #[serde(default)]
    pub contraindication_conditions: Option<Condition>,
    #[serde(default)]
    pub recommended_products: Vec<RecommendedProduct>,
    #[serde(default)]
    pub reasoning_templates: BTreeMap<String, String>,
    #[serde(default)]
    pub clinical_evidence: Option<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub size_suggestion_key: Option<String>,
}

impl RecommendationRule {
    pub fn new(id: RuleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            scope: WoundScope::Any,
            priority: 100,
            active: true,
            effective_date: None,
            expiration_date: None,
            match_conditions: None,
            contraindication_conditions: None,
            recommended_products: Vec::new(),
            reasoning_templates: BTreeMap::new(),
            clinical_evidence: None,
            contraindications: Vec::new(),
            size_suggestion_key: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn for_wound_types(mut self, wound_types: Vec<WoundType>) -> Self {
        self.scope = WoundScope::Only(wound_types);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn effective_between(mut self, from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.effective_date = from;
        self.expiration_date = until;
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.match_conditions = Some(condition);
        self
    }

    pub fn unless(mut self, condition: Condition) -> Self {
        self.contraindication_conditions = Some(condition);
        self
    }

    pub fn recommend(mut self, product: RecommendedProduct) -> Self {
        self.recommended_products.push(product);
        self
    }

    pub fn with_reasoning_template(
        mut self,
        key: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.reasoning_templates.insert(key.into(), template.into());
        self
    }

    pub fn with_clinical_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.clinical_evidence = Some(evidence.into());
        self
    }

    pub fn with_contraindication(mut self, note: impl Into<String>) -> Self {
        self.contraindications.push(note.into());
        self
    }

    pub fn with_size_suggestion(mut self, key: impl Into<String>) -> Self {
        self.size_suggestion_key = Some(key.into());
        self
    }

    /// Inclusive on both ends; an absent bound is open.
    pub fn is_effective_on(&self, as_of: NaiveDate) -> bool {
        let started = self.effective_date.map_or(true, |from| from <= as_of);
        let not_expired = self.expiration_date.map_or(true, |until| as_of <= until);
        started && not_expired
    }

    pub fn applies_to(&self, wound_type: &WoundType, as_of: NaiveDate) -> bool {
        self.active && self.is_effective_on(as_of) && self.scope.includes(wound_type)
    }

    pub fn reasoning_template_for(&self, q_code: &str) -> Option<&str> {
        self.reasoning_templates
            .get(q_code)
            .or_else(|| self.reasoning_templates.get(DEFAULT_TEMPLATE_KEY))
            .map(String::as_str)
    }
}
