use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::warn;

use woundrx_core::domain::context::WoundType;
use woundrx_core::domain::rule::{RecommendationRule, RuleId};
use woundrx_core::recommend::{RuleStore, RuleStoreError};

use super::{RepositoryError, RuleRepository};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

const RULE_COLUMNS: &str = r#"
    id, name, description, scope_json, priority, is_active, effective_date, expiration_date,
    match_conditions_json, contraindication_conditions_json, recommended_products_json,
    reasoning_templates_json, clinical_evidence, contraindications_json, size_suggestion_key
"#;

pub struct SqlRuleRepository {
    pool: DbPool,
}

impl SqlRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for SqlRuleRepository {
    async fn find_by_id(&self, id: RuleId) -> Result<Option<RecommendationRule>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM recommendation_rules WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| rule_from_row(&row)).transpose()
    }

    async fn save(&self, rule: RecommendationRule) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO recommendation_rules (
                id, name, description, scope_json, priority, is_active, effective_date,
                expiration_date, match_conditions_json, contraindication_conditions_json,
                recommended_products_json, reasoning_templates_json, clinical_evidence,
                contraindications_json, size_suggestion_key
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                scope_json = excluded.scope_json,
                priority = excluded.priority,
                is_active = excluded.is_active,
                effective_date = excluded.effective_date,
                expiration_date = excluded.expiration_date,
                match_conditions_json = excluded.match_conditions_json,
                contraindication_conditions_json = excluded.contraindication_conditions_json,
                recommended_products_json = excluded.recommended_products_json,
                reasoning_templates_json = excluded.reasoning_templates_json,
                clinical_evidence = excluded.clinical_evidence,
                contraindications_json = excluded.contraindications_json,
                size_suggestion_key = excluded.size_suggestion_key,
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            "#,
        )
        .bind(rule.id.0)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(encode_json(&rule.scope)?)
        .bind(rule.priority)
        .bind(rule.active)
        .bind(rule.effective_date.map(|date| date.format(DATE_FORMAT).to_string()))
        .bind(rule.expiration_date.map(|date| date.format(DATE_FORMAT).to_string()))
        .bind(rule.match_conditions.as_ref().map(encode_json).transpose()?)
        .bind(rule.contraindication_conditions.as_ref().map(encode_json).transpose()?)
        .bind(encode_json(&rule.recommended_products)?)
        .bind(encode_json(&rule.reasoning_templates)?)
        .bind(&rule.clinical_evidence)
        .bind(encode_json(&rule.contraindications)?)
        .bind(&rule.size_suggestion_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<RecommendationRule>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM recommendation_rules ORDER BY priority ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(rule_from_row).collect()
    }
}

#[async_trait]
impl RuleStore for SqlRuleRepository {
    async fn applicable_rules(
        &self,
        wound_type: &WoundType,
        as_of: NaiveDate,
    ) -> Result<Vec<RecommendationRule>, RuleStoreError> {
        let as_of = as_of.format(DATE_FORMAT).to_string();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM recommendation_rules
            WHERE is_active = 1
              AND (effective_date IS NULL OR effective_date <= ?1)
              AND (expiration_date IS NULL OR expiration_date >= ?1)
            ORDER BY priority ASC, id ASC
            "#
        ))
        .bind(&as_of)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in &rows {
            // A row that fails to decode is skipped so the remaining rules still apply.
            let rule = match rule_from_row(row) {
                Ok(rule) => rule,
                Err(error) => {
                    warn!(
                        event_name = "recommendation.rules.decode_skipped",
                        rule_id = row.try_get::<i64, _>("id").ok(),
                        error = %error,
                        "stored rule could not be decoded, skipping it"
                    );
                    continue;
                }
            };
            if rule.scope.includes(wound_type) {
                rules.push(rule);
            }
        }
        Ok(rules)
    }
}

fn rule_from_row(row: &SqliteRow) -> Result<RecommendationRule, RepositoryError> {
    let effective_date: Option<String> = row.try_get("effective_date")?;
    let expiration_date: Option<String> = row.try_get("expiration_date")?;
    let match_conditions: Option<String> = row.try_get("match_conditions_json")?;
    let contraindication_conditions: Option<String> =
        row.try_get("contraindication_conditions_json")?;

    Ok(RecommendationRule {
        id: RuleId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        scope: decode_json("scope_json", &row.try_get::<String, _>("scope_json")?)?,
        priority: row.try_get("priority")?,
        active: row.try_get("is_active")?,
        effective_date: effective_date.map(|raw| parse_date("effective_date", &raw)).transpose()?,
        expiration_date: expiration_date
            .map(|raw| parse_date("expiration_date", &raw))
            .transpose()?,
        match_conditions: match_conditions
            .map(|raw| decode_json("match_conditions_json", &raw))
            .transpose()?,
        contraindication_conditions: contraindication_conditions
            .map(|raw| decode_json("contraindication_conditions_json", &raw))
            .transpose()?,
        recommended_products: decode_json(
            "recommended_products_json",
            &row.try_get::<String, _>("recommended_products_json")?,
        )?,
        reasoning_templates: decode_json(
            "reasoning_templates_json",
            &row.try_get::<String, _>("reasoning_templates_json")?,
        )?,
        clinical_evidence: row.try_get("clinical_evidence")?,
        contraindications: decode_json(
            "contraindications_json",
            &row.try_get::<String, _>("contraindications_json")?,
        )?,
        size_suggestion_key: row.try_get("size_suggestion_key")?,
    })
}

fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|error| RepositoryError::Decode(format!("invalid {column} `{raw}`: {error}")))
}

fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid {column}: {error}")))
}

fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}
