use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::info;

use woundrx_core::domain::product::WoundProduct;
use woundrx_core::recommend::catalog::Catalog;

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_q_code(&self, q_code: &str) -> Result<Option<WoundProduct>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT q_code, name, manufacturer, category, national_asp_per_sq_cm,
                   available_sizes_json, is_active
            FROM wound_products
            WHERE q_code = ? COLLATE NOCASE
            "#,
        )
        .bind(q_code.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| product_from_row(&row)).transpose()
    }

    async fn save(&self, product: WoundProduct) -> Result<(), RepositoryError> {
        let sizes = serde_json::to_string(&product.available_sizes_cm2)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO wound_products (
                q_code, name, manufacturer, category, national_asp_per_sq_cm,
                available_sizes_json, is_active
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(q_code) DO UPDATE SET
                name = excluded.name,
                manufacturer = excluded.manufacturer,
                category = excluded.category,
                national_asp_per_sq_cm = excluded.national_asp_per_sq_cm,
                available_sizes_json = excluded.available_sizes_json,
                is_active = excluded.is_active,
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            "#,
        )
        .bind(&product.q_code)
        .bind(&product.name)
        .bind(&product.manufacturer)
        .bind(&product.category)
        .bind(product.national_asp_per_sq_cm.to_string())
        .bind(sizes)
        .bind(product.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<WoundProduct>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT q_code, name, manufacturer, category, national_asp_per_sq_cm,
                   available_sizes_json, is_active
            FROM wound_products
            WHERE is_active = 1
            ORDER BY q_code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }
}

/// Loads every active product into an in-memory catalog for the formatter.
pub async fn load_catalog<R>(repository: &R) -> Result<Catalog, RepositoryError>
where
    R: ProductRepository + ?Sized,
{
    let products = repository.list_active().await?;
    info!(
        event_name = "catalog.loaded",
        products = products.len(),
        "wound product catalog loaded"
    );
    Ok(Catalog::new(products))
}

fn product_from_row(row: &SqliteRow) -> Result<WoundProduct, RepositoryError> {
    let q_code: String = row.try_get("q_code")?;
    let raw_price: String = row.try_get("national_asp_per_sq_cm")?;
    let national_asp_per_sq_cm = Decimal::from_str(raw_price.trim()).map_err(|error| {
        RepositoryError::Decode(format!("invalid national_asp_per_sq_cm for {q_code}: {error}"))
    })?;
    let raw_sizes: String = row.try_get("available_sizes_json")?;
    let available_sizes_cm2: Vec<f64> = serde_json::from_str(&raw_sizes).map_err(|error| {
        RepositoryError::Decode(format!("invalid available_sizes_json for {q_code}: {error}"))
    })?;

    Ok(WoundProduct {
        q_code,
        name: row.try_get("name")?,
        manufacturer: row.try_get("manufacturer")?,
        category: row.try_get("category")?,
        national_asp_per_sq_cm,
        available_sizes_cm2,
        active: row.try_get("is_active")?,
    })
}
