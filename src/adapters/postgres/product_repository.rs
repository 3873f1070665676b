//! PostgreSQL implementation of ProductRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId, Timestamp};
use crate::ports::ProductRepository;

pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    processor_product_id: String,
    processor_price_id: String,
    title: String,
    description: String,
    file_path: String,
    file_name: String,
    buy_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DomainError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::new(row.id)
                .map_err(|e| DomainError::database(format!("Invalid product id: {}", e)))?,
            processor_product_id: row.processor_product_id,
            processor_price_id: row.processor_price_id,
            title: row.title,
            description: row.description,
            file_path: row.file_path,
            file_name: row.file_name,
            buy_url: row.buy_url,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn save(&self, product: &Product) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, processor_product_id, processor_price_id, title, description,
                file_path, file_name, buy_url, is_active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                processor_product_id = EXCLUDED.processor_product_id,
                processor_price_id = EXCLUDED.processor_price_id,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                file_path = EXCLUDED.file_path,
                file_name = EXCLUDED.file_name,
                buy_url = EXCLUDED.buy_url,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.processor_product_id)
        .bind(&product.processor_price_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.file_path)
        .bind(&product.file_name)
        .bind(&product.buy_url)
        .bind(product.is_active)
        .bind(product.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save product: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, processor_product_id, processor_price_id, title, description,
                   file_path, file_name, buy_url, is_active, created_at
            FROM products WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find product: {}", e)))?;

        row.map(Product::try_from).transpose()
    }

    async fn set_active(&self, id: &ProductId, active: bool) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE products SET is_active = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to update product: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
