//! Pack size reference data service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Pack size service for managing pack unit masters
#[derive(Clone)]
pub struct PackSizeService {
    db: PgPool,
}

/// Pack size row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PackSizeRecord {
    pub id: Uuid,
    pub name: String,
    pub weight_kg: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a pack size
#[derive(Debug, Deserialize)]
pub struct CreatePackSizeInput {
    pub name: String,
    pub weight_kg: Decimal,
}

/// Input for updating a pack size
#[derive(Debug, Deserialize)]
pub struct UpdatePackSizeInput {
    pub name: Option<String>,
    pub weight_kg: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl PackSizeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List pack sizes, optionally only active ones
    pub async fn list_pack_sizes(&self, only_active: bool) -> AppResult<Vec<PackSizeRecord>> {
        let rows = sqlx::query_as::<_, PackSizeRecord>(
            r#"
            SELECT id, name, weight_kg, is_active, created_at
            FROM pack_sizes
            WHERE ($1 = false OR is_active = true)
            ORDER BY weight_kg ASC
            "#,
        )
        .bind(only_active)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Get a pack size by name
    pub async fn get_by_name(&self, name: &str) -> AppResult<PackSizeRecord> {
        sqlx::query_as::<_, PackSizeRecord>(
            "SELECT id, name, weight_kg, is_active, created_at FROM pack_sizes WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pack size '{}'", name)))
    }

    /// Create a new pack size master
    pub async fn create_pack_size(&self, input: CreatePackSizeInput) -> AppResult<PackSizeRecord> {
        if input.weight_kg <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "weight_kg".to_string(),
                message: "Pack weight must be greater than 0".to_string(),
                message_hi: "पैक वज़न 0 से अधिक होना चाहिए".to_string(),
            });
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pack_sizes WHERE name = $1",
        )
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("pack size".to_string()));
        }

        let row = sqlx::query_as::<_, PackSizeRecord>(
            r#"
            INSERT INTO pack_sizes (name, weight_kg)
            VALUES ($1, $2)
            RETURNING id, name, weight_kg, is_active, created_at
            "#,
        )
        .bind(&input.name)
        .bind(input.weight_kg)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    /// Update a pack size master
    ///
    /// Historical rows snapshot their weight, so changing the master never
    /// rewrites existing documents.
    pub async fn update_pack_size(
        &self,
        pack_size_id: Uuid,
        input: UpdatePackSizeInput,
    ) -> AppResult<PackSizeRecord> {
        let existing = sqlx::query_as::<_, PackSizeRecord>(
            "SELECT id, name, weight_kg, is_active, created_at FROM pack_sizes WHERE id = $1",
        )
        .bind(pack_size_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pack size".to_string()))?;

        let weight_kg = input.weight_kg.unwrap_or(existing.weight_kg);
        if weight_kg <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "weight_kg".to_string(),
                message: "Pack weight must be greater than 0".to_string(),
                message_hi: "पैक वज़न 0 से अधिक होना चाहिए".to_string(),
            });
        }

        let row = sqlx::query_as::<_, PackSizeRecord>(
            r#"
            UPDATE pack_sizes
            SET name = $1, weight_kg = $2, is_active = $3
            WHERE id = $4
            RETURNING id, name, weight_kg, is_active, created_at
            "#,
        )
        .bind(input.name.unwrap_or(existing.name))
        .bind(weight_kg)
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(pack_size_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }
}
