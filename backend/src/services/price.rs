//! Item price list service
//!
//! Prices are quoted per 50 KG reference pack per (area, item) and form a
//! time series. The applicable price is the latest active entry at or
//! before the requested point in time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::pack_size::{PackSizeRecord, PackSizeService};
use shared::models::{price_per_kg, rate_for_pack};

/// Price list service
#[derive(Clone)]
pub struct PriceService {
    db: PgPool,
}

/// Price list entry row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ItemPriceRecord {
    pub id: Uuid,
    pub item: String,
    pub area: String,
    pub base_price_50kg: Decimal,
    pub price_per_kg: Decimal,
    pub effective_datetime: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a price
#[derive(Debug, Deserialize)]
pub struct CreatePriceInput {
    pub item: String,
    pub area: String,
    pub base_price_50kg: Decimal,
    /// Defaults to now when omitted
    pub effective_datetime: Option<DateTime<Utc>>,
}

/// Latest active prices for one area, with the pack sizes they price
#[derive(Debug, Serialize)]
pub struct AreaPriceSummary {
    pub area: String,
    pub prices: Vec<ItemPriceRecord>,
    pub pack_sizes: Vec<PackSizeRecord>,
}

/// Resolved rate for an (item, area, pack size) lookup
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRate {
    pub item: String,
    pub area: String,
    pub pack_size: String,
    pub price_per_kg: Decimal,
    /// price_per_kg * pack weight
    pub rate: Decimal,
    pub effective_datetime: DateTime<Utc>,
}

impl PriceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List price entries, optionally filtered by item and area
    pub async fn list_prices(
        &self,
        item: Option<&str>,
        area: Option<&str>,
    ) -> AppResult<Vec<ItemPriceRecord>> {
        let rows = sqlx::query_as::<_, ItemPriceRecord>(
            r#"
            SELECT id, item, area, base_price_50kg, price_per_kg,
                   effective_datetime, is_active, created_at
            FROM item_prices
            WHERE ($1::text IS NULL OR item = $1)
              AND ($2::text IS NULL OR area = $2)
            ORDER BY effective_datetime DESC
            "#,
        )
        .bind(item)
        .bind(area)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Record a new price entry
    pub async fn create_price(&self, input: CreatePriceInput) -> AppResult<ItemPriceRecord> {
        if input.base_price_50kg <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "base_price_50kg".to_string(),
                message: "Base price must be greater than 0".to_string(),
                message_hi: "मूल भाव 0 से अधिक होना चाहिए".to_string(),
            });
        }

        let effective = input.effective_datetime.unwrap_or_else(Utc::now);
        let per_kg = price_per_kg(input.base_price_50kg);

        let row = sqlx::query_as::<_, ItemPriceRecord>(
            r#"
            INSERT INTO item_prices (item, area, base_price_50kg, price_per_kg, effective_datetime)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, item, area, base_price_50kg, price_per_kg,
                      effective_datetime, is_active, created_at
            "#,
        )
        .bind(&input.item)
        .bind(&input.area)
        .bind(input.base_price_50kg)
        .bind(per_kg)
        .bind(effective)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    /// Deactivate a price entry
    pub async fn deactivate_price(&self, price_id: Uuid) -> AppResult<()> {
        let updated = sqlx::query("UPDATE item_prices SET is_active = false WHERE id = $1")
            .bind(price_id)
            .execute(&self.db)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Price entry".to_string()));
        }
        Ok(())
    }

    /// Latest active price for (item, area) at or before `at`
    pub async fn latest_price(
        &self,
        item: &str,
        area: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Option<ItemPriceRecord>> {
        let row = sqlx::query_as::<_, ItemPriceRecord>(
            r#"
            SELECT id, item, area, base_price_50kg, price_per_kg,
                   effective_datetime, is_active, created_at
            FROM item_prices
            WHERE item = $1 AND area = $2 AND is_active = true AND effective_datetime <= $3
            ORDER BY effective_datetime DESC
            LIMIT 1
            "#,
        )
        .bind(item)
        .bind(area)
        .bind(at)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    /// Latest active price per item for one area, with the active pack sizes
    pub async fn prices_for_area(&self, area: &str) -> AppResult<AreaPriceSummary> {
        let prices = sqlx::query_as::<_, ItemPriceRecord>(
            r#"
            SELECT DISTINCT ON (item)
                   id, item, area, base_price_50kg, price_per_kg,
                   effective_datetime, is_active, created_at
            FROM item_prices
            WHERE area = $1 AND is_active = true AND effective_datetime <= NOW()
            ORDER BY item, effective_datetime DESC
            "#,
        )
        .bind(area)
        .fetch_all(&self.db)
        .await?;

        let pack_sizes = PackSizeService::new(self.db.clone())
            .list_pack_sizes(true)
            .await?;

        Ok(AreaPriceSummary {
            area: area.to_string(),
            prices,
            pack_sizes,
        })
    }

    /// Resolve the pack rate for (item, area, pack size) at a point in time
    pub async fn resolve_rate(
        &self,
        item: &str,
        area: &str,
        pack_size: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ResolvedRate> {
        let price = self
            .latest_price(item, area, at)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Price for {} in {}", item, area)))?;

        let weight_kg = sqlx::query_scalar::<_, Decimal>(
            "SELECT weight_kg FROM pack_sizes WHERE name = $1",
        )
        .bind(pack_size)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pack size '{}'", pack_size)))?;

        Ok(ResolvedRate {
            item: item.to_string(),
            area: area.to_string(),
            pack_size: pack_size.to_string(),
            price_per_kg: price.price_per_kg,
            rate: rate_for_pack(price.price_per_kg, weight_kg),
            effective_datetime: price.effective_datetime,
        })
    }
}
