//! Deal booking service
//!
//! Owns the deal aggregate: parent totals and statuses are always re-derived
//! from item rows, and item delivered figures are always re-derived from
//! submitted delivery rows. `refresh_from_deliveries` is the entry point the
//! delivery lifecycle calls after every submit/cancel/delete.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{recompute_deal, Deal, DealItem, DealItemStatus, DealStatus};
use shared::validation::check_booked_covers_delivered;

/// Deal service for managing wholesale bookings
#[derive(Clone)]
pub struct DealService {
    db: PgPool,
}

/// Database row for a deal header
#[derive(Debug, Clone, sqlx::FromRow)]
struct DealRow {
    pub id: Uuid,
    pub customer: String,
    pub customer_name: String,
    pub area: Option<String>,
    pub deal_date: NaiveDate,
    pub status: String,
    pub total_qty: Decimal,
    pub total_amount: Decimal,
    pub total_kg: Decimal,
    pub total_delivered_kg: Decimal,
    pub total_pending_kg: Decimal,
    pub remarks: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// Database row for a deal item
#[derive(Debug, Clone, sqlx::FromRow)]
struct DealItemRow {
    pub id: Uuid,
    pub idx: i32,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub delivered_qty: Decimal,
    pub pending_qty: Decimal,
    pub delivered_kg: Decimal,
    pub pending_kg: Decimal,
    pub item_status: String,
}

impl DealRow {
    fn into_deal(self, items: Vec<DealItem>) -> AppResult<Deal> {
        let status = DealStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown deal status '{}'", self.status)))?;
        Ok(Deal {
            id: self.id,
            customer: self.customer,
            customer_name: self.customer_name,
            area: self.area,
            deal_date: self.deal_date,
            status,
            items,
            total_qty: self.total_qty,
            total_amount: self.total_amount,
            total_kg: self.total_kg,
            total_delivered_kg: self.total_delivered_kg,
            total_pending_kg: self.total_pending_kg,
            remarks: self.remarks,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DealItemRow {
    fn into_item(self) -> AppResult<DealItem> {
        let item_status = DealItemStatus::parse(&self.item_status).ok_or_else(|| {
            AppError::Internal(format!("Unknown deal item status '{}'", self.item_status))
        })?;
        Ok(DealItem {
            id: self.id,
            idx: self.idx,
            item: self.item,
            pack_size: self.pack_size,
            pack_weight_kg: self.pack_weight_kg,
            qty: self.qty,
            rate: self.rate,
            amount: self.amount,
            delivered_qty: self.delivered_qty,
            pending_qty: self.pending_qty,
            delivered_kg: self.delivered_kg,
            pending_kg: self.pending_kg,
            item_status,
        })
    }
}

/// Input for one deal line
#[derive(Debug, Deserialize)]
pub struct DealItemInput {
    pub item: String,
    pub pack_size: String,
    pub qty: Decimal,
    pub rate: Decimal,
}

/// Input for creating a deal
#[derive(Debug, Deserialize)]
pub struct CreateDealInput {
    pub customer: String,
    pub customer_name: String,
    pub area: Option<String>,
    pub deal_date: NaiveDate,
    pub remarks: Option<String>,
    pub items: Vec<DealItemInput>,
}

/// Input for updating a deal. The item list replaces the existing rows;
/// rows carrying an id keep their identity (delivery rows reference it).
#[derive(Debug, Deserialize)]
pub struct UpdateDealInput {
    pub deal_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub items: Vec<UpdateDealItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDealItemInput {
    pub id: Option<Uuid>,
    pub item: String,
    pub pack_size: String,
    pub qty: Decimal,
    pub rate: Decimal,
}

/// Optional filters for listing deals
#[derive(Debug, Default, Deserialize)]
pub struct DealFilter {
    pub customer: Option<String>,
    pub status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Delivered sums per deal item from submitted deliveries
#[derive(Debug, sqlx::FromRow)]
struct DeliveredSumRow {
    pub deal_item_id: Uuid,
    pub delivered_qty: Decimal,
    pub delivered_kg: Decimal,
}

impl DealService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List deals with optional filters
    pub async fn list_deals(&self, filter: DealFilter) -> AppResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(
            r#"
            SELECT id, customer, customer_name, area, deal_date, status,
                   total_qty, total_amount, total_kg, total_delivered_kg, total_pending_kg,
                   remarks, created_at, updated_at
            FROM deals
            WHERE ($1::text IS NULL OR customer = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::date IS NULL OR deal_date >= $3)
              AND ($4::date IS NULL OR deal_date <= $4)
            ORDER BY deal_date DESC, created_at DESC
            "#,
        )
        .bind(&filter.customer)
        .bind(&filter.status)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_all(&self.db)
        .await?;

        let mut deals = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(row.id).await?;
            deals.push(row.into_deal(items)?);
        }
        Ok(deals)
    }

    /// Get a deal with its items
    pub async fn get_deal(&self, deal_id: Uuid) -> AppResult<Deal> {
        let row = sqlx::query_as::<_, DealRow>(
            r#"
            SELECT id, customer, customer_name, area, deal_date, status,
                   total_qty, total_amount, total_kg, total_delivered_kg, total_pending_kg,
                   remarks, created_at, updated_at
            FROM deals
            WHERE id = $1
            "#,
        )
        .bind(deal_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

        let items = self.load_items(deal_id).await?;
        row.into_deal(items)
    }

    async fn load_items(&self, deal_id: Uuid) -> AppResult<Vec<DealItem>> {
        let rows = sqlx::query_as::<_, DealItemRow>(
            r#"
            SELECT id, idx, item, pack_size, pack_weight_kg, qty, rate, amount,
                   delivered_qty, pending_qty, delivered_kg, pending_kg, item_status
            FROM deal_items
            WHERE deal_id = $1
            ORDER BY idx ASC
            "#,
        )
        .bind(deal_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(DealItemRow::into_item).collect()
    }

    fn validate_items<T>(items: &[T], qty_of: impl Fn(&T) -> Decimal) -> AppResult<()> {
        if items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A deal must have at least one item".to_string(),
                message_hi: "सौदे में कम से कम एक आइटम होना चाहिए".to_string(),
            });
        }
        for (i, row) in items.iter().enumerate() {
            if qty_of(row) <= Decimal::ZERO {
                return Err(AppError::Validation {
                    field: format!("items[{}].qty", i),
                    message: format!("Row {}: quantity must be greater than 0", i + 1),
                    message_hi: format!("पंक्ति {}: मात्रा 0 से अधिक होनी चाहिए", i + 1),
                });
            }
        }
        Ok(())
    }

    /// Create a new deal
    ///
    /// Pack weights are snapshotted from the pack-size master at creation.
    pub async fn create_deal(&self, input: CreateDealInput) -> AppResult<Deal> {
        Self::validate_items(&input.items, |r| r.qty)?;

        let mut tx = self.db.begin().await?;

        let deal_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO deals (customer, customer_name, area, deal_date, status, remarks)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&input.customer)
        .bind(&input.customer_name)
        .bind(&input.area)
        .bind(input.deal_date)
        .bind(DealStatus::Open.as_str())
        .bind(&input.remarks)
        .fetch_one(&mut *tx)
        .await?;

        for (i, row) in input.items.iter().enumerate() {
            let pack_weight_kg = Self::pack_weight(&mut tx, &row.pack_size).await?;
            sqlx::query(
                r#"
                INSERT INTO deal_items
                    (deal_id, idx, item, pack_size, pack_weight_kg, qty, rate, item_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(deal_id)
            .bind((i + 1) as i32)
            .bind(&row.item)
            .bind(&row.pack_size)
            .bind(pack_weight_kg)
            .bind(row.qty)
            .bind(row.rate)
            .bind(DealItemStatus::Open.as_str())
            .execute(&mut *tx)
            .await?;
        }

        Self::recompute_and_persist(&mut tx, deal_id).await?;
        tx.commit().await?;

        self.get_deal(deal_id).await
    }

    /// Update a deal, replacing its item rows
    ///
    /// An existing row dropped from the list must not be referenced by any
    /// delivery row; that would orphan the delivery's foreign key.
    pub async fn update_deal(&self, deal_id: Uuid, input: UpdateDealInput) -> AppResult<Deal> {
        Self::validate_items(&input.items, |r| r.qty)?;

        let existing = self.get_deal(deal_id).await?;
        if existing.status == DealStatus::Cancelled {
            return Err(AppError::InvalidStateTransition(
                "Cannot modify a cancelled deal".to_string(),
            ));
        }

        let kept_ids: Vec<Uuid> = input.items.iter().filter_map(|r| r.id).collect();

        let mut tx = self.db.begin().await?;
        Self::lock_deal(&mut tx, deal_id).await?;

        // Item rows that vanish from the list must not be referenced by deliveries
        let referenced = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM deal_items di
            WHERE di.deal_id = $1
              AND di.id != ALL($2)
              AND EXISTS (SELECT 1 FROM delivery_items dli WHERE dli.deal_item_id = di.id)
            "#,
        )
        .bind(deal_id)
        .bind(&kept_ids)
        .fetch_one(&mut *tx)
        .await?;

        if referenced > 0 {
            return Err(AppError::LinkedDocuments(
                "Cannot remove deal items that have delivery rows against them".to_string(),
            ));
        }

        sqlx::query("DELETE FROM deal_items WHERE deal_id = $1 AND id != ALL($2)")
            .bind(deal_id)
            .bind(&kept_ids)
            .execute(&mut *tx)
            .await?;

        for (i, row) in input.items.iter().enumerate() {
            let idx = (i + 1) as i32;
            match row.id {
                Some(item_id) => {
                    // The at-creation snapshot stays authoritative; only a
                    // changed pack size re-reads the master
                    let pack_weight_kg = match existing
                        .items
                        .iter()
                        .find(|it| it.id == item_id && it.pack_size == row.pack_size)
                    {
                        Some(current) => current.pack_weight_kg,
                        None => Self::pack_weight(&mut tx, &row.pack_size).await?,
                    };
                    let updated = sqlx::query(
                        r#"
                        UPDATE deal_items
                        SET idx = $1, item = $2, pack_size = $3, pack_weight_kg = $4,
                            qty = $5, rate = $6
                        WHERE id = $7 AND deal_id = $8
                        "#,
                    )
                    .bind(idx)
                    .bind(&row.item)
                    .bind(&row.pack_size)
                    .bind(pack_weight_kg)
                    .bind(row.qty)
                    .bind(row.rate)
                    .bind(item_id)
                    .bind(deal_id)
                    .execute(&mut *tx)
                    .await?;

                    if updated.rows_affected() == 0 {
                        return Err(AppError::NotFound("Deal item".to_string()));
                    }
                }
                None => {
                    let pack_weight_kg = Self::pack_weight(&mut tx, &row.pack_size).await?;
                    sqlx::query(
                        r#"
                        INSERT INTO deal_items
                            (deal_id, idx, item, pack_size, pack_weight_kg, qty, rate, item_status)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        "#,
                    )
                    .bind(deal_id)
                    .bind(idx)
                    .bind(&row.item)
                    .bind(&row.pack_size)
                    .bind(pack_weight_kg)
                    .bind(row.qty)
                    .bind(row.rate)
                    .bind(DealItemStatus::Open.as_str())
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        sqlx::query("UPDATE deals SET deal_date = $1, remarks = $2 WHERE id = $3")
            .bind(input.deal_date.unwrap_or(existing.deal_date))
            .bind(input.remarks.or(existing.remarks))
            .bind(deal_id)
            .execute(&mut *tx)
            .await?;

        // Delivered figures may shift when qty or pack size changed
        Self::refresh_items_in_tx(&mut tx, deal_id).await?;
        Self::check_booking_covers_deliveries(&mut tx, deal_id).await?;
        Self::recompute_and_persist(&mut tx, deal_id).await?;
        tx.commit().await?;

        self.get_deal(deal_id).await
    }

    /// Reject edits that shrink a row below its already-delivered KG;
    /// persisting them would drive pending figures negative.
    async fn check_booking_covers_deliveries(
        tx: &mut Transaction<'_, Postgres>,
        deal_id: Uuid,
    ) -> AppResult<()> {
        let rows = sqlx::query_as::<_, (i32, Decimal, Decimal)>(
            r#"
            SELECT idx, qty * pack_weight_kg, delivered_kg
            FROM deal_items
            WHERE deal_id = $1
            ORDER BY idx ASC
            "#,
        )
        .bind(deal_id)
        .fetch_all(&mut **tx)
        .await?;

        for (idx, booked_kg, delivered_kg) in rows {
            check_booked_covers_delivered(booked_kg, delivered_kg)
                .map_err(|msg| AppError::ValidationError(format!("Row {}: {}", idx, msg)))?;
        }
        Ok(())
    }

    /// Cancel a deal. Terminal; refused while submitted deliveries exist.
    pub async fn cancel_deal(&self, deal_id: Uuid) -> AppResult<Deal> {
        let existing = self.get_deal(deal_id).await?;
        if existing.status == DealStatus::Cancelled {
            return Ok(existing);
        }

        let submitted = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM delivery_items dli
            JOIN deliveries d ON d.id = dli.delivery_id
            WHERE dli.deal_id = $1 AND d.docstatus = 1
            "#,
        )
        .bind(deal_id)
        .fetch_one(&self.db)
        .await?;

        if submitted > 0 {
            return Err(AppError::LinkedDocuments(
                "Cannot cancel a deal with submitted deliveries against it".to_string(),
            ));
        }

        sqlx::query("UPDATE deals SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(DealStatus::Cancelled.as_str())
            .bind(deal_id)
            .execute(&self.db)
            .await?;

        self.get_deal(deal_id).await
    }

    /// Mark a deal Confirmed. Only an Open deal can be confirmed.
    pub async fn confirm_deal(&self, deal_id: Uuid) -> AppResult<Deal> {
        let existing = self.get_deal(deal_id).await?;
        if existing.status != DealStatus::Open {
            return Err(AppError::InvalidStateTransition(format!(
                "Only an Open deal can be confirmed (current status: {})",
                existing.status
            )));
        }

        sqlx::query("UPDATE deals SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(DealStatus::Confirmed.as_str())
            .bind(deal_id)
            .execute(&self.db)
            .await?;

        self.get_deal(deal_id).await
    }

    /// Delete a deal. Refused while any delivery row references it.
    pub async fn delete_deal(&self, deal_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM deals WHERE id = $1")
            .bind(deal_id)
            .fetch_one(&self.db)
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound("Deal".to_string()));
        }

        let referenced = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM delivery_items WHERE deal_id = $1",
        )
        .bind(deal_id)
        .fetch_one(&self.db)
        .await?;

        if referenced > 0 {
            return Err(AppError::LinkedDocuments(
                "Cannot delete a deal with delivery rows against it".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM deal_items WHERE deal_id = $1")
            .bind(deal_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(deal_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Re-derive a deal's delivered figures from submitted deliveries.
    ///
    /// Idempotent; safe to re-run at any time. Missing deals are skipped
    /// silently (a delivery delete can race a deal delete).
    pub async fn refresh_from_deliveries(&self, deal_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM deals WHERE id = $1 FOR UPDATE")
            .bind(deal_id)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_none() {
            return Ok(());
        }

        Self::refresh_items_in_tx(&mut tx, deal_id).await?;
        Self::recompute_and_persist(&mut tx, deal_id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Lock a deal row for the duration of the transaction.
    ///
    /// Delivery submit locks every affected deal (in sorted id order) before
    /// validating, so two submissions against the same deal serialize.
    pub async fn lock_deal(tx: &mut Transaction<'_, Postgres>, deal_id: Uuid) -> AppResult<()> {
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM deals WHERE id = $1 FOR UPDATE")
            .bind(deal_id)
            .fetch_optional(&mut **tx)
            .await?;

        if locked.is_none() {
            return Err(AppError::NotFound("Deal".to_string()));
        }
        Ok(())
    }

    async fn pack_weight(tx: &mut Transaction<'_, Postgres>, name: &str) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            "SELECT weight_kg FROM pack_sizes WHERE name = $1 AND is_active = true",
        )
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pack size '{}'", name)))
    }

    /// Overwrite each item's delivered_qty/delivered_kg with the sum over
    /// submitted delivery rows. Items with no submitted rows reset to zero.
    async fn refresh_items_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        deal_id: Uuid,
    ) -> AppResult<()> {
        let sums = sqlx::query_as::<_, DeliveredSumRow>(
            r#"
            SELECT dli.deal_item_id,
                   COALESCE(SUM(dli.deliver_qty), 0) AS delivered_qty,
                   COALESCE(SUM(dli.deliver_qty * dli.pack_weight_kg), 0) AS delivered_kg
            FROM delivery_items dli
            JOIN deliveries d ON d.id = dli.delivery_id
            WHERE dli.deal_id = $1 AND d.docstatus = 1
            GROUP BY dli.deal_item_id
            "#,
        )
        .bind(deal_id)
        .fetch_all(&mut **tx)
        .await?;

        sqlx::query("UPDATE deal_items SET delivered_qty = 0, delivered_kg = 0 WHERE deal_id = $1")
            .bind(deal_id)
            .execute(&mut **tx)
            .await?;

        for sum in sums {
            sqlx::query(
                "UPDATE deal_items SET delivered_qty = $1, delivered_kg = $2 WHERE id = $3",
            )
            .bind(sum.delivered_qty)
            .bind(sum.delivered_kg)
            .bind(sum.deal_item_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Run the pure recompute over the stored rows and persist the results.
    async fn recompute_and_persist(
        tx: &mut Transaction<'_, Postgres>,
        deal_id: Uuid,
    ) -> AppResult<()> {
        let header = sqlx::query_as::<_, DealRow>(
            r#"
            SELECT id, customer, customer_name, area, deal_date, status,
                   total_qty, total_amount, total_kg, total_delivered_kg, total_pending_kg,
                   remarks, created_at, updated_at
            FROM deals
            WHERE id = $1
            "#,
        )
        .bind(deal_id)
        .fetch_one(&mut **tx)
        .await?;

        let item_rows = sqlx::query_as::<_, DealItemRow>(
            r#"
            SELECT id, idx, item, pack_size, pack_weight_kg, qty, rate, amount,
                   delivered_qty, pending_qty, delivered_kg, pending_kg, item_status
            FROM deal_items
            WHERE deal_id = $1
            ORDER BY idx ASC
            "#,
        )
        .bind(deal_id)
        .fetch_all(&mut **tx)
        .await?;

        let items: AppResult<Vec<DealItem>> =
            item_rows.into_iter().map(DealItemRow::into_item).collect();
        let mut deal = header.into_deal(items?)?;

        recompute_deal(&mut deal);

        for row in &deal.items {
            sqlx::query(
                r#"
                UPDATE deal_items
                SET amount = $1, pending_qty = $2, pending_kg = $3, item_status = $4
                WHERE id = $5
                "#,
            )
            .bind(row.amount)
            .bind(row.pending_qty)
            .bind(row.pending_kg)
            .bind(row.item_status.as_str())
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE deals
            SET status = $1, total_qty = $2, total_amount = $3, total_kg = $4,
                total_delivered_kg = $5, total_pending_kg = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(deal.status.as_str())
        .bind(deal.total_qty)
        .bind(deal.total_amount)
        .bind(deal.total_kg)
        .bind(deal.total_delivered_kg)
        .bind(deal.total_pending_kg)
        .bind(deal_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
