//! Delivery lifecycle service: validation, submit/cancel/delete and the
//! FIFO allocation planning aid
//!
//! A delivery is the only document that moves deal delivered totals, and it
//! does so indirectly: every submit/cancel/delete fans out to
//! `DealService::refresh_from_deliveries` for each touched deal. Submission
//! locks the affected deal rows before validating so two deliveries against
//! the same deal serialize while unrelated deals proceed in parallel.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::deal::DealService;
use shared::allocation::{allocate_fifo, AllocationResult, PendingDealItem};
use shared::models::{
    aggregate_by_pack, compute_delivery_totals, pending_deal_statuses, pending_item_statuses,
    AggregatedDeliveryLine, DealStatus, Delivery, DeliveryItem, Docstatus,
};
use shared::validation::{check_delivery_capacity, has_pending};

/// Delivery service
#[derive(Clone)]
pub struct DeliveryService {
    db: PgPool,
}

/// Database row for a delivery header
#[derive(Debug, Clone, sqlx::FromRow)]
struct DeliveryRow {
    pub id: Uuid,
    pub customer: String,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub docstatus: i16,
    pub total_delivery_qty: Decimal,
    pub total_delivery_kg: Decimal,
    pub total_amount: Decimal,
    pub remarks: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// Database row for a delivery item
#[derive(Debug, Clone, sqlx::FromRow)]
struct DeliveryItemRow {
    pub id: Uuid,
    pub idx: i32,
    pub deal_id: Option<Uuid>,
    pub deal_item_id: Option<Uuid>,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub deliver_qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub is_extra: bool,
}

impl DeliveryRow {
    fn into_delivery(self, items: Vec<DeliveryItem>) -> AppResult<Delivery> {
        let docstatus = Docstatus::from_i16(self.docstatus)
            .ok_or_else(|| AppError::Internal(format!("Unknown docstatus {}", self.docstatus)))?;
        Ok(Delivery {
            id: self.id,
            customer: self.customer,
            customer_name: self.customer_name,
            delivery_date: self.delivery_date,
            docstatus,
            items,
            total_delivery_qty: self.total_delivery_qty,
            total_delivery_kg: self.total_delivery_kg,
            total_amount: self.total_amount,
            remarks: self.remarks,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<DeliveryItemRow> for DeliveryItem {
    fn from(row: DeliveryItemRow) -> Self {
        DeliveryItem {
            id: row.id,
            idx: row.idx,
            deal_id: row.deal_id,
            deal_item_id: row.deal_item_id,
            item: row.item,
            pack_size: row.pack_size,
            pack_weight_kg: row.pack_weight_kg,
            deliver_qty: row.deliver_qty,
            rate: row.rate,
            amount: row.amount,
            is_extra: row.is_extra,
        }
    }
}

/// Input for one delivery row. Omitting `deal_id` makes it an extra row.
#[derive(Debug, Deserialize)]
pub struct DeliveryItemInput {
    pub deal_id: Option<Uuid>,
    pub deal_item_id: Option<Uuid>,
    pub item: String,
    pub pack_size: String,
    pub deliver_qty: Decimal,
    pub rate: Decimal,
}

/// Input for creating or updating a delivery
#[derive(Debug, Deserialize)]
pub struct CreateDeliveryInput {
    pub customer: String,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub remarks: Option<String>,
    pub items: Vec<DeliveryItemInput>,
}

/// Optional filters for the pending-items query and the allocator
#[derive(Debug, Default, Deserialize)]
pub struct AllocationQuery {
    pub customer: String,
    pub item: Option<String>,
    pub pack_size: Option<String>,
    /// Delivery being edited; its own submitted rows are excluded from the
    /// already-delivered tally so an edit does not block itself
    pub exclude_delivery: Option<Uuid>,
}

/// Candidate row from the pending-items query before tolerance filtering
#[derive(Debug, sqlx::FromRow)]
struct PendingCandidateRow {
    pub deal_id: Uuid,
    pub deal_item_id: Uuid,
    pub deal_date: NaiveDate,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub qty: Decimal,
    pub rate: Decimal,
    pub other_delivered_qty: Decimal,
    pub other_delivered_kg: Decimal,
}

impl DeliveryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List deliveries, optionally filtered by customer and docstatus
    pub async fn list_deliveries(
        &self,
        customer: Option<&str>,
        docstatus: Option<i16>,
    ) -> AppResult<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, customer, customer_name, delivery_date, docstatus,
                   total_delivery_qty, total_delivery_kg, total_amount,
                   remarks, created_at, updated_at
            FROM deliveries
            WHERE ($1::text IS NULL OR customer = $1)
              AND ($2::smallint IS NULL OR docstatus = $2)
            ORDER BY delivery_date DESC, created_at DESC
            "#,
        )
        .bind(customer)
        .bind(docstatus)
        .fetch_all(&self.db)
        .await?;

        let mut deliveries = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(row.id).await?;
            deliveries.push(row.into_delivery(items)?);
        }
        Ok(deliveries)
    }

    /// Get a delivery with its rows
    pub async fn get_delivery(&self, delivery_id: Uuid) -> AppResult<Delivery> {
        let row = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, customer, customer_name, delivery_date, docstatus,
                   total_delivery_qty, total_delivery_kg, total_amount,
                   remarks, created_at, updated_at
            FROM deliveries
            WHERE id = $1
            "#,
        )
        .bind(delivery_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?;

        let items = self.load_items(delivery_id).await?;
        row.into_delivery(items)
    }

    async fn load_items(&self, delivery_id: Uuid) -> AppResult<Vec<DeliveryItem>> {
        let rows = sqlx::query_as::<_, DeliveryItemRow>(
            r#"
            SELECT id, idx, deal_id, deal_item_id, item, pack_size, pack_weight_kg,
                   deliver_qty, rate, amount, is_extra
            FROM delivery_items
            WHERE delivery_id = $1
            ORDER BY idx ASC
            "#,
        )
        .bind(delivery_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DeliveryItem::from).collect())
    }

    /// The submitted delivery's rows aggregated by (item, pack_size), for
    /// the downstream stock component
    pub async fn aggregated_lines(
        &self,
        delivery_id: Uuid,
    ) -> AppResult<Vec<AggregatedDeliveryLine>> {
        let delivery = self.get_delivery(delivery_id).await?;
        Ok(aggregate_by_pack(&delivery.items))
    }

    /// Create a delivery in Draft
    pub async fn create_delivery(&self, input: CreateDeliveryInput) -> AppResult<Delivery> {
        let mut items = self.build_rows(&input.items).await?;
        let totals = compute_delivery_totals(&mut items);

        let mut tx = self.db.begin().await?;
        self.validate_rows(&mut tx, &items, None).await?;

        let delivery_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO deliveries
                (customer, customer_name, delivery_date, docstatus,
                 total_delivery_qty, total_delivery_kg, total_amount, remarks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&input.customer)
        .bind(&input.customer_name)
        .bind(input.delivery_date)
        .bind(Docstatus::Draft.as_i16())
        .bind(totals.total_delivery_qty)
        .bind(totals.total_delivery_kg)
        .bind(totals.total_amount)
        .bind(&input.remarks)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_rows(&mut tx, delivery_id, &items).await?;
        tx.commit().await?;

        self.get_delivery(delivery_id).await
    }

    /// Update a Draft delivery, replacing its rows
    pub async fn update_delivery(
        &self,
        delivery_id: Uuid,
        input: CreateDeliveryInput,
    ) -> AppResult<Delivery> {
        let existing = self.get_delivery(delivery_id).await?;
        if !existing.docstatus.is_draft() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Draft delivery can be edited (current: {})",
                existing.docstatus
            )));
        }

        let mut items = self.build_rows(&input.items).await?;
        let totals = compute_delivery_totals(&mut items);

        let mut tx = self.db.begin().await?;
        // Exclude this delivery so its own submitted history never
        // self-blocks the edit
        self.validate_rows(&mut tx, &items, Some(delivery_id))
            .await?;

        sqlx::query("DELETE FROM delivery_items WHERE delivery_id = $1")
            .bind(delivery_id)
            .execute(&mut *tx)
            .await?;
        Self::insert_rows(&mut tx, delivery_id, &items).await?;

        sqlx::query(
            r#"
            UPDATE deliveries
            SET customer = $1, customer_name = $2, delivery_date = $3,
                total_delivery_qty = $4, total_delivery_kg = $5, total_amount = $6,
                remarks = $7, updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(&input.customer)
        .bind(&input.customer_name)
        .bind(input.delivery_date)
        .bind(totals.total_delivery_qty)
        .bind(totals.total_delivery_kg)
        .bind(totals.total_amount)
        .bind(&input.remarks)
        .bind(delivery_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_delivery(delivery_id).await
    }

    /// Submit a Draft delivery
    ///
    /// Locks every referenced deal (sorted, to avoid lock-order deadlocks),
    /// re-validates against the now-stable delivered sums, flips docstatus,
    /// commits, then refreshes each deal. A failed refresh is logged and
    /// does not roll back the submission; a later idempotent refresh
    /// repairs the aggregate.
    pub async fn submit_delivery(&self, delivery_id: Uuid) -> AppResult<Delivery> {
        let delivery = self.get_delivery(delivery_id).await?;
        if !delivery.docstatus.is_draft() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Draft delivery can be submitted (current: {})",
                delivery.docstatus
            )));
        }

        let deal_ids = Self::affected_deal_ids(&delivery.items);

        let mut tx = self.db.begin().await?;
        for deal_id in &deal_ids {
            DealService::lock_deal(&mut tx, *deal_id).await?;
        }
        self.validate_rows(&mut tx, &delivery.items, Some(delivery_id))
            .await?;

        sqlx::query("UPDATE deliveries SET docstatus = $1, updated_at = NOW() WHERE id = $2")
            .bind(Docstatus::Submitted.as_i16())
            .bind(delivery_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.refresh_deals(&deal_ids).await;
        self.get_delivery(delivery_id).await
    }

    /// Cancel a Submitted delivery, rolling its quantities back out of the
    /// affected deals
    pub async fn cancel_delivery(&self, delivery_id: Uuid) -> AppResult<Delivery> {
        let delivery = self.get_delivery(delivery_id).await?;
        if !delivery.docstatus.is_submitted() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Submitted delivery can be cancelled (current: {})",
                delivery.docstatus
            )));
        }

        sqlx::query("UPDATE deliveries SET docstatus = $1, updated_at = NOW() WHERE id = $2")
            .bind(Docstatus::Cancelled.as_i16())
            .bind(delivery_id)
            .execute(&self.db)
            .await?;

        self.refresh_deals(&Self::affected_deal_ids(&delivery.items))
            .await;
        self.get_delivery(delivery_id).await
    }

    /// Delete a Draft delivery
    ///
    /// The affected deal set is captured before the rows are removed;
    /// recompute runs afterwards and skips deals that vanished meanwhile.
    pub async fn delete_delivery(&self, delivery_id: Uuid) -> AppResult<()> {
        let delivery = self.get_delivery(delivery_id).await?;
        if !delivery.docstatus.is_draft() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Draft delivery can be deleted (current: {})",
                delivery.docstatus
            )));
        }

        let deal_ids = Self::affected_deal_ids(&delivery.items);

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM delivery_items WHERE delivery_id = $1")
            .bind(delivery_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM deliveries WHERE id = $1")
            .bind(delivery_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.refresh_deals(&deal_ids).await;
        Ok(())
    }

    /// All pending deal items for a customer, oldest booking first
    pub async fn get_pending_deal_items(
        &self,
        query: &AllocationQuery,
    ) -> AppResult<Vec<PendingDealItem>> {
        let editing = query.exclude_delivery.is_some();
        let deal_statuses: Vec<String> = pending_deal_statuses(editing)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let item_statuses: Vec<String> = pending_item_statuses(editing)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, PendingCandidateRow>(
            r#"
            SELECT d.id AS deal_id, di.id AS deal_item_id, d.deal_date,
                   di.item, di.pack_size, di.pack_weight_kg, di.qty, di.rate,
                   COALESCE(sub.delivered_qty, 0) AS other_delivered_qty,
                   COALESCE(sub.delivered_kg, 0) AS other_delivered_kg
            FROM deal_items di
            JOIN deals d ON d.id = di.deal_id
            LEFT JOIN (
                SELECT dli.deal_item_id,
                       SUM(dli.deliver_qty) AS delivered_qty,
                       SUM(dli.deliver_qty * dli.pack_weight_kg) AS delivered_kg
                FROM delivery_items dli
                JOIN deliveries dd ON dd.id = dli.delivery_id
                WHERE dd.docstatus = 1
                  AND ($6::uuid IS NULL OR dli.delivery_id != $6)
                GROUP BY dli.deal_item_id
            ) sub ON sub.deal_item_id = di.id
            WHERE d.customer = $1
              AND ($2::text IS NULL OR di.item = $2)
              AND ($3::text IS NULL OR di.pack_size = $3)
              AND d.status = ANY($4)
              AND di.item_status = ANY($5)
            ORDER BY d.deal_date ASC, d.created_at ASC, di.idx ASC
            "#,
        )
        .bind(&query.customer)
        .bind(&query.item)
        .bind(&query.pack_size)
        .bind(&deal_statuses)
        .bind(&item_statuses)
        .bind(query.exclude_delivery)
        .fetch_all(&self.db)
        .await?;

        let pending = rows
            .into_iter()
            .filter_map(|row| {
                let booked_kg = row.qty * row.pack_weight_kg;
                let pending_kg = booked_kg - row.other_delivered_kg;
                if !has_pending(pending_kg) {
                    return None;
                }
                Some(PendingDealItem {
                    deal_id: row.deal_id,
                    deal_item_id: row.deal_item_id,
                    deal_date: row.deal_date,
                    item: row.item,
                    pack_size: row.pack_size,
                    pack_weight_kg: row.pack_weight_kg,
                    rate: row.rate,
                    pending_qty: row.qty - row.other_delivered_qty,
                    pending_kg,
                })
            })
            .collect();

        Ok(pending)
    }

    /// Propose delivery rows by allocating `total_qty` packs FIFO across
    /// the customer's pending deal items. A shortfall is reported, never
    /// raised.
    pub async fn allocate(
        &self,
        query: &AllocationQuery,
        total_qty: Decimal,
    ) -> AppResult<AllocationResult> {
        let pending = self.get_pending_deal_items(query).await?;
        Ok(allocate_fifo(&pending, total_qty))
    }

    fn affected_deal_ids(items: &[DeliveryItem]) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = items.iter().filter_map(|r| r.deal_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Refresh each touched deal in its own transaction. Failures are
    /// logged per deal; the delivery's own committed transition stands.
    async fn refresh_deals(&self, deal_ids: &[Uuid]) {
        let deal_service = DealService::new(self.db.clone());
        for deal_id in deal_ids {
            if let Err(e) = deal_service.refresh_from_deliveries(*deal_id).await {
                tracing::error!("Failed to refresh deal {} after delivery transition: {}", deal_id, e);
            }
        }
    }

    /// Resolve input rows to full delivery rows with snapshotted pack weight
    async fn build_rows(&self, inputs: &[DeliveryItemInput]) -> AppResult<Vec<DeliveryItem>> {
        if inputs.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A delivery must have at least one row".to_string(),
                message_hi: "डिलीवरी में कम से कम एक पंक्ति होनी चाहिए".to_string(),
            });
        }

        let mut rows = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let pack_weight_kg = sqlx::query_scalar::<_, Decimal>(
                "SELECT weight_kg FROM pack_sizes WHERE name = $1",
            )
            .bind(&input.pack_size)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pack size '{}'", input.pack_size)))?;

            rows.push(DeliveryItem {
                id: Uuid::new_v4(),
                idx: (i + 1) as i32,
                deal_id: input.deal_id,
                deal_item_id: input.deal_item_id,
                item: input.item.clone(),
                pack_size: input.pack_size.clone(),
                pack_weight_kg,
                deliver_qty: input.deliver_qty,
                rate: input.rate,
                amount: Decimal::ZERO,
                is_extra: input.deal_id.is_none(),
            });
        }
        Ok(rows)
    }

    /// Validate rows in stored order; the first failing row aborts.
    ///
    /// `exclude_delivery` keeps the delivery's own submitted rows out of
    /// the already-delivered tally.
    async fn validate_rows(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        items: &[DeliveryItem],
        exclude_delivery: Option<Uuid>,
    ) -> AppResult<()> {
        for (i, row) in items.iter().enumerate() {
            let row_no = i + 1;

            if row.deliver_qty <= Decimal::ZERO {
                return Err(AppError::Validation {
                    field: format!("items[{}].deliver_qty", i),
                    message: format!("Row {}: delivery quantity must be greater than 0", row_no),
                    message_hi: format!("पंक्ति {}: मात्रा 0 से अधिक होनी चाहिए", row_no),
                });
            }

            let deal_id = match row.deal_id {
                None => {
                    // Extra rows only need item and pack size
                    if row.item.is_empty() || row.pack_size.is_empty() {
                        return Err(AppError::Validation {
                            field: format!("items[{}]", i),
                            message: format!(
                                "Row {}: extra rows require item and pack size",
                                row_no
                            ),
                            message_hi: format!(
                                "पंक्ति {}: अतिरिक्त पंक्ति में आइटम और पैक आकार आवश्यक हैं",
                                row_no
                            ),
                        });
                    }
                    continue;
                }
                Some(id) => id,
            };

            let deal_item_id = row.deal_item_id.ok_or_else(|| AppError::Validation {
                field: format!("items[{}].deal_item_id", i),
                message: format!("Row {}: deal rows must reference a deal item", row_no),
                message_hi: format!("पंक्ति {}: सौदा आइटम संदर्भ आवश्यक है", row_no),
            })?;

            let deal_status = sqlx::query_scalar::<_, String>(
                "SELECT status FROM deals WHERE id = $1",
            )
            .bind(deal_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError(format!("Row {}: referenced deal not found", row_no))
            })?;

            if deal_status == DealStatus::Cancelled.as_str() {
                return Err(AppError::ValidationError(format!(
                    "Row {}: cannot deliver against a cancelled deal",
                    row_no
                )));
            }

            let booked = sqlx::query_scalar::<_, Decimal>(
                "SELECT qty * pack_weight_kg FROM deal_items WHERE id = $1 AND deal_id = $2",
            )
            .bind(deal_item_id)
            .bind(deal_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Row {}: deal item does not belong to the referenced deal",
                    row_no
                ))
            })?;

            let other_delivered_kg = sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT COALESCE(SUM(dli.deliver_qty * dli.pack_weight_kg), 0)
                FROM delivery_items dli
                JOIN deliveries d ON d.id = dli.delivery_id
                WHERE dli.deal_item_id = $1
                  AND d.docstatus = 1
                  AND ($2::uuid IS NULL OR dli.delivery_id != $2)
                "#,
            )
            .bind(deal_item_id)
            .bind(exclude_delivery)
            .fetch_one(&mut **tx)
            .await?;

            check_delivery_capacity(booked, other_delivered_kg, row.deliver_kg()).map_err(
                |msg| AppError::ExceedsPendingCapacity(format!("Row {}: {}", row_no, msg)),
            )?;
        }

        Ok(())
    }

    async fn insert_rows(
        tx: &mut Transaction<'_, Postgres>,
        delivery_id: Uuid,
        items: &[DeliveryItem],
    ) -> AppResult<()> {
        for row in items {
            sqlx::query(
                r#"
                INSERT INTO delivery_items
                    (id, delivery_id, idx, deal_id, deal_item_id, item, pack_size,
                     pack_weight_kg, deliver_qty, rate, amount, is_extra)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(row.id)
            .bind(delivery_id)
            .bind(row.idx)
            .bind(row.deal_id)
            .bind(row.deal_item_id)
            .bind(&row.item)
            .bind(&row.pack_size)
            .bind(row.pack_weight_kg)
            .bind(row.deliver_qty)
            .bind(row.rate)
            .bind(row.amount)
            .bind(row.is_extra)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
