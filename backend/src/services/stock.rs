//! Warehouse stock entry service
//!
//! Records inward and outward stock movements. A submitted delivery can be
//! bridged into an Issue entry keyed by the delivery's rows aggregated by
//! (item, pack size).

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::delivery::DeliveryService;
use shared::models::{
    compute_stock_totals, find_duplicate_pack_row, Docstatus, StockEntry, StockEntryItem,
    StockEntryType,
};

/// Stock entry service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Database row for a stock entry header
#[derive(Debug, Clone, sqlx::FromRow)]
struct StockEntryRow {
    pub id: Uuid,
    pub posting_date: NaiveDate,
    pub entry_type: String,
    pub warehouse: String,
    pub delivery_id: Option<Uuid>,
    pub docstatus: i16,
    pub total_qty: Decimal,
    pub total_kg: Decimal,
    pub total_items: i32,
    pub remarks: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

/// Database row for a stock entry item
#[derive(Debug, Clone, sqlx::FromRow)]
struct StockEntryItemRow {
    pub id: Uuid,
    pub idx: i32,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub qty: Decimal,
    pub kg: Decimal,
}

impl StockEntryRow {
    fn into_entry(self, items: Vec<StockEntryItem>) -> AppResult<StockEntry> {
        let entry_type = StockEntryType::parse(&self.entry_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown stock entry type '{}'", self.entry_type))
        })?;
        let docstatus = Docstatus::from_i16(self.docstatus)
            .ok_or_else(|| AppError::Internal(format!("Unknown docstatus {}", self.docstatus)))?;
        Ok(StockEntry {
            id: self.id,
            posting_date: self.posting_date,
            entry_type,
            warehouse: self.warehouse,
            delivery_id: self.delivery_id,
            docstatus,
            items,
            total_qty: self.total_qty,
            total_kg: self.total_kg,
            total_items: self.total_items,
            remarks: self.remarks,
            created_at: self.created_at,
        })
    }
}

impl From<StockEntryItemRow> for StockEntryItem {
    fn from(row: StockEntryItemRow) -> Self {
        StockEntryItem {
            id: row.id,
            idx: row.idx,
            item: row.item,
            pack_size: row.pack_size,
            pack_weight_kg: row.pack_weight_kg,
            qty: row.qty,
            kg: row.kg,
        }
    }
}

/// Input for one stock entry row
#[derive(Debug, Deserialize)]
pub struct StockEntryItemInput {
    pub item: String,
    pub pack_size: String,
    pub qty: Decimal,
}

/// Input for creating a stock entry
#[derive(Debug, Deserialize)]
pub struct CreateStockEntryInput {
    pub posting_date: NaiveDate,
    pub entry_type: StockEntryType,
    pub warehouse: String,
    pub remarks: Option<String>,
    pub items: Vec<StockEntryItemInput>,
}

/// Current balance for one (warehouse, item, pack_size) key
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockBalance {
    pub warehouse: String,
    pub item: String,
    pub pack_size: String,
    pub balance_qty: Decimal,
    pub balance_kg: Decimal,
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List stock entries, optionally filtered by warehouse
    pub async fn list_entries(&self, warehouse: Option<&str>) -> AppResult<Vec<StockEntry>> {
        let rows = sqlx::query_as::<_, StockEntryRow>(
            r#"
            SELECT id, posting_date, entry_type, warehouse, delivery_id, docstatus,
                   total_qty, total_kg, total_items, remarks, created_at
            FROM stock_entries
            WHERE ($1::text IS NULL OR warehouse = $1)
            ORDER BY posting_date DESC, created_at DESC
            "#,
        )
        .bind(warehouse)
        .fetch_all(&self.db)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(row.id).await?;
            entries.push(row.into_entry(items)?);
        }
        Ok(entries)
    }

    /// Get a stock entry with its rows
    pub async fn get_entry(&self, entry_id: Uuid) -> AppResult<StockEntry> {
        let row = sqlx::query_as::<_, StockEntryRow>(
            r#"
            SELECT id, posting_date, entry_type, warehouse, delivery_id, docstatus,
                   total_qty, total_kg, total_items, remarks, created_at
            FROM stock_entries
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock entry".to_string()))?;

        let items = self.load_items(entry_id).await?;
        row.into_entry(items)
    }

    async fn load_items(&self, entry_id: Uuid) -> AppResult<Vec<StockEntryItem>> {
        let rows = sqlx::query_as::<_, StockEntryItemRow>(
            r#"
            SELECT id, idx, item, pack_size, pack_weight_kg, qty, kg
            FROM stock_entry_items
            WHERE stock_entry_id = $1
            ORDER BY idx ASC
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockEntryItem::from).collect())
    }

    /// Create a stock entry in Draft
    pub async fn create_entry(&self, input: CreateStockEntryInput) -> AppResult<StockEntry> {
        let mut items = self.build_rows(&input.items).await?;

        // (item, pack_size) must be unique within one entry
        if let Some((i, row)) = find_duplicate_pack_row(&items) {
            return Err(AppError::Validation {
                field: format!("items[{}]", i),
                message: format!(
                    "Row {}: duplicate item/pack size ({} / {})",
                    i + 1,
                    row.item,
                    row.pack_size
                ),
                message_hi: format!("पंक्ति {}: आइटम/पैक आकार दोहराया गया है", i + 1),
            });
        }

        let totals = compute_stock_totals(&mut items);

        let mut tx = self.db.begin().await?;
        let entry_id = Self::insert_entry(
            &mut tx,
            input.posting_date,
            input.entry_type,
            &input.warehouse,
            None,
            input.remarks.as_deref(),
            &items,
            totals.total_qty,
            totals.total_kg,
            totals.total_items,
        )
        .await?;
        tx.commit().await?;

        self.get_entry(entry_id).await
    }

    /// Create and submit an Issue entry from a submitted delivery's rows,
    /// aggregated by (item, pack size). Idempotent per delivery: if an
    /// active entry already exists for it, that entry is returned.
    pub async fn create_issue_from_delivery(
        &self,
        delivery_id: Uuid,
        warehouse: &str,
        posting_date: NaiveDate,
    ) -> AppResult<StockEntry> {
        let delivery_service = DeliveryService::new(self.db.clone());
        let delivery = delivery_service.get_delivery(delivery_id).await?;
        if !delivery.docstatus.is_submitted() {
            return Err(AppError::InvalidStateTransition(
                "Stock can only be issued for a Submitted delivery".to_string(),
            ));
        }

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM stock_entries WHERE delivery_id = $1 AND docstatus != 2",
        )
        .bind(delivery_id)
        .fetch_optional(&self.db)
        .await?;
        if let Some(entry_id) = existing {
            return self.get_entry(entry_id).await;
        }

        let lines = delivery_service.aggregated_lines(delivery_id).await?;
        let mut items: Vec<StockEntryItem> = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| StockEntryItem {
                id: Uuid::new_v4(),
                idx: (i + 1) as i32,
                item: line.item,
                pack_size: line.pack_size,
                pack_weight_kg: line.pack_weight_kg,
                qty: line.qty,
                kg: Decimal::ZERO,
            })
            .collect();
        let totals = compute_stock_totals(&mut items);

        // Issuing below the current balance is allowed but logged
        let balances = self.balances(Some(warehouse), None, None).await?;
        for row in &items {
            let available = balances
                .iter()
                .find(|b| b.item == row.item && b.pack_size == row.pack_size)
                .map(|b| b.balance_qty)
                .unwrap_or(Decimal::ZERO);
            if row.qty > available {
                tracing::warn!(
                    delivery_id = %delivery_id,
                    item = %row.item,
                    pack_size = %row.pack_size,
                    qty = %row.qty,
                    available = %available,
                    "stock issue exceeds current balance"
                );
            }
        }

        let mut tx = self.db.begin().await?;
        let entry_id = Self::insert_entry(
            &mut tx,
            posting_date,
            StockEntryType::Issue,
            warehouse,
            Some(delivery_id),
            Some(&format!("Issued against delivery {}", delivery_id)),
            &items,
            totals.total_qty,
            totals.total_kg,
            totals.total_items,
        )
        .await?;

        sqlx::query("UPDATE stock_entries SET docstatus = $1 WHERE id = $2")
            .bind(Docstatus::Submitted.as_i16())
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.get_entry(entry_id).await
    }

    /// Submit a Draft stock entry
    pub async fn submit_entry(&self, entry_id: Uuid) -> AppResult<StockEntry> {
        let entry = self.get_entry(entry_id).await?;
        if !entry.docstatus.is_draft() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Draft stock entry can be submitted (current: {})",
                entry.docstatus
            )));
        }

        sqlx::query("UPDATE stock_entries SET docstatus = $1 WHERE id = $2")
            .bind(Docstatus::Submitted.as_i16())
            .bind(entry_id)
            .execute(&self.db)
            .await?;

        self.get_entry(entry_id).await
    }

    /// Cancel a Submitted stock entry
    pub async fn cancel_entry(&self, entry_id: Uuid) -> AppResult<StockEntry> {
        let entry = self.get_entry(entry_id).await?;
        if !entry.docstatus.is_submitted() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Submitted stock entry can be cancelled (current: {})",
                entry.docstatus
            )));
        }

        sqlx::query("UPDATE stock_entries SET docstatus = $1 WHERE id = $2")
            .bind(Docstatus::Cancelled.as_i16())
            .bind(entry_id)
            .execute(&self.db)
            .await?;

        self.get_entry(entry_id).await
    }

    /// Current balances per (warehouse, item, pack_size) over submitted
    /// entries; inward types add, outward types subtract
    pub async fn balances(
        &self,
        warehouse: Option<&str>,
        item: Option<&str>,
        pack_size: Option<&str>,
    ) -> AppResult<Vec<StockBalance>> {
        let rows = sqlx::query_as::<_, StockBalance>(
            r#"
            SELECT se.warehouse, si.item, si.pack_size,
                   SUM(CASE WHEN se.entry_type IN ('Opening Stock', 'Receipt', 'Adjustment (Increase)')
                            THEN si.qty ELSE -si.qty END) AS balance_qty,
                   SUM(CASE WHEN se.entry_type IN ('Opening Stock', 'Receipt', 'Adjustment (Increase)')
                            THEN si.kg ELSE -si.kg END) AS balance_kg
            FROM stock_entry_items si
            JOIN stock_entries se ON se.id = si.stock_entry_id
            WHERE se.docstatus = 1
              AND ($1::text IS NULL OR se.warehouse = $1)
              AND ($2::text IS NULL OR si.item = $2)
              AND ($3::text IS NULL OR si.pack_size = $3)
            GROUP BY se.warehouse, si.item, si.pack_size
            ORDER BY se.warehouse, si.item, si.pack_size
            "#,
        )
        .bind(warehouse)
        .bind(item)
        .bind(pack_size)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn build_rows(&self, inputs: &[StockEntryItemInput]) -> AppResult<Vec<StockEntryItem>> {
        if inputs.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A stock entry must have at least one row".to_string(),
                message_hi: "स्टॉक प्रविष्टि में कम से कम एक पंक्ति होनी चाहिए".to_string(),
            });
        }

        let mut rows = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            if input.qty <= Decimal::ZERO {
                return Err(AppError::Validation {
                    field: format!("items[{}].qty", i),
                    message: format!("Row {}: quantity must be greater than 0", i + 1),
                    message_hi: format!("पंक्ति {}: मात्रा 0 से अधिक होनी चाहिए", i + 1),
                });
            }

            let pack_weight_kg = sqlx::query_scalar::<_, Decimal>(
                "SELECT weight_kg FROM pack_sizes WHERE name = $1",
            )
            .bind(&input.pack_size)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pack size '{}'", input.pack_size)))?;

            rows.push(StockEntryItem {
                id: Uuid::new_v4(),
                idx: (i + 1) as i32,
                item: input.item.clone(),
                pack_size: input.pack_size.clone(),
                pack_weight_kg,
                qty: input.qty,
                kg: Decimal::ZERO,
            });
        }
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        posting_date: NaiveDate,
        entry_type: StockEntryType,
        warehouse: &str,
        delivery_id: Option<Uuid>,
        remarks: Option<&str>,
        items: &[StockEntryItem],
        total_qty: Decimal,
        total_kg: Decimal,
        total_items: i32,
    ) -> AppResult<Uuid> {
        let entry_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_entries
                (posting_date, entry_type, warehouse, delivery_id, docstatus,
                 total_qty, total_kg, total_items, remarks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(posting_date)
        .bind(entry_type.as_str())
        .bind(warehouse)
        .bind(delivery_id)
        .bind(Docstatus::Draft.as_i16())
        .bind(total_qty)
        .bind(total_kg)
        .bind(total_items)
        .bind(remarks)
        .fetch_one(&mut **tx)
        .await?;

        for row in items {
            sqlx::query(
                r#"
                INSERT INTO stock_entry_items
                    (id, stock_entry_id, idx, item, pack_size, pack_weight_kg, qty, kg)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(row.id)
            .bind(entry_id)
            .bind(row.idx)
            .bind(&row.item)
            .bind(&row.pack_size)
            .bind(row.pack_weight_kg)
            .bind(row.qty)
            .bind(row.kg)
            .execute(&mut **tx)
            .await?;
        }

        Ok(entry_id)
    }
}
