//! Vehicle dispatch service
//!
//! Consolidates submitted deliveries onto a truck. Loading beyond the
//! vehicle capacity is allowed but reported as a warning.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{
    compute_dispatch_totals, is_over_capacity, DispatchStatus, Docstatus, VehicleDispatch,
    VehicleDispatchItem,
};
use shared::validation::validate_vehicle_number;

/// Vehicle dispatch service
#[derive(Clone)]
pub struct DispatchService {
    db: PgPool,
}

/// Database row for a dispatch header
#[derive(Debug, Clone, sqlx::FromRow)]
struct DispatchRow {
    pub id: Uuid,
    pub dispatch_date: NaiveDate,
    pub vehicle_number: String,
    pub vehicle_capacity_kg: Decimal,
    pub docstatus: i16,
    pub total_loaded_kg: Decimal,
    pub total_packs: Decimal,
    pub total_amount: Decimal,
    pub total_customers: i32,
    pub remaining_capacity_kg: Decimal,
    pub capacity_utilization: Decimal,
    pub created_at: chrono::DateTime<Utc>,
}

/// Database row for a loaded delivery
#[derive(Debug, Clone, sqlx::FromRow)]
struct DispatchItemRow {
    pub id: Uuid,
    pub idx: i32,
    pub delivery_id: Uuid,
    pub customer: String,
    pub total_kg: Decimal,
    pub total_packs: Decimal,
    pub total_amount: Decimal,
}

impl DispatchRow {
    fn into_dispatch(self, deliveries: Vec<VehicleDispatchItem>) -> AppResult<VehicleDispatch> {
        let docstatus = Docstatus::from_i16(self.docstatus)
            .ok_or_else(|| AppError::Internal(format!("Unknown docstatus {}", self.docstatus)))?;
        Ok(VehicleDispatch {
            id: self.id,
            dispatch_date: self.dispatch_date,
            vehicle_number: self.vehicle_number,
            vehicle_capacity_kg: self.vehicle_capacity_kg,
            docstatus,
            status: DispatchStatus::from_docstatus(docstatus),
            deliveries,
            total_loaded_kg: self.total_loaded_kg,
            total_packs: self.total_packs,
            total_amount: self.total_amount,
            total_customers: self.total_customers,
            remaining_capacity_kg: self.remaining_capacity_kg,
            capacity_utilization: self.capacity_utilization,
            created_at: self.created_at,
        })
    }
}

impl From<DispatchItemRow> for VehicleDispatchItem {
    fn from(row: DispatchItemRow) -> Self {
        VehicleDispatchItem {
            id: row.id,
            idx: row.idx,
            delivery_id: row.delivery_id,
            customer: row.customer,
            total_kg: row.total_kg,
            total_packs: row.total_packs,
            total_amount: row.total_amount,
        }
    }
}

/// Input for creating a dispatch
#[derive(Debug, Deserialize)]
pub struct CreateDispatchInput {
    pub dispatch_date: NaiveDate,
    pub vehicle_number: String,
    pub vehicle_capacity_kg: Decimal,
    pub delivery_ids: Vec<Uuid>,
}

/// Submitted delivery not yet loaded on any active dispatch
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UndispatchedDelivery {
    pub id: Uuid,
    pub customer: String,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub total_delivery_qty: Decimal,
    pub total_delivery_kg: Decimal,
    pub total_amount: Decimal,
}

/// Creation result carrying the over-capacity warning, if any
#[derive(Debug, Serialize)]
pub struct DispatchWithWarning {
    #[serde(flatten)]
    pub dispatch: VehicleDispatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DispatchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List dispatches
    pub async fn list_dispatches(&self) -> AppResult<Vec<VehicleDispatch>> {
        let rows = sqlx::query_as::<_, DispatchRow>(
            r#"
            SELECT id, dispatch_date, vehicle_number, vehicle_capacity_kg, docstatus,
                   total_loaded_kg, total_packs, total_amount, total_customers,
                   remaining_capacity_kg, capacity_utilization, created_at
            FROM vehicle_dispatches
            ORDER BY dispatch_date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut dispatches = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(row.id).await?;
            dispatches.push(row.into_dispatch(items)?);
        }
        Ok(dispatches)
    }

    /// Get a dispatch with its loaded deliveries
    pub async fn get_dispatch(&self, dispatch_id: Uuid) -> AppResult<VehicleDispatch> {
        let row = sqlx::query_as::<_, DispatchRow>(
            r#"
            SELECT id, dispatch_date, vehicle_number, vehicle_capacity_kg, docstatus,
                   total_loaded_kg, total_packs, total_amount, total_customers,
                   remaining_capacity_kg, capacity_utilization, created_at
            FROM vehicle_dispatches
            WHERE id = $1
            "#,
        )
        .bind(dispatch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle dispatch".to_string()))?;

        let items = self.load_items(dispatch_id).await?;
        row.into_dispatch(items)
    }

    async fn load_items(&self, dispatch_id: Uuid) -> AppResult<Vec<VehicleDispatchItem>> {
        let rows = sqlx::query_as::<_, DispatchItemRow>(
            r#"
            SELECT id, idx, delivery_id, customer, total_kg, total_packs, total_amount
            FROM vehicle_dispatch_items
            WHERE dispatch_id = $1
            ORDER BY idx ASC
            "#,
        )
        .bind(dispatch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(VehicleDispatchItem::from).collect())
    }

    /// Create a dispatch from submitted deliveries
    pub async fn create_dispatch(
        &self,
        input: CreateDispatchInput,
    ) -> AppResult<DispatchWithWarning> {
        validate_vehicle_number(&input.vehicle_number).map_err(|msg| AppError::Validation {
            field: "vehicle_number".to_string(),
            message: msg.to_string(),
            message_hi: "वाहन नंबर अमान्य है".to_string(),
        })?;

        if input.vehicle_capacity_kg <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "vehicle_capacity_kg".to_string(),
                message: "Vehicle capacity must be greater than 0".to_string(),
                message_hi: "वाहन क्षमता 0 से अधिक होनी चाहिए".to_string(),
            });
        }
        if input.delivery_ids.is_empty() {
            return Err(AppError::Validation {
                field: "delivery_ids".to_string(),
                message: "A dispatch must load at least one delivery".to_string(),
                message_hi: "डिस्पैच में कम से कम एक डिलीवरी होनी चाहिए".to_string(),
            });
        }
        for (i, delivery_id) in input.delivery_ids.iter().enumerate() {
            if input.delivery_ids[..i].contains(delivery_id) {
                return Err(AppError::ValidationError(format!(
                    "Row {}: delivery {} is listed more than once",
                    i + 1,
                    delivery_id
                )));
            }
        }

        // Only submitted deliveries not already on an active dispatch can be loaded
        let mut loaded = Vec::with_capacity(input.delivery_ids.len());
        for (i, delivery_id) in input.delivery_ids.iter().enumerate() {
            let row = sqlx::query_as::<_, (String, i16, Decimal, Decimal, Decimal)>(
                r#"
                SELECT customer, docstatus, total_delivery_kg, total_delivery_qty, total_amount
                FROM deliveries
                WHERE id = $1
                "#,
            )
            .bind(delivery_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Delivery".to_string()))?;

            let (customer, docstatus, total_kg, total_packs, total_amount) = row;
            if Docstatus::from_i16(docstatus) != Some(Docstatus::Submitted) {
                return Err(AppError::ValidationError(format!(
                    "Row {}: only Submitted deliveries can be dispatched",
                    i + 1
                )));
            }

            let already_dispatched = sqlx::query_scalar::<_, Uuid>(
                r#"
                SELECT vd.id
                FROM vehicle_dispatch_items vdi
                JOIN vehicle_dispatches vd ON vd.id = vdi.dispatch_id
                WHERE vdi.delivery_id = $1 AND vd.docstatus != 2
                LIMIT 1
                "#,
            )
            .bind(delivery_id)
            .fetch_optional(&self.db)
            .await?;
            if let Some(dispatch_id) = already_dispatched {
                return Err(AppError::ValidationError(format!(
                    "Row {}: delivery {} is already on dispatch {}",
                    i + 1,
                    delivery_id,
                    dispatch_id
                )));
            }

            loaded.push(VehicleDispatchItem {
                id: Uuid::new_v4(),
                idx: (i + 1) as i32,
                delivery_id: *delivery_id,
                customer,
                total_kg,
                total_packs,
                total_amount,
            });
        }

        let totals = compute_dispatch_totals(&loaded, input.vehicle_capacity_kg);
        let warning = if is_over_capacity(totals.total_loaded_kg, input.vehicle_capacity_kg) {
            Some(format!(
                "Loaded {} KG exceeds vehicle capacity of {} KG",
                totals.total_loaded_kg, input.vehicle_capacity_kg
            ))
        } else {
            None
        };

        let mut tx = self.db.begin().await?;
        let dispatch_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO vehicle_dispatches
                (dispatch_date, vehicle_number, vehicle_capacity_kg, docstatus,
                 total_loaded_kg, total_packs, total_amount, total_customers,
                 remaining_capacity_kg, capacity_utilization)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(input.dispatch_date)
        .bind(&input.vehicle_number)
        .bind(input.vehicle_capacity_kg)
        .bind(Docstatus::Draft.as_i16())
        .bind(totals.total_loaded_kg)
        .bind(totals.total_packs)
        .bind(totals.total_amount)
        .bind(totals.total_customers)
        .bind(totals.remaining_capacity_kg)
        .bind(totals.capacity_utilization)
        .fetch_one(&mut *tx)
        .await?;

        for row in &loaded {
            sqlx::query(
                r#"
                INSERT INTO vehicle_dispatch_items
                    (id, dispatch_id, idx, delivery_id, customer, total_kg, total_packs, total_amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(row.id)
            .bind(dispatch_id)
            .bind(row.idx)
            .bind(row.delivery_id)
            .bind(&row.customer)
            .bind(row.total_kg)
            .bind(row.total_packs)
            .bind(row.total_amount)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(DispatchWithWarning {
            dispatch: self.get_dispatch(dispatch_id).await?,
            warning,
        })
    }

    /// Submitted deliveries not yet loaded on any active dispatch
    pub async fn undispatched_deliveries(&self) -> AppResult<Vec<UndispatchedDelivery>> {
        let rows = sqlx::query_as::<_, UndispatchedDelivery>(
            r#"
            SELECT d.id, d.customer, d.customer_name, d.delivery_date,
                   d.total_delivery_qty, d.total_delivery_kg, d.total_amount
            FROM deliveries d
            WHERE d.docstatus = 1
              AND NOT EXISTS (
                  SELECT 1
                  FROM vehicle_dispatch_items vdi
                  JOIN vehicle_dispatches vd ON vd.id = vdi.dispatch_id
                  WHERE vdi.delivery_id = d.id AND vd.docstatus != 2
              )
            ORDER BY d.delivery_date ASC, d.created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Submit a dispatch (truck leaves the yard)
    pub async fn submit_dispatch(&self, dispatch_id: Uuid) -> AppResult<VehicleDispatch> {
        let dispatch = self.get_dispatch(dispatch_id).await?;
        if !dispatch.docstatus.is_draft() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Loading dispatch can be submitted (current: {})",
                dispatch.status.as_str()
            )));
        }

        sqlx::query("UPDATE vehicle_dispatches SET docstatus = $1 WHERE id = $2")
            .bind(Docstatus::Submitted.as_i16())
            .bind(dispatch_id)
            .execute(&self.db)
            .await?;

        self.get_dispatch(dispatch_id).await
    }

    /// Cancel a dispatched vehicle
    pub async fn cancel_dispatch(&self, dispatch_id: Uuid) -> AppResult<VehicleDispatch> {
        let dispatch = self.get_dispatch(dispatch_id).await?;
        if !dispatch.docstatus.is_submitted() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only a Dispatched vehicle can be cancelled (current: {})",
                dispatch.status.as_str()
            )));
        }

        sqlx::query("UPDATE vehicle_dispatches SET docstatus = $1 WHERE id = $2")
            .bind(Docstatus::Cancelled.as_i16())
            .bind(dispatch_id)
            .execute(&self.db)
            .await?;

        self.get_dispatch(dispatch_id).await
    }
}
