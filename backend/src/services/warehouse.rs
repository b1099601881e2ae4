//! Warehouse ranking and stock access
//!
//! The ranking decides which warehouse product orders draw from. It is always
//! read fresh inside the transaction that uses it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{dense_priorities, validate_priority_order, StockLevels, WarehousePriority, WarehouseStock};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Warehouse service for rankings and stock views
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Warehouse with its current rank
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseSummary {
    pub id: Uuid,
    pub name: String,
    pub is_favorite: bool,
    pub priority_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Stock of one ingredient in a warehouse
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockEntry {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub quantity_kg: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Input for replacing the ranking
#[derive(Debug, Deserialize)]
pub struct SetPrioritiesInput {
    /// Warehouse ids, first entry becomes priority 1
    pub ordered_warehouse_ids: Vec<Uuid>,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List warehouses, ranked ones first
    pub async fn list_warehouses(&self) -> AppResult<Vec<WarehouseSummary>> {
        let warehouses = sqlx::query_as::<_, WarehouseSummary>(
            r#"
            SELECT w.id, w.name, w.is_favorite, wp.priority_order, w.created_at
            FROM warehouses w
            LEFT JOIN warehouse_priorities wp ON wp.warehouse_id = w.id
            ORDER BY wp.priority_order ASC NULLS LAST, w.created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses)
    }

    /// Current ranking, priority 1 first
    pub async fn get_priorities(&self) -> AppResult<Vec<WarehousePriority>> {
        let rows = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT warehouse_id, priority_order FROM warehouse_priorities ORDER BY priority_order ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(warehouse_id, priority_order)| WarehousePriority {
                warehouse_id,
                priority_order,
            })
            .collect())
    }

    /// Replace the whole ranking with a dense 1..n ordering
    pub async fn set_priorities(&self, input: SetPrioritiesInput) -> AppResult<Vec<WarehousePriority>> {
        let ordered = input.ordered_warehouse_ids;
        validate_priority_order(&ordered)
            .map_err(|msg| AppError::invalid("ordered_warehouse_ids", msg))?;

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM warehouses WHERE id = ANY($1)")
            .bind(&ordered)
            .fetch_all(&mut *tx)
            .await?;

        if let Some(missing) = ordered.iter().find(|id| !existing.contains(id)) {
            return Err(AppError::NotFound(format!("Warehouse {}", missing)));
        }

        // Blocks while an apply holds the current priority-1 row
        sqlx::query("DELETE FROM warehouse_priorities")
            .execute(&mut *tx)
            .await?;

        let ranking = dense_priorities(&ordered);
        for priority in &ranking {
            sqlx::query(
                "INSERT INTO warehouse_priorities (warehouse_id, priority_order) VALUES ($1, $2)",
            )
            .bind(priority.warehouse_id)
            .bind(priority.priority_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Warehouse ranking replaced with {} entries", ranking.len());

        Ok(ranking)
    }

    /// Stock held by one warehouse
    pub async fn get_stock(&self, warehouse_id: Uuid) -> AppResult<Vec<StockEntry>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let stock = sqlx::query_as::<_, StockEntry>(
            r#"
            SELECT ws.ingredient_id, i.name AS ingredient_name, ws.quantity_kg, ws.updated_at
            FROM warehouse_stock ws
            JOIN ingredients i ON i.id = ws.ingredient_id
            WHERE ws.warehouse_id = $1
            ORDER BY i.name ASC
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(stock)
    }
}

/// Warehouse currently ranked first.
///
/// With `hold` set the ranking row is share-locked until the transaction ends,
/// so the ranking cannot be replaced underneath an apply.
pub async fn top_priority_warehouse(conn: &mut PgConnection, hold: bool) -> AppResult<Option<Uuid>> {
    let sql = if hold {
        "SELECT warehouse_id FROM warehouse_priorities ORDER BY priority_order ASC LIMIT 1 FOR SHARE"
    } else {
        "SELECT warehouse_id FROM warehouse_priorities ORDER BY priority_order ASC LIMIT 1"
    };

    let top = sqlx::query_scalar::<_, Uuid>(sql)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(top)
}

/// Lock and read stock of the given ingredients at one warehouse.
///
/// Rows are locked in ingredient order in a single statement, so every value
/// comes from one snapshot and concurrent applies lock in the same order.
/// Ingredients without a row are absent from the map.
pub async fn lock_stock(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    ingredient_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Decimal>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"
        SELECT ingredient_id, quantity_kg
        FROM warehouse_stock
        WHERE warehouse_id = $1 AND ingredient_id = ANY($2)
        ORDER BY ingredient_id
        FOR UPDATE
        "#,
    )
    .bind(warehouse_id)
    .bind(ingredient_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Read stock of the given ingredients across every warehouse
pub async fn load_stock_levels(
    conn: &mut PgConnection,
    top_warehouse_id: Uuid,
    ingredient_ids: &[Uuid],
) -> AppResult<StockLevels> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
        r#"
        SELECT warehouse_id, ingredient_id, quantity_kg
        FROM warehouse_stock
        WHERE ingredient_id = ANY($1)
        "#,
    )
    .bind(ingredient_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(StockLevels::from_rows(
        top_warehouse_id,
        rows.into_iter().map(|(warehouse_id, ingredient_id, quantity_kg)| WarehouseStock {
            warehouse_id,
            ingredient_id,
            quantity_kg,
        }),
    ))
}
