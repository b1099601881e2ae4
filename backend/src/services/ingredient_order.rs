//! Ingredient purchase order service
//!
//! A purchase order names a target warehouse and a list of raw materials. Unit
//! costs are frozen from the catalog when the lines are written; applying the
//! order adds every line to the target warehouse's stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    checked_add, checked_sum, ensure_applicable, plan_receipts, round_quantity, validate_ingredient_lines, validate_title,
    validate_writer, IngredientLine, IngredientOrderLine, OrderType, StockReceipt,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::order::{list_orders_of_type, lock_order, mark_applied, Order};
use crate::services::{begin_with_lock_timeout, catalog};

/// Ingredient order service
#[derive(Clone)]
pub struct IngredientOrderService {
    db: PgPool,
    lock_timeout_ms: u64,
}

/// Purchase line with display names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngredientItemView {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity_kg: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

/// Full ingredient order
#[derive(Debug, Clone, Serialize)]
pub struct IngredientOrderDetail {
    pub order: Order,
    pub items: Vec<IngredientItemView>,
    pub total_cost: Decimal,
}

/// Input for creating an ingredient order
#[derive(Debug, Deserialize)]
pub struct CreateIngredientOrderInput {
    pub title: String,
    pub writer: Option<String>,
    pub warehouse_id: Uuid,
    pub items: Vec<IngredientLine>,
}

/// Input for editing an ingredient order
#[derive(Debug, Deserialize)]
pub struct UpdateIngredientOrderInput {
    pub title: String,
    pub warehouse_id: Uuid,
    pub items: Vec<IngredientLine>,
}

/// Result of applying an ingredient order
#[derive(Debug, Clone, Serialize)]
pub struct IngredientApplyOutcome {
    pub order_id: Uuid,
    pub applied: bool,
    pub receipts: Vec<StockReceipt>,
}

impl IngredientOrderService {
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self { db, lock_timeout_ms }
    }

    /// Create an ingredient order with unit costs frozen from the catalog
    pub async fn create_order(
        &self,
        writer: &str,
        input: CreateIngredientOrderInput,
    ) -> AppResult<IngredientOrderDetail> {
        let writer = input.writer.as_deref().unwrap_or(writer).trim().to_string();
        let lines = normalize_lines(input.items);
        validate_input(&input.title, &lines)?;
        validate_writer(&writer).map_err(|msg| AppError::invalid("writer", msg))?;

        let mut tx = self.db.begin().await?;

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (title, writer, order_type)
            VALUES ($1, $2, 'ingredient')
            RETURNING id
            "#,
        )
        .bind(input.title.trim())
        .bind(&writer)
        .fetch_one(&mut *tx)
        .await?;

        let total_cost = write_lines(&mut tx, order_id, input.warehouse_id, &lines).await?;

        tx.commit().await?;

        tracing::info!(
            "Created ingredient order {} for warehouse {} with {} line(s), total cost {}",
            order_id,
            input.warehouse_id,
            lines.len(),
            total_cost
        );

        self.get_order(order_id).await
    }

    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        list_orders_of_type(&self.db, OrderType::Ingredient).await
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<IngredientOrderDetail> {
        let order = crate::services::order::fetch_order(&self.db, order_id)
            .await?
            .filter(|o| o.order_type == OrderType::Ingredient)
            .ok_or_else(|| AppError::NotFound("Ingredient order".to_string()))?;

        let items = sqlx::query_as::<_, IngredientItemView>(
            r#"
            SELECT oi.id, oi.ingredient_id, i.name AS ingredient_name,
                   oi.warehouse_id, w.name AS warehouse_name,
                   oi.quantity_kg, oi.unit_cost, oi.total_cost
            FROM order_ingredient_items oi
            JOIN ingredients i ON i.id = oi.ingredient_id
            JOIN warehouses w ON w.id = oi.warehouse_id
            WHERE oi.order_id = $1
            ORDER BY oi.line_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let total_cost = checked_sum(items.iter().map(|i| i.total_cost))?;

        Ok(IngredientOrderDetail {
            order,
            items,
            total_cost,
        })
    }

    /// Replace the lines of an unapplied ingredient order, re-freezing costs
    pub async fn update_order(
        &self,
        order_id: Uuid,
        input: UpdateIngredientOrderInput,
    ) -> AppResult<IngredientOrderDetail> {
        let lines = normalize_lines(input.items);
        validate_input(&input.title, &lines)?;

        let mut tx = begin_with_lock_timeout(&self.db, self.lock_timeout_ms).await?;

        let order = lock_order(&mut tx, order_id).await?;
        ensure_applicable(OrderType::Ingredient, order.order_type, order.is_applied)?;

        sqlx::query("UPDATE orders SET title = $1, updated_at = NOW() WHERE id = $2")
            .bind(input.title.trim())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM order_ingredient_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        write_lines(&mut tx, order_id, input.warehouse_id, &lines).await?;

        tx.commit().await?;

        tracing::info!("Updated ingredient order {}", order_id);

        self.get_order(order_id).await
    }

    pub async fn delete_order(&self, order_id: Uuid) -> AppResult<()> {
        let mut tx = begin_with_lock_timeout(&self.db, self.lock_timeout_ms).await?;

        let order = lock_order(&mut tx, order_id).await?;
        ensure_applicable(OrderType::Ingredient, order.order_type, order.is_applied)?;

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Deleted ingredient order {}", order_id);

        Ok(())
    }

    /// Add every purchase line to its target warehouse's stock.
    ///
    /// Missing stock rows are created. The order row lock makes a second apply
    /// of the same order fail with AlreadyApplied.
    pub async fn apply_order(&self, order_id: Uuid) -> AppResult<IngredientApplyOutcome> {
        let mut tx = begin_with_lock_timeout(&self.db, self.lock_timeout_ms).await?;

        let order = lock_order(&mut tx, order_id).await?;
        ensure_applicable(OrderType::Ingredient, order.order_type, order.is_applied)?;

        let lines = load_lines(&mut tx, order_id).await?;
        let receipts = plan_receipts(&lines)?;

        for receipt in &receipts {
            sqlx::query(
                r#"
                INSERT INTO warehouse_stock (warehouse_id, ingredient_id, quantity_kg)
                VALUES ($1, $2, $3)
                ON CONFLICT (warehouse_id, ingredient_id) DO UPDATE
                SET quantity_kg = warehouse_stock.quantity_kg + EXCLUDED.quantity_kg,
                    updated_at = NOW()
                "#,
            )
            .bind(receipt.warehouse_id)
            .bind(receipt.ingredient_id)
            .bind(receipt.quantity_kg)
            .execute(&mut *tx)
            .await?;
        }

        mark_applied(&mut tx, order_id).await?;

        tx.commit().await?;

        tracing::info!(
            "Applied ingredient order {} ({} stock row(s) increased)",
            order_id,
            receipts.len()
        );

        Ok(IngredientApplyOutcome {
            order_id,
            applied: true,
            receipts,
        })
    }
}

fn normalize_lines(lines: Vec<IngredientLine>) -> Vec<IngredientLine> {
    lines
        .into_iter()
        .map(|line| IngredientLine {
            quantity_kg: round_quantity(line.quantity_kg),
            ..line
        })
        .collect()
}

fn validate_input(title: &str, lines: &[IngredientLine]) -> AppResult<()> {
    validate_title(title).map_err(|msg| AppError::invalid("title", msg))?;
    validate_ingredient_lines(lines).map_err(|msg| AppError::invalid("items", msg))?;
    Ok(())
}

/// Freeze and insert purchase lines; returns the order total
async fn write_lines(
    conn: &mut PgConnection,
    order_id: Uuid,
    warehouse_id: Uuid,
    lines: &[IngredientLine],
) -> AppResult<Decimal> {
    let warehouse_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&mut *conn)
            .await?;

    if !warehouse_exists {
        return Err(AppError::NotFound(format!("Warehouse {}", warehouse_id)));
    }

    let ingredient_ids = catalog::distinct_ids(lines.iter().map(|l| l.ingredient_id));
    let ingredients = catalog::require_ingredients(conn, &ingredient_ids).await?;

    let mut total_cost = Decimal::ZERO;
    for (line_no, line) in lines.iter().enumerate() {
        let unit_cost = ingredients
            .get(&line.ingredient_id)
            .map(|i| i.effective_unit_cost())
            .ok_or_else(|| AppError::NotFound(format!("Ingredient {}", line.ingredient_id)))?;
        let frozen = IngredientOrderLine::freeze(line, warehouse_id, unit_cost)?;

        sqlx::query(
            r#"
            INSERT INTO order_ingredient_items (
                order_id, ingredient_id, warehouse_id, quantity_kg, unit_cost, total_cost, line_no
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order_id)
        .bind(frozen.ingredient_id)
        .bind(frozen.warehouse_id)
        .bind(frozen.quantity_kg)
        .bind(frozen.unit_cost)
        .bind(frozen.total_cost)
        .bind(line_no as i32)
        .execute(&mut *conn)
        .await?;

        total_cost = checked_add(total_cost, frozen.total_cost)?;
    }

    Ok(total_cost)
}

async fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<IngredientOrderLine>> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Decimal, Decimal)>(
        r#"
        SELECT ingredient_id, warehouse_id, quantity_kg, unit_cost, total_cost
        FROM order_ingredient_items
        WHERE order_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(ingredient_id, warehouse_id, quantity_kg, unit_cost, total_cost)| IngredientOrderLine {
                ingredient_id,
                warehouse_id,
                quantity_kg,
                unit_cost,
                total_cost,
            },
        )
        .collect())
}
