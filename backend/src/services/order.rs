//! Product order service
//!
//! Creating an order freezes each product line's recipe and ingredient costs
//! into snapshot rows plus an ingredient summary. Applying an order deducts the
//! snapshot's requirements from the priority-1 warehouse, all or nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    checked_sum, ensure_applicable, order_total_cost, plan_deductions, required_by_ingredient, round_quantity,
    snapshot_order, validate_order_lines, validate_title, validate_writer, ApplyError, OrderLine,
    OrderType, Recipe, SnapshotRow, StockDeduction,
};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{begin_with_lock_timeout, catalog, warehouse};

/// Order service for product orders
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    lock_timeout_ms: u64,
}

/// Order header, shared by product and ingredient orders
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub title: String,
    pub writer: String,
    #[sqlx(try_from = "String")]
    pub order_type: OrderType,
    pub is_applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product line of an order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_kg: Decimal,
    pub note: Option<serde_json::Value>,
}

/// Frozen ingredient requirement of one product line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SnapshotRowView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub amount_per_kg: Decimal,
    pub unit_cost: Decimal,
    pub total_amount_kg: Decimal,
    pub total_cost: Decimal,
}

/// Stored per-ingredient total of an order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngredientSummaryView {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub total_amount_kg: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

/// Full product order
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub ingredient_summary: Vec<IngredientSummaryView>,
    pub snapshot_rows: Vec<SnapshotRowView>,
    pub total_cost: Decimal,
}

/// Input for creating or editing a product order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub title: String,
    /// Defaults to the authenticated user
    pub writer: Option<String>,
    pub items: Vec<OrderLine>,
}

/// Input for editing a product order
#[derive(Debug, Deserialize)]
pub struct UpdateOrderInput {
    pub title: String,
    pub items: Vec<OrderLine>,
}

/// Result of applying a product order
#[derive(Debug, Clone, Serialize)]
pub struct ProductApplyOutcome {
    pub order_id: Uuid,
    pub warehouse_id: Uuid,
    pub applied: bool,
    pub deductions: Vec<StockDeduction>,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self { db, lock_timeout_ms }
    }

    /// Create a product order with its frozen snapshot and summary.
    ///
    /// Every referenced product must exist, otherwise nothing is written.
    pub async fn create_order(&self, writer: &str, input: CreateOrderInput) -> AppResult<OrderDetail> {
        let writer = input.writer.as_deref().unwrap_or(writer).trim().to_string();
        let lines = normalize_lines(input.items);
        validate_order_input(&input.title, &lines)?;
        validate_writer(&writer).map_err(|msg| AppError::invalid("writer", msg))?;

        let mut tx = self.db.begin().await?;

        let product_ids = catalog::distinct_ids(lines.iter().map(|l| l.product_id));
        let recipes = catalog::require_recipes(&mut tx, &product_ids).await?;

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (title, writer, order_type)
            VALUES ($1, $2, 'product')
            RETURNING id
            "#,
        )
        .bind(input.title.trim())
        .bind(&writer)
        .fetch_one(&mut *tx)
        .await?;

        let total_cost = write_lines_and_snapshot(&mut tx, order_id, &lines, &recipes).await?;

        tx.commit().await?;

        tracing::info!(
            "Created product order {} with {} line(s), total cost {}",
            order_id,
            lines.len(),
            total_cost
        );

        self.get_order(order_id).await
    }

    /// List product orders, newest first
    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        list_orders_of_type(&self.db, OrderType::Product).await
    }

    /// Get a product order with items, summary and snapshot rows
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = fetch_order(&self.db, order_id)
            .await?
            .filter(|o| o.order_type == OrderType::Product)
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT oi.id, oi.product_id, p.name AS product_name, oi.quantity_kg, oi.note
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.line_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let ingredient_summary = sqlx::query_as::<_, IngredientSummaryView>(
            r#"
            SELECT s.ingredient_id, i.name AS ingredient_name, s.total_amount_kg, s.unit_cost, s.total_cost
            FROM order_ingredient_summaries s
            JOIN ingredients i ON i.id = s.ingredient_id
            WHERE s.order_id = $1
            ORDER BY s.row_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let snapshot_rows = sqlx::query_as::<_, SnapshotRowView>(
            r#"
            SELECT opi.id, opi.product_id, p.name AS product_name,
                   opi.ingredient_id, i.name AS ingredient_name,
                   opi.amount_per_kg, opi.unit_cost, opi.total_amount_kg, opi.total_cost
            FROM order_product_ingredients opi
            JOIN products p ON p.id = opi.product_id
            JOIN ingredients i ON i.id = opi.ingredient_id
            WHERE opi.order_id = $1
            ORDER BY opi.row_no
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let total_cost = checked_sum(ingredient_summary.iter().map(|s| s.total_cost))?;

        Ok(OrderDetail {
            order,
            items,
            ingredient_summary,
            snapshot_rows,
            total_cost,
        })
    }

    /// Replace the lines of an unapplied order and take a fresh snapshot
    pub async fn update_order(&self, order_id: Uuid, input: UpdateOrderInput) -> AppResult<OrderDetail> {
        let lines = normalize_lines(input.items);
        validate_order_input(&input.title, &lines)?;

        let mut tx = begin_with_lock_timeout(&self.db, self.lock_timeout_ms).await?;

        let order = lock_order(&mut tx, order_id).await?;
        ensure_applicable(OrderType::Product, order.order_type, order.is_applied)?;

        let product_ids = catalog::distinct_ids(lines.iter().map(|l| l.product_id));
        let recipes = catalog::require_recipes(&mut tx, &product_ids).await?;

        sqlx::query("UPDATE orders SET title = $1, updated_at = NOW() WHERE id = $2")
            .bind(input.title.trim())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        for table in ["order_product_ingredients", "order_ingredient_summaries", "order_items"] {
            sqlx::query(&format!("DELETE FROM {} WHERE order_id = $1", table))
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        }

        write_lines_and_snapshot(&mut tx, order_id, &lines, &recipes).await?;

        tx.commit().await?;

        tracing::info!("Updated product order {}", order_id);

        self.get_order(order_id).await
    }

    /// Delete an unapplied product order and everything derived from it
    pub async fn delete_order(&self, order_id: Uuid) -> AppResult<()> {
        let mut tx = begin_with_lock_timeout(&self.db, self.lock_timeout_ms).await?;

        let order = lock_order(&mut tx, order_id).await?;
        ensure_applicable(OrderType::Product, order.order_type, order.is_applied)?;

        // Items, snapshot and summary rows cascade
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Deleted product order {}", order_id);

        Ok(())
    }

    /// Deduct a product order's requirements from the priority-1 warehouse.
    ///
    /// Runs in one transaction: the order row is locked first, so a second
    /// apply of the same order waits and then sees it applied. Stock rows are
    /// locked and checked before any of them is written.
    pub async fn apply_order(&self, order_id: Uuid) -> AppResult<ProductApplyOutcome> {
        let mut tx = begin_with_lock_timeout(&self.db, self.lock_timeout_ms).await?;

        let order = lock_order(&mut tx, order_id).await?;
        ensure_applicable(OrderType::Product, order.order_type, order.is_applied)?;

        let warehouse_id = warehouse::top_priority_warehouse(&mut tx, true)
            .await?
            .ok_or(ApplyError::NoPriorityConfigured)?;

        let rows = load_snapshot_rows(&mut tx, order_id).await?;
        let required = required_by_ingredient(&rows)?;
        let ingredient_ids: Vec<Uuid> = required.keys().copied().collect();

        // Phase 1: lock and check every row without writing
        let current = warehouse::lock_stock(&mut tx, warehouse_id, &ingredient_ids).await?;
        let plan = match plan_deductions(warehouse_id, &required, &current) {
            Ok(plan) => plan,
            Err(err) => {
                if let ApplyError::InsufficientStock { shortages, .. } = &err {
                    tracing::warn!(
                        "Order {} cannot be applied: {} shortage(s) at warehouse {}",
                        order_id,
                        shortages.len(),
                        warehouse_id
                    );
                }
                return Err(err.into());
            }
        };

        // Phase 2: write every deduction, then flip the order
        for deduction in plan.deductions.iter().filter(|d| d.required_kg > Decimal::ZERO) {
            let result = sqlx::query(
                r#"
                UPDATE warehouse_stock
                SET quantity_kg = quantity_kg - $1, updated_at = NOW()
                WHERE warehouse_id = $2 AND ingredient_id = $3 AND quantity_kg >= $1
                "#,
            )
            .bind(deduction.required_kg)
            .bind(warehouse_id)
            .bind(deduction.ingredient_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                return Err(AppError::Internal(format!(
                    "Stock row for ingredient {} changed while locked",
                    deduction.ingredient_id
                )));
            }
        }

        mark_applied(&mut tx, order_id).await?;

        tx.commit().await?;

        tracing::info!(
            "Applied product order {} to warehouse {} ({} ingredient(s))",
            order_id,
            warehouse_id,
            plan.deductions.len()
        );

        Ok(ProductApplyOutcome {
            order_id,
            warehouse_id,
            applied: true,
            deductions: plan.deductions,
        })
    }
}

/// Round line quantities to stored precision before validating them
fn normalize_lines(lines: Vec<OrderLine>) -> Vec<OrderLine> {
    lines
        .into_iter()
        .map(|line| OrderLine {
            quantity_kg: round_quantity(line.quantity_kg),
            ..line
        })
        .collect()
}

fn validate_order_input(title: &str, lines: &[OrderLine]) -> AppResult<()> {
    validate_title(title).map_err(|msg| AppError::invalid("title", msg))?;
    validate_order_lines(lines).map_err(|msg| AppError::invalid("items", msg))?;
    Ok(())
}

/// Insert order items, snapshot rows and summary rows; returns the order total
async fn write_lines_and_snapshot(
    conn: &mut PgConnection,
    order_id: Uuid,
    lines: &[OrderLine],
    recipes: &HashMap<Uuid, Recipe>,
) -> AppResult<Decimal> {
    let mut expanded: Vec<(&Recipe, Decimal)> = Vec::with_capacity(lines.len());

    for (line_no, line) in lines.iter().enumerate() {
        let recipe = recipes
            .get(&line.product_id)
            .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;
        expanded.push((recipe, line.quantity_kg));

        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity_kg, note, line_no)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity_kg)
        .bind(&line.note)
        .bind(line_no as i32)
        .execute(&mut *conn)
        .await?;
    }

    let snapshot = snapshot_order(expanded)?;

    for (row_no, row) in snapshot.rows.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_product_ingredients (
                order_id, product_id, ingredient_id, amount_per_kg, unit_cost,
                total_amount_kg, total_cost, row_no
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order_id)
        .bind(row.product_id)
        .bind(row.ingredient_id)
        .bind(row.amount_per_kg)
        .bind(row.unit_cost)
        .bind(row.total_amount_kg)
        .bind(row.total_cost)
        .bind(row_no as i32)
        .execute(&mut *conn)
        .await?;
    }

    for (row_no, entry) in snapshot.summary.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_ingredient_summaries (
                order_id, ingredient_id, total_amount_kg, unit_cost, total_cost, row_no
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id)
        .bind(entry.ingredient_id)
        .bind(entry.total_amount_kg)
        .bind(entry.unit_cost)
        .bind(entry.total_cost)
        .bind(row_no as i32)
        .execute(&mut *conn)
        .await?;
    }

    order_total_cost(&snapshot.summary).map_err(AppError::from)
}

/// Fetch an order header without locking
pub async fn fetch_order(db: &PgPool, order_id: Uuid) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, title, writer, order_type, is_applied, applied_at, created_at, updated_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(db)
    .await?;

    Ok(order)
}

/// Lock an order row for the rest of the transaction
pub async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Order> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, title, writer, order_type, is_applied, applied_at, created_at, updated_at
        FROM orders
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Flip an order to applied; only valid while its row is locked
pub async fn mark_applied(conn: &mut PgConnection, order_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE orders
        SET is_applied = TRUE, applied_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND is_applied = FALSE
        "#,
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// List orders of one type, newest first
pub async fn list_orders_of_type(db: &PgPool, order_type: OrderType) -> AppResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, title, writer, order_type, is_applied, applied_at, created_at, updated_at
        FROM orders
        WHERE order_type = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(order_type.as_str())
    .fetch_all(db)
    .await?;

    Ok(orders)
}

/// Frozen snapshot rows of an order, in creation order
pub async fn load_snapshot_rows(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<SnapshotRow>> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Decimal, Decimal, Decimal)>(
        r#"
        SELECT product_id, ingredient_id, amount_per_kg, unit_cost, total_amount_kg, total_cost
        FROM order_product_ingredients
        WHERE order_id = $1
        ORDER BY row_no
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(product_id, ingredient_id, amount_per_kg, unit_cost, total_amount_kg, total_cost)| SnapshotRow {
                product_id,
                ingredient_id,
                amount_per_kg,
                unit_cost,
                total_amount_kg,
                total_cost,
            },
        )
        .collect())
}
