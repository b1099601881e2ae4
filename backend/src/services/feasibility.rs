//! Feasibility service
//!
//! Read-only. Every check runs in one REPEATABLE READ transaction so the
//! ranking and all stock figures come from the same snapshot.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    check_feasibility, check_requirements, joint_feasibility, merge_feasibility,
    required_by_ingredient, round_quantity, validate_order_lines, validate_quantity, ApplyError,
    FeasibilityResult, MergedFeasibility, OrderLine, OrderType, Requirement, StockLevels,
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{catalog, order, warehouse};

#[derive(Clone)]
pub struct FeasibilityService {
    db: PgPool,
}

/// Classification of one product's recipe
#[derive(Debug, Clone, Serialize)]
pub struct ProductFeasibility {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_kg: Decimal,
    pub warehouse_id: Uuid,
    pub results: Vec<FeasibilityResult>,
}

/// Input for the combined check
#[derive(Debug, Deserialize)]
pub struct CombinedFeasibilityInput {
    pub items: Vec<OrderLine>,
}

/// Combined check across several products
#[derive(Debug, Clone, Serialize)]
pub struct CombinedFeasibility {
    pub warehouse_id: Uuid,
    pub products: Vec<ProductFeasibility>,
    /// Worst case per ingredient over the independent product checks
    pub merged: Vec<MergedFeasibility>,
    /// Summed requirement per ingredient, classified again
    pub joint: Vec<FeasibilityResult>,
}

/// Check of a stored order's frozen requirements
#[derive(Debug, Clone, Serialize)]
pub struct OrderFeasibility {
    pub order_id: Uuid,
    pub warehouse_id: Uuid,
    pub results: Vec<FeasibilityResult>,
}

impl FeasibilityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Classify a product's recipe for a batch of `quantity_kg`
    pub async fn check_product(&self, product_id: Uuid, quantity_kg: Decimal) -> AppResult<ProductFeasibility> {
        let quantity_kg = round_quantity(quantity_kg);
        validate_quantity(quantity_kg).map_err(|msg| AppError::invalid("quantity", msg))?;

        let mut tx = self.begin_read().await?;

        let recipes = catalog::require_recipes(&mut tx, &[product_id]).await?;
        let recipe = recipes
            .get(&product_id)
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;
        let top = require_top_warehouse(&mut tx).await?;

        let ingredient_ids: Vec<Uuid> = recipe.components.iter().map(|c| c.ingredient_id).collect();
        let stock = warehouse::load_stock_levels(&mut tx, top, &ingredient_ids).await?;
        tx.commit().await?;

        Ok(ProductFeasibility {
            product_id,
            product_name: recipe.product_name.clone(),
            quantity_kg,
            warehouse_id: top,
            results: check_feasibility(recipe, quantity_kg, &stock)?,
        })
    }

    /// Check several products against one stock snapshot and merge the results
    pub async fn check_combined(&self, input: CombinedFeasibilityInput) -> AppResult<CombinedFeasibility> {
        let lines: Vec<OrderLine> = input
            .items
            .into_iter()
            .map(|line| OrderLine {
                quantity_kg: round_quantity(line.quantity_kg),
                ..line
            })
            .collect();
        validate_order_lines(&lines).map_err(|msg| AppError::invalid("items", msg))?;

        let mut tx = self.begin_read().await?;

        let product_ids = catalog::distinct_ids(lines.iter().map(|l| l.product_id));
        let recipes = catalog::require_recipes(&mut tx, &product_ids).await?;
        let top = require_top_warehouse(&mut tx).await?;

        let ingredient_ids = catalog::distinct_ids(
            recipes
                .values()
                .flat_map(|r| r.components.iter().map(|c| c.ingredient_id)),
        );
        let stock = warehouse::load_stock_levels(&mut tx, top, &ingredient_ids).await?;
        tx.commit().await?;

        let mut products = Vec::with_capacity(lines.len());
        for line in &lines {
            let recipe = recipes
                .get(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;
            products.push(ProductFeasibility {
                product_id: line.product_id,
                product_name: recipe.product_name.clone(),
                quantity_kg: line.quantity_kg,
                warehouse_id: top,
                results: check_feasibility(recipe, line.quantity_kg, &stock)?,
            });
        }

        let per_product: Vec<Vec<FeasibilityResult>> = products.iter().map(|p| p.results.clone()).collect();

        Ok(CombinedFeasibility {
            warehouse_id: top,
            merged: merge_feasibility(&per_product)?,
            joint: joint_feasibility(&per_product)?,
            products,
        })
    }

    /// Classify the frozen requirements of a stored product order
    pub async fn check_order(&self, order_id: Uuid) -> AppResult<OrderFeasibility> {
        let header = order::fetch_order(&self.db, order_id)
            .await?
            .filter(|o| o.order_type == OrderType::Product)
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let mut tx = self.begin_read().await?;

        let rows = order::load_snapshot_rows(&mut tx, header.id).await?;
        let required = required_by_ingredient(&rows)?;
        let top = require_top_warehouse(&mut tx).await?;
        let ingredient_ids: Vec<Uuid> = required.keys().copied().collect();

        let names = ingredient_names(&mut tx, &ingredient_ids).await?;
        let stock: StockLevels = warehouse::load_stock_levels(&mut tx, top, &ingredient_ids).await?;
        tx.commit().await?;

        let requirements = required.into_iter().map(|(ingredient_id, required_kg)| Requirement {
            ingredient_id,
            ingredient_name: names.get(&ingredient_id).cloned().unwrap_or_default(),
            required_kg,
        });

        Ok(OrderFeasibility {
            order_id,
            warehouse_id: top,
            results: check_requirements(requirements, &stock),
        })
    }

    async fn begin_read(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

async fn require_top_warehouse(conn: &mut PgConnection) -> AppResult<Uuid> {
    let top = warehouse::top_priority_warehouse(conn, false)
        .await?
        .ok_or(ApplyError::NoPriorityConfigured)?;
    Ok(top)
}

async fn ingredient_names(conn: &mut PgConnection, ingredient_ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
    let ingredients = catalog::load_ingredients(conn, ingredient_ids).await?;
    Ok(ingredients.into_iter().map(|(id, i)| (id, i.name)).collect())
}
