//! Business logic services for the Cosmetics Warehouse Management server

pub mod catalog;
pub mod feasibility;
pub mod ingredient_order;
pub mod order;
pub mod warehouse;

pub use feasibility::FeasibilityService;
pub use ingredient_order::IngredientOrderService;
pub use order::OrderService;
pub use warehouse::WarehouseService;

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppResult;

/// Begin a transaction whose row-lock waits are bounded by `lock_timeout_ms`.
///
/// A wait that runs out fails with SQLSTATE 55P03 and the transaction is
/// rolled back when dropped.
pub(crate) async fn begin_with_lock_timeout(
    db: &PgPool,
    lock_timeout_ms: u64,
) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await?;

    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout_ms))
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
