//! HTTP handlers for warehouse ranking and stock

use axum::{
    extract::{Path, State},
    Json,
};
use shared::WarehousePriority;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::warehouse::{SetPrioritiesInput, StockEntry, WarehouseService, WarehouseSummary};
use crate::AppState;

pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<WarehouseSummary>>> {
    let service = WarehouseService::new(state.db);
    let warehouses = service.list_warehouses().await?;
    Ok(Json(warehouses))
}

pub async fn get_priorities(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<WarehousePriority>>> {
    let service = WarehouseService::new(state.db);
    let priorities = service.get_priorities().await?;
    Ok(Json(priorities))
}

/// Replace the warehouse ranking
pub async fn set_priorities(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SetPrioritiesInput>,
) -> AppResult<Json<Vec<WarehousePriority>>> {
    tracing::debug!("User {} replacing warehouse ranking", current_user.0.username);
    let service = WarehouseService::new(state.db);
    let priorities = service.set_priorities(input).await?;
    Ok(Json(priorities))
}

pub async fn get_warehouse_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockEntry>>> {
    let service = WarehouseService::new(state.db);
    let stock = service.get_stock(warehouse_id).await?;
    Ok(Json(stock))
}
