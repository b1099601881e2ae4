//! HTTP handlers for feasibility checks

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::feasibility::{
    CombinedFeasibility, CombinedFeasibilityInput, FeasibilityService, OrderFeasibility,
    ProductFeasibility,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeasibilityQuery {
    pub quantity: Decimal,
}

/// Classify one product's recipe for a batch size
pub async fn check_product_feasibility(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<FeasibilityQuery>,
) -> AppResult<Json<ProductFeasibility>> {
    let service = FeasibilityService::new(state.db);
    let result = service.check_product(product_id, query.quantity).await?;
    Ok(Json(result))
}

/// Check several products at once
pub async fn check_combined_feasibility(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CombinedFeasibilityInput>,
) -> AppResult<Json<CombinedFeasibility>> {
    let service = FeasibilityService::new(state.db);
    let result = service.check_combined(input).await?;
    Ok(Json(result))
}

/// Check a stored order's frozen requirements
pub async fn check_order_feasibility(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderFeasibility>> {
    let service = FeasibilityService::new(state.db);
    let result = service.check_order(order_id).await?;
    Ok(Json(result))
}
