//! HTTP handlers for ingredient purchase order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ingredient_order::{
    CreateIngredientOrderInput, IngredientApplyOutcome, IngredientOrderDetail,
    IngredientOrderService, UpdateIngredientOrderInput,
};
use crate::services::order::Order;
use crate::AppState;

fn ingredient_order_service(state: &AppState) -> IngredientOrderService {
    IngredientOrderService::new(state.db.clone(), state.config.orders.lock_timeout_ms)
}

pub async fn create_ingredient_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateIngredientOrderInput>,
) -> AppResult<(StatusCode, Json<IngredientOrderDetail>)> {
    let detail = ingredient_order_service(&state)
        .create_order(&current_user.0.username, input)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_ingredient_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    let orders = ingredient_order_service(&state).list_orders().await?;
    Ok(Json(orders))
}

pub async fn get_ingredient_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<IngredientOrderDetail>> {
    let detail = ingredient_order_service(&state).get_order(order_id).await?;
    Ok(Json(detail))
}

pub async fn update_ingredient_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateIngredientOrderInput>,
) -> AppResult<Json<IngredientOrderDetail>> {
    let detail = ingredient_order_service(&state)
        .update_order(order_id, input)
        .await?;
    Ok(Json(detail))
}

pub async fn delete_ingredient_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ingredient_order_service(&state).delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a purchase order's lines to warehouse stock
pub async fn apply_ingredient_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<IngredientApplyOutcome>> {
    tracing::debug!(
        "User {} applying ingredient order {}",
        current_user.0.username,
        order_id
    );
    let outcome = ingredient_order_service(&state).apply_order(order_id).await?;
    Ok(Json(outcome))
}
