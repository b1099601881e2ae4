//! HTTP handlers for product order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{
    CreateOrderInput, Order, OrderDetail, OrderService, ProductApplyOutcome, UpdateOrderInput,
};
use crate::AppState;

fn order_service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone(), state.config.orders.lock_timeout_ms)
}

/// Create a product order and freeze its snapshot
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderDetail>)> {
    let detail = order_service(&state)
        .create_order(&current_user.0.username, input)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List product orders
pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    let orders = order_service(&state).list_orders().await?;
    Ok(Json(orders))
}

/// Get a product order with its snapshot
pub async fn get_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let detail = order_service(&state).get_order(order_id).await?;
    Ok(Json(detail))
}

/// Edit an unapplied product order
pub async fn update_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let detail = order_service(&state).update_order(order_id, input).await?;
    Ok(Json(detail))
}

/// Delete an unapplied product order
pub async fn delete_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    order_service(&state).delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deduct a product order from the priority-1 warehouse
pub async fn apply_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ProductApplyOutcome>> {
    tracing::debug!("User {} applying order {}", current_user.0.username, order_id);
    let outcome = order_service(&state).apply_order(order_id).await?;
    Ok(Json(outcome))
}
