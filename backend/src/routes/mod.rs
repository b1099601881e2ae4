//! Route definitions for the Cosmetics Warehouse Management server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - product orders
        .nest("/orders", order_routes(state.clone()))
        // Protected routes - ingredient purchase orders
        .nest("/ingredient-orders", ingredient_order_routes(state.clone()))
        // Protected routes - product feasibility
        .nest("/products", product_routes(state.clone()))
        // Protected routes - warehouses
        .nest("/warehouses", warehouse_routes(state))
}

/// Product order routes (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .route("/:order_id/apply", post(handlers::apply_order))
        .route(
            "/:order_id/check-feasibility",
            get(handlers::check_order_feasibility),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Ingredient order routes (protected)
fn ingredient_order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ingredient_orders).post(handlers::create_ingredient_order),
        )
        .route(
            "/:order_id",
            get(handlers::get_ingredient_order)
                .put(handlers::update_ingredient_order)
                .delete(handlers::delete_ingredient_order),
        )
        .route("/:order_id/apply", post(handlers::apply_ingredient_order))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Feasibility routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/check-feasibility",
            post(handlers::check_combined_feasibility),
        )
        .route(
            "/:product_id/check-feasibility",
            get(handlers::check_product_feasibility),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Warehouse routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses))
        .route(
            "/priorities",
            get(handlers::get_priorities).put(handlers::set_priorities),
        )
        .route("/:warehouse_id/stock", get(handlers::get_warehouse_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
