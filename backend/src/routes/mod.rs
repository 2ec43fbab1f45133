//! Route definitions for the Mandi Trade Management Platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - reference data
        .nest("/pack-sizes", pack_size_routes())
        .nest("/prices", price_routes())
        // Protected routes - core documents
        .nest("/deals", deal_routes())
        .nest("/deliveries", delivery_routes())
        .nest("/stock-entries", stock_routes())
        .nest("/dispatches", dispatch_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Pack size master routes (protected)
fn pack_size_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_pack_sizes).post(handlers::create_pack_size),
        )
        .route("/:pack_size_id", put(handlers::update_pack_size))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Price list routes (protected)
fn price_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_prices).post(handlers::create_price))
        .route("/resolve", get(handlers::resolve_rate))
        .route("/by-area/:area", get(handlers::get_area_prices))
        .route("/:price_id", delete(handlers::deactivate_price))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Deal management routes (protected)
fn deal_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_deals).post(handlers::create_deal))
        .route(
            "/:deal_id",
            get(handlers::get_deal)
                .put(handlers::update_deal)
                .delete(handlers::delete_deal),
        )
        .route("/:deal_id/confirm", post(handlers::confirm_deal))
        .route("/:deal_id/cancel", post(handlers::cancel_deal))
        .route("/:deal_id/refresh", post(handlers::refresh_deal))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Delivery and allocation routes (protected)
fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_deliveries).post(handlers::create_delivery),
        )
        .route("/pending-items", get(handlers::get_pending_deal_items))
        .route("/allocate", get(handlers::allocate_fifo))
        .route(
            "/:delivery_id",
            get(handlers::get_delivery)
                .put(handlers::update_delivery)
                .delete(handlers::delete_delivery),
        )
        .route("/:delivery_id/submit", post(handlers::submit_delivery))
        .route("/:delivery_id/cancel", post(handlers::cancel_delivery))
        .route(
            "/:delivery_id/aggregated-lines",
            get(handlers::get_aggregated_lines),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock entry routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_entries).post(handlers::create_stock_entry),
        )
        .route("/from-delivery", post(handlers::create_issue_from_delivery))
        .route("/balances", get(handlers::get_stock_balances))
        .route("/:entry_id", get(handlers::get_stock_entry))
        .route("/:entry_id/submit", post(handlers::submit_stock_entry))
        .route("/:entry_id/cancel", post(handlers::cancel_stock_entry))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Vehicle dispatch routes (protected)
fn dispatch_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_dispatches).post(handlers::create_dispatch),
        )
        .route(
            "/undispatched-deliveries",
            get(handlers::get_undispatched_deliveries),
        )
        .route("/:dispatch_id", get(handlers::get_dispatch))
        .route("/:dispatch_id/submit", post(handlers::submit_dispatch))
        .route("/:dispatch_id/cancel", post(handlers::cancel_dispatch))
        .route_layer(middleware::from_fn(auth_middleware))
}
