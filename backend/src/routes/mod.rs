//! API route definitions
//!
//! Everything except login and register sits behind the authentication
//! middleware. The operation log layer is added first so it runs inside
//! authentication and sees the resolved user.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::{auth_middleware, oplog_middleware};
use crate::AppState;

/// All routes mounted under /api
pub fn api_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register));

    let protected = Router::new()
        // Account
        .route("/auth/profile", get(handlers::auth::profile))
        .route("/auth/change-password", post(handlers::auth::change_password))
        // User administration
        .route(
            "/auth/users",
            get(handlers::auth::list_users).post(handlers::auth::create_user),
        )
        .route(
            "/auth/users/:id",
            put(handlers::auth::update_user).delete(handlers::auth::delete_user),
        )
        .route("/auth/users/:id/status", put(handlers::auth::update_user_status))
        // Product catalog
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/products/categories", get(handlers::products::list_categories))
        .route("/products/barcode/:barcode", get(handlers::products::get_by_barcode))
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        // Point of sale
        .route(
            "/sales",
            get(handlers::sales::list_sales).post(handlers::sales::create_sale),
        )
        .route("/sales/statistics", get(handlers::sales::sales_statistics))
        .route("/sales/:id", get(handlers::sales::get_sale))
        .route("/sales/:id/cancel", put(handlers::sales::cancel_sale))
        // Inventory
        .route("/inventory", get(handlers::inventory::list_inventory))
        .route("/inventory/logs", get(handlers::inventory::list_logs))
        .route("/inventory/adjust", post(handlers::inventory::adjust_inventory))
        .route("/inventory/alerts", get(handlers::inventory::list_alerts))
        .route(
            "/inventory/alerts/:id/resolve",
            put(handlers::inventory::resolve_alert),
        )
        .route(
            "/inventory/check-low-stock",
            post(handlers::inventory::check_low_stock),
        )
        // Layer order matters: auth is added last so it runs first and the
        // operation log sees the authenticated user
        .route_layer(from_fn_with_state(state.clone(), oplog_middleware))
        .route_layer(from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}
