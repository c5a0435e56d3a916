//! HTTP API server for the shop.
//!
//! Provides JSON endpoints for the session cart, checkout and order
//! management, with structured logging (tracing) and Prometheus metrics.

pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{CartService, CheckoutService, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemorySessionStore, ShopStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ShopStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/add/{product_id}", post(routes::cart::add::<S>))
        .route("/cart/update", post(routes::cart::update::<S>))
        .route("/cart/remove/{product_id}", post(routes::cart::remove::<S>))
        .route("/cart/clear", post(routes::cart::clear::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route(
            "/orders/create",
            get(routes::orders::create_form::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/edit",
            get(routes::orders::edit_form::<S>).post(routes::orders::edit::<S>),
        )
        .route(
            "/orders/{id}/delete",
            get(routes::orders::get::<S>).post(routes::orders::delete::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around one shop store and a fresh
/// in-memory session store.
pub fn create_default_state<S: ShopStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        cart_service: CartService::new(store.clone(), InMemorySessionStore::new()),
        checkout_service: CheckoutService::new(store.clone()),
        order_service: OrderService::new(store),
    })
}
