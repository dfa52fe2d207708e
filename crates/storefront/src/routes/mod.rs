//! HTTP route handlers.
//!
//! Everything is JSON under `/api`. Errors come back as
//! `{"error": "<message>"}` with a matching status code.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//!
//! # Auth
//! POST /api/auth/register               - Create account and sign in
//! POST /api/auth/login                  - Sign in
//! POST /api/auth/logout                 - Sign out
//! GET  /api/auth/me                     - Current account and profile
//!
//! # Catalog
//! GET  /api/categories                  - Active categories
//! GET  /api/products[?category=]        - Active products
//! GET  /api/products/{id}               - Product detail
//! GET  /api/products/{id}/stock         - Available units
//! GET  /api/settings                    - Minimum order value, PIX discount
//!
//! # Cart (session)
//! GET    /api/cart                      - Cart with totals
//! POST   /api/cart/items                - Add a product
//! PATCH  /api/cart/items/{product_id}   - Set quantity
//! DELETE /api/cart/items/{product_id}   - Remove a product
//! DELETE /api/cart                      - Empty the cart
//!
//! # Orders (requires auth)
//! POST /api/checkout                    - Create order and PIX charge
//! GET  /api/orders                      - Order history
//! GET  /api/orders/{id}                 - Order detail
//! GET  /api/orders/{id}/payment         - Verify payment, deliver when paid
//!
//! # Account (requires auth)
//! GET  /api/account/profile
//! PUT  /api/account/profile
//!
//! # Support (requires auth)
//! GET  /api/support/tickets
//! POST /api/support/tickets
//! GET  /api/support/tickets/{id}/messages[?after=]
//! POST /api/support/tickets/{id}/messages
//!
//! # Realtime
//! GET  /api/events                      - SSE, own events only
//!
//! # Back-office (requires admin)
//! /api/admin/...                        - See [`admin`]
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod events;
pub mod health;
pub mod orders;
pub mod support;

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{
    auth_rate_limiter, checkout_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Register and login are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/products/{id}/stock", get(catalog::product_stock))
        .route("/settings", get(catalog::settings))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/checkout",
            post(orders::checkout).layer(checkout_rate_limiter()),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/payment", get(orders::payment))
}

/// Create the support routes router.
pub fn support_routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(support::tickets).post(support::create_ticket))
        .route(
            "/tickets/{id}/messages",
            post(support::send_message)
                .layer(checkout_rate_limiter())
                .get(support::messages),
        )
}

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .merge(order_routes())
        .route(
            "/account/profile",
            get(account::profile).put(account::update_profile),
        )
        .nest("/support", support_routes())
        .route("/events", get(events::customer_events))
        .nest("/admin", admin::routes())
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}

/// The full application: routes, sessions and the per-request middleware.
///
/// Sentry layers are added by the binary so tests can run without a client.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(sessions)
        .with_state(state)
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
}
