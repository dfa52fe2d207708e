//! Back-office API. Every handler takes [`RequireAdmin`].
//!
//! ```text
//! GET    /api/admin/products                 - All products, inactive included
//! POST   /api/admin/products                 - Create
//! PATCH  /api/admin/products/{id}            - Partial update
//! DELETE /api/admin/products/{id}
//! POST   /api/admin/products/{id}/toggle     - Flip is_active
//! POST   /api/admin/products/reorder         - {"ids": [...]}
//! GET    /api/admin/products/{id}/stock      - Credential pool
//! POST   /api/admin/products/{id}/stock      - Import, one credential per line
//! DELETE /api/admin/products/{id}/stock      - Remove unsold credentials
//! DELETE /api/admin/stock/{id}               - Remove one unsold credential
//! POST   /api/admin/stock/assign             - Claim a credential for an order
//!
//! GET    /api/admin/categories
//! POST   /api/admin/categories
//! PATCH  /api/admin/categories/{id}
//! DELETE /api/admin/categories/{id}
//! POST   /api/admin/categories/reorder
//!
//! GET    /api/admin/orders
//! PATCH  /api/admin/orders/{id}/status
//! PUT    /api/admin/orders/{id}/deliverable
//!
//! GET    /api/admin/users
//!
//! GET    /api/admin/support/tickets
//! GET    /api/admin/support/tickets/{id}/messages
//! POST   /api/admin/support/tickets/{id}/messages
//! POST   /api/admin/support/tickets/{id}/close
//! DELETE /api/admin/support/tickets/{id}
//!
//! GET    /api/admin/settings
//! PUT    /api/admin/settings
//! GET    /api/admin/dashboard?period=&start=&end=
//! GET    /api/admin/events                   - SSE, all events
//! ```
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod settings;
pub mod stock;
pub mod support;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;

use crate::routes::events;
use crate::state::AppState;

/// Ordered ids for the reorder endpoints.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest<Id> {
    pub ids: Vec<Id>,
}

/// Create the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route("/products/reorder", post(products::reorder))
        .route(
            "/products/{id}",
            patch(products::update).delete(products::destroy),
        )
        .route("/products/{id}/toggle", post(products::toggle))
        .route(
            "/products/{id}/stock",
            get(stock::index).post(stock::import).delete(stock::clear),
        )
        .route("/stock/{id}", delete(stock::destroy))
        .route("/stock/assign", post(stock::assign))
        .route("/categories", get(categories::index).post(categories::create))
        .route("/categories/reorder", post(categories::reorder))
        .route(
            "/categories/{id}",
            patch(categories::update).delete(categories::destroy),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/deliverable", put(orders::set_deliverable))
        .route("/users", get(users::index))
        .route("/support/tickets", get(support::tickets))
        .route("/support/tickets/{id}", delete(support::destroy))
        .route(
            "/support/tickets/{id}/messages",
            get(support::messages).post(support::send_message),
        )
        .route("/support/tickets/{id}/close", post(support::close))
        .route("/settings", get(settings::show).put(settings::update))
        .route("/dashboard", get(dashboard::show))
        .route("/events", get(events::admin_events))
}
