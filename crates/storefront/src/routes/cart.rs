//! Session cart.
//!
//! Lines keep a snapshot of name, image and price for display. Checkout
//! re-prices everything, so the snapshot is never trusted for money.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use pixstore_core::{Cart, CartLine, CartTotals, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity change request body. Zero or less removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Cart plus the totals the checkout page shows.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub totals: CartTotals,
}

/// Load the cart from the session. A missing cart is an empty one.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be read.
pub async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be written.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

async fn view(state: &AppState, cart: Cart) -> Result<Json<CartView>> {
    let settings = state.settings().await?;
    let totals = cart.totals(settings.minimum_order_value, settings.pix_discount_percent);
    Ok(Json(CartView { cart, totals }))
}

/// GET /api/cart
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    view(&state, cart).await
}

/// POST /api/cart/items
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    if req.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    let product = ProductRepository::new(state.pool())
        .get(req.product_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", req.product_id)))?;

    let mut cart = load_cart(&session).await?;
    cart.add(CartLine {
        product_id: product.id,
        name: product.name,
        image: product.image,
        price: product.price,
        quantity: req.quantity,
    });
    save_cart(&session, &cart).await?;

    view(&state, cart).await
}

/// PATCH /api/cart/items/{product_id}
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if !cart.set_quantity(product_id, req.quantity) {
        return Err(AppError::NotFound(format!("product {product_id} in cart")));
    }
    save_cart(&session, &cart).await?;

    view(&state, cart).await
}

/// DELETE /api/cart/items/{product_id}
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if cart.remove(product_id) {
        save_cart(&session, &cart).await?;
    }
    view(&state, cart).await
}

/// DELETE /api/cart
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;
    view(&state, cart).await
}
