//! Cart and checkout handlers.
//!
//! Signed-in customers use their own cart. Anonymous visitors get a cart keyed
//! by a random value stored in their session, which is folded into the user
//! cart when they sign in.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use author_store_core::{CartId, CartItemId, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartOwner, CurrentUser, session_keys};
use crate::services::checkout::{CheckoutForm, PlacedOrder};
use crate::services::{CartService, CheckoutService};
use crate::state::AppState;
use crate::views::CartView;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<ProductId>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub cart_item_id: Option<CartItemId>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub cart_item_id: Option<CartItemId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplyCouponRequest {
    pub code: String,
}

fn cart_service(state: &AppState) -> CartService<'_> {
    CartService::new(state.pool(), &state.config().pricing)
}

/// Who owns the cart for this request. Creates a guest key on first use.
async fn cart_owner(session: &Session, user: Option<&CurrentUser>) -> Result<CartOwner> {
    if let Some(user) = user {
        return Ok(CartOwner::User(user.id));
    }
    if let Some(key) = session.get::<String>(session_keys::GUEST_CART).await? {
        return Ok(CartOwner::Guest(key));
    }
    let key = Uuid::new_v4().to_string();
    session.insert(session_keys::GUEST_CART, &key).await?;
    Ok(CartOwner::Guest(key))
}

async fn current_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<CartId> {
    let owner = cart_owner(session, user).await?;
    Ok(cart_service(state).resolve(&owner).await?)
}

/// `GET /api/cart/current`
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let cart_id = current_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(cart_service(&state).view(cart_id).await?))
}

/// `POST /api/cart/add_item`
pub async fn add_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let product_id = body
        .product_id
        .ok_or_else(|| AppError::BadRequest("product_id is required".to_string()))?;
    let cart_id = current_cart(&state, &session, user.as_ref()).await?;
    let view = cart_service(&state)
        .add_item(cart_id, product_id, body.quantity)
        .await?;
    Ok(Json(view))
}

/// `POST /api/cart/update_item`
pub async fn update_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let (Some(line_id), Some(quantity)) = (body.cart_item_id, body.quantity) else {
        return Err(AppError::BadRequest(
            "cart_item_id and quantity are required".to_string(),
        ));
    };
    let cart_id = current_cart(&state, &session, user.as_ref()).await?;
    let view = cart_service(&state)
        .update_item(cart_id, line_id, quantity)
        .await?;
    Ok(Json(view))
}

/// `POST /api/cart/remove_item`
pub async fn remove_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<RemoveItemRequest>,
) -> Result<Json<CartView>> {
    let line_id = body
        .cart_item_id
        .ok_or_else(|| AppError::BadRequest("cart_item_id is required".to_string()))?;
    let cart_id = current_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(cart_service(&state).remove_item(cart_id, line_id).await?))
}

/// `POST /api/cart/clear`
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let cart_id = current_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(cart_service(&state).clear(cart_id).await?))
}

/// `POST /api/cart/apply_coupon`
pub async fn apply_coupon(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<ApplyCouponRequest>,
) -> Result<Json<CartView>> {
    let cart_id = current_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(
        cart_service(&state).apply_coupon(cart_id, &body.code).await?,
    ))
}

/// `POST /api/cart/create_order`
///
/// Turns the signed-in customer's cart into a pending order and returns the
/// hosted payment page to redirect to.
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let cart_id = cart_service(&state)
        .resolve(&CartOwner::User(user.id))
        .await?;

    let placed = CheckoutService::new(
        state.pool(),
        state.stripe(),
        &state.config().pricing,
        &state.config().public_url,
    )
    .place_order(user.id, cart_id, &form)
    .await?;

    Ok((StatusCode::CREATED, Json(placed)))
}
