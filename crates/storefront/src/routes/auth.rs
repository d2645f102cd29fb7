//! Account registration, login and logout.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use author_store_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{User, session_keys};
use crate::services::CartService;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `POST /api/auth/register`
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = AuthService::new(state.pool())
        .register(&Registration {
            username: &body.username,
            email: &body.email,
            password: &body.password,
            first_name: &body.first_name,
            last_name: &body.last_name,
        })
        .await?;

    sign_in(&state, &session, &user).await?;
    tracing::info!(user_id = %user.id, "Customer registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            message: "Registration successful",
        }),
    ))
}

/// `POST /api/auth/login`
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.pool())
        .login(&body.username, &body.password)
        .await?;

    sign_in(&state, &session, &user).await?;

    Ok(Json(AuthResponse {
        user,
        message: "Login successful",
    }))
}

/// `POST /api/auth/logout`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Json<MessageResponse>> {
    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}

/// `GET /api/auth/user`
pub async fn current_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))
}

/// Store the user in a fresh session and fold in their guest cart.
async fn sign_in(state: &AppState, session: &Session, user: &User) -> Result<()> {
    let guest_key = session.remove::<String>(session_keys::GUEST_CART).await?;
    set_current_user(session, &user.to_current_user()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    if let Some(key) = guest_key {
        merge_guest_cart(state, &key, user.id).await;
    }
    Ok(())
}

/// A failed merge leaves the guest items behind but must not fail the login.
async fn merge_guest_cart(state: &AppState, key: &str, user_id: UserId) {
    if let Err(e) = CartService::new(state.pool(), &state.config().pricing)
        .merge_guest_cart(key, user_id)
        .await
    {
        tracing::warn!(user_id = %user_id, error = %e, "Failed to merge guest cart");
    }
}
