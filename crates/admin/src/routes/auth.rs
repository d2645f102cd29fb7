//! Staff login and logout.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::services::{AdminAuthError, AdminAuthService};
use crate::state::AppState;

use super::render_page;

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPageTemplate {
    username: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

/// GET /auth/login
async fn login_page(OptionalAdminAuth(admin): OptionalAdminAuth) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }
    render_page(&LoginPageTemplate {
        username: String::new(),
        error: None,
    })
    .into_response()
}

/// POST /auth/login
#[instrument(skip(state, session, input), fields(username = %input.username))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<LoginInput>,
) -> Result<Response, AppError> {
    let staff = match AdminAuthService::new(state.pool())
        .login(&input.username, &input.password)
        .await
    {
        Ok(staff) => staff,
        Err(e @ (AdminAuthError::InvalidCredentials | AdminAuthError::MissingField(_))) => {
            tracing::info!("Staff login rejected");
            let page = render_page(&LoginPageTemplate {
                username: input.username,
                error: Some(e.to_string()),
            });
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    set_current_admin(&session, &staff.to_current_admin())
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(staff.id.as_i32(), &staff.username);

    Ok(Redirect::to("/").into_response())
}

/// POST /auth/logout
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::warn!(error = %e, "Failed to clear admin session");
    }
    clear_sentry_user();
    Redirect::to("/auth/login")
}
