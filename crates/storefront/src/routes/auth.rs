//! Account registration and sign-in.
//!
//! Sessions carry a [`CurrentUser`]; the session ID is cycled on every
//! sign-in.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Profile, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in account and its profile.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub profile: Option<Profile>,
}

async fn sign_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(current)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .register(&req.email, &req.password, req.display_name.as_deref())
        .await?;
    let current = sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(current)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;
    let current = sign_in(&session, &user).await?;

    tracing::info!(user_id = %current.id, "signed in");
    Ok(Json(current))
}

/// POST /api/auth/logout
///
/// Always succeeds, signed in or not.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<MeResponse>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    let profile = UserRepository::new(state.pool())
        .get_profile(current.id)
        .await?;
    Ok(Json(MeResponse { user, profile }))
}
