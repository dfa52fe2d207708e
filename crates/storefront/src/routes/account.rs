//! Customer profile.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use url::Url;

use pixstore_core::{Email, normalize_br_phone};

use crate::db::UserRepository;
use crate::db::users::ProfileUpdate;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Profile;
use crate::state::AppState;

const MAX_DISPLAY_NAME_LENGTH: usize = 100;
const MAX_AVATAR_URL_LENGTH: usize = 2048;

/// Profile as shown on the account page.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub email: Email,
    #[serde(flatten)]
    pub profile: Profile,
}

/// Profile update body. Blank fields clear the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileRequest {
    /// Trim, validate and normalize into a repository update.
    ///
    /// Phones are stored as `+55 (11) 98765-4321`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an over-long name or an avatar
    /// that is not an http(s) URL.
    pub fn normalize(self) -> Result<ProfileUpdate> {
        let display_name = non_blank(self.display_name);
        if display_name
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_DISPLAY_NAME_LENGTH)
        {
            return Err(AppError::BadRequest(format!(
                "display name is limited to {MAX_DISPLAY_NAME_LENGTH} characters"
            )));
        }

        let avatar_url = non_blank(self.avatar_url);
        if let Some(raw) = &avatar_url {
            let valid = raw.len() <= MAX_AVATAR_URL_LENGTH
                && Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
            if !valid {
                return Err(AppError::BadRequest("avatar must be an http(s) URL".to_string()));
            }
        }

        Ok(ProfileUpdate {
            display_name,
            phone: self.phone.as_deref().and_then(normalize_br_phone),
            avatar_url,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/account/profile
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileView>> {
    let profile = UserRepository::new(state.pool())
        .get_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_string()))?;
    Ok(Json(ProfileView {
        email: user.email,
        profile,
    }))
}

/// PUT /api/account/profile
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<ProfileView>> {
    let update = req.normalize()?;
    let profile = UserRepository::new(state.pool())
        .update_profile(user.id, &update)
        .await?;

    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(ProfileView {
        email: user.email,
        profile,
    }))
}
