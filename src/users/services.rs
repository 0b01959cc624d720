use tracing::info;

use super::dto::UpdateUserRequest;
use super::repo_types::{User, UserPatch, MAX_BIO_LEN};
use crate::auth::services::canonical_email;
use crate::db::UserRepo;
use crate::error::{AppError, AppResult};

/// Trims and drops blank strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_bio(bio: Option<&str>) -> AppResult<()> {
    match bio {
        Some(b) if b.chars().count() > MAX_BIO_LEN => Err(AppError::bad_request(format!(
            "Bio must be at most {MAX_BIO_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

/// Applies the supplied profile fields to the user identified by email.
pub async fn update_profile(users: &dyn UserRepo, req: UpdateUserRequest) -> AppResult<User> {
    let email = non_empty(req.email).ok_or_else(|| AppError::bad_request("Email is required"))?;
    let email = canonical_email(&email);

    let patch = UserPatch {
        name: non_empty(req.name),
        username: non_empty(req.username),
        bio: req.bio.map(|b| b.trim().to_string()),
        avatar_url: non_empty(req.avatar_url),
    };
    validate_bio(patch.bio.as_deref())?;

    let user = users.update_by_email(&email, patch).await?;
    info!(user_id = %user.id, "user updated");
    Ok(user)
}
