use axum::{extract::State, routing::patch, Json, Router};
use tracing::instrument;

use super::{
    dto::{UpdateUserRequest, UserResponse},
    services,
};
use crate::{
    error::{ApiJson, AppError},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user/update", patch(update_user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::update_profile(state.users.as_ref(), payload).await?;
    Ok(Json(UserResponse {
        message: Some("User updated successfully"),
        user: user.into(),
    }))
}
