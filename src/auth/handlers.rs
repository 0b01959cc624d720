use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{LoginRequest, LoginResponse, SignupRequest, SignupResponse},
    jwt::{AuthUser, JwtKeys},
    services,
};
use crate::{
    error::{ApiJson, AppError},
    state::AppState,
    users::dto::{PublicUser, UserResponse},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(AppError::bad_request("Email and password are required"));
    };

    let keys = JwtKeys::from_ref(&state);
    let (token, user) = services::login(state.users.as_ref(), &keys, &email, &password).await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let user = services::signup(state.users.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Signup successful",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let Some(user) = state.users.find_by_id(claims.sub).await? else {
        warn!("token for a user that no longer exists");
        return Err(AppError::Unauthorized("User not found".into()));
    };

    Ok(Json(UserResponse {
        message: None,
        user: PublicUser::from(user),
    }))
}
