use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{FavoriteRequest, RecipeResponse, RecipesResponse, SaveRecipeRequest, UserRecipesRequest},
    services,
};
use crate::{
    error::{ApiJson, AppError},
    generation::{
        dto::{GenerateRequest, GenerateResponse},
        services::generate_recipe,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/all", get(list_all))
        .route("/recipes/user", post(user_favorites))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/favorite", patch(toggle_favorite))
        .route("/recipes/generate", post(generate))
        .route("/recipes/save", post(save))
}

#[instrument(skip(state))]
pub async fn list_all(State(state): State<AppState>) -> Result<Json<RecipesResponse>, AppError> {
    let recipes = state.recipes.list_all().await?;
    Ok(Json(RecipesResponse { recipes }))
}

#[instrument(skip(state, payload))]
pub async fn user_favorites(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserRecipesRequest>,
) -> Result<Json<RecipesResponse>, AppError> {
    let recipes = services::favorites_for_user(state.recipes.as_ref(), payload.email).await?;
    Ok(Json(RecipesResponse { recipes }))
}

#[instrument(skip(state, payload))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<FavoriteRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe = services::toggle_favorite(state.recipes.as_ref(), payload.id).await?;
    let message = if recipe.is_favorite {
        "Recipe marked as favorite"
    } else {
        "Recipe marked as not favorite"
    };
    Ok(Json(RecipeResponse {
        message: Some(message.into()),
        recipe,
    }))
}

#[instrument(skip(state, payload))]
pub async fn generate(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let recipe = generate_recipe(state.model.as_ref(), state.storage.as_ref(), payload).await?;
    Ok(Json(GenerateResponse { recipe }))
}

#[instrument(skip(state, payload))]
pub async fn save(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SaveRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    let recipe =
        services::save_recipe(state.users.as_ref(), state.recipes.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse {
            message: Some("Recipe saved successfully".into()),
            recipe,
        }),
    ))
}
