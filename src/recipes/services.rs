use tracing::{info, warn};
use uuid::Uuid;

use super::dto::SaveRecipeRequest;
use super::repo_types::{NewRecipe, Recipe};
use crate::auth::services::canonical_email;
use crate::db::{RecipeRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::users::services::non_empty;

fn clean_lines(lines: Option<Vec<String>>) -> Vec<String> {
    lines
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Stores a recipe for the user owning `req.email`.
///
/// Title, ingredients and instructions must be non-empty; an unknown owner
/// is `NotFound` and nothing is written.
pub async fn save_recipe(
    users: &dyn UserRepo,
    recipes: &dyn RecipeRepo,
    req: SaveRecipeRequest,
) -> AppResult<Recipe> {
    let email = non_empty(req.email);
    let title = non_empty(req.title);
    let ingredients = clean_lines(req.ingredients);
    let instructions = clean_lines(req.instructions);

    let (Some(email), Some(title)) = (email, title) else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    if ingredients.is_empty() || instructions.is_empty() {
        return Err(AppError::bad_request("Missing required fields"));
    }

    let email = canonical_email(&email);
    let Some(owner) = users.find_by_email(&email).await? else {
        warn!(email = %email, "save recipe for unknown user");
        return Err(AppError::not_found("User not found"));
    };

    let recipe = recipes
        .create(
            &owner,
            NewRecipe {
                title,
                ingredients,
                instructions,
                metadata: req.metadata,
            },
        )
        .await?;
    info!(recipe_id = %recipe.id, user_id = %owner.id, "recipe saved");
    Ok(recipe)
}

pub async fn favorites_for_user(recipes: &dyn RecipeRepo, email: Option<String>) -> AppResult<Vec<Recipe>> {
    let email = non_empty(email).ok_or_else(|| AppError::bad_request("Email is required"))?;
    recipes.list_favorites(&canonical_email(&email)).await
}

pub async fn toggle_favorite(recipes: &dyn RecipeRepo, id: Option<String>) -> AppResult<Recipe> {
    let raw = non_empty(id).ok_or_else(|| AppError::bad_request("Missing recipe ID"))?;
    let id = Uuid::parse_str(&raw).map_err(|_| AppError::bad_request("Invalid recipe ID"))?;
    let recipe = recipes.toggle_favorite(id).await?;
    info!(recipe_id = %recipe.id, is_favorite = recipe.is_favorite, "favorite toggled");
    Ok(recipe)
}
