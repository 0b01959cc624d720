use serde::{Deserialize, Serialize};

use super::repo_types::{Recipe, RecipeMetadata};

/// POST /recipes/save body. The owner is identified by email.
#[derive(Debug, Deserialize)]
pub struct SaveRecipeRequest {
    pub email: Option<String>,
    pub title: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    #[serde(flatten)]
    pub metadata: RecipeMetadata,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    #[serde(alias = "_id")]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRecipesRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipesResponse {
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recipe: Recipe,
}
