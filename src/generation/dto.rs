use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::recipes::repo_types::RecipeCategory;
use crate::users::services::non_empty;

pub const MIN_PROMPT_LEN: usize = 3;

/// POST /recipes/generate body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub ingredients: Option<String>,
    pub cuisine: Option<String>,
    pub dietary: Option<String>,
    pub meal_type: Option<String>,
}

/// Validated generation input; blank optional fields are dropped.
#[derive(Debug, Clone)]
pub struct GenerateInput {
    pub prompt: String,
    pub ingredients: Option<String>,
    pub cuisine: Option<String>,
    pub dietary: Option<String>,
    pub meal_type: Option<String>,
}

impl TryFrom<GenerateRequest> for GenerateInput {
    type Error = AppError;

    fn try_from(req: GenerateRequest) -> AppResult<Self> {
        let prompt = non_empty(req.prompt).ok_or_else(|| AppError::bad_request("Prompt is required"))?;
        if prompt.chars().count() < MIN_PROMPT_LEN {
            return Err(AppError::bad_request(format!(
                "Prompt must be at least {MIN_PROMPT_LEN} characters"
            )));
        }
        Ok(Self {
            prompt,
            ingredients: non_empty(req.ingredients),
            cuisine: non_empty(req.cuisine),
            dietary: non_empty(req.dietary),
            meal_type: non_empty(req.meal_type),
        })
    }
}

/// Recipe as produced by the text model, plus the stored image URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub category: Option<RecipeCategory>,
    pub cuisine: Option<String>,
    pub meal_type: Option<String>,
    pub dietary: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub recipe: GeneratedRecipe,
}
