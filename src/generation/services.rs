use base64ct::{Base64, Encoding};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info, instrument};

use super::dto::{GenerateInput, GenerateRequest, GeneratedRecipe};
use super::gemini::GenerativeModel;
use super::prompts::{image_prompt, recipe_prompt, strip_code_fences};
use crate::error::{AppError, AppResult};
use crate::storage::StorageClient;

const IMAGE_CONTENT_TYPE: &str = "image/png";

/// `recipes/<title>_<unix ms>.png`, whitespace runs in the title become `_`.
pub fn image_key(title: &str, unix_millis: i128) -> String {
    let slug: String = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    let slug = if slug.is_empty() { "recipe".to_string() } else { slug };
    format!("recipes/{slug}_{unix_millis}.png")
}

fn parse_recipe(text: &str) -> AppResult<GeneratedRecipe> {
    let recipe: GeneratedRecipe = serde_json::from_str(&strip_code_fences(text)).map_err(|e| {
        error!(error = %e, "model returned unparsable recipe");
        AppError::upstream(format!("Failed to parse generated recipe: {e}"))
    })?;
    if recipe.title.trim().is_empty() {
        return Err(AppError::upstream("Generated recipe has no title"));
    }
    Ok(recipe)
}

/// Text model → image model → object storage. Any failing step aborts the run.
#[instrument(skip_all)]
pub async fn generate_recipe(
    model: &dyn GenerativeModel,
    storage: &dyn StorageClient,
    req: GenerateRequest,
) -> AppResult<GeneratedRecipe> {
    let input = GenerateInput::try_from(req)?;

    let text = model
        .generate_text(&recipe_prompt(&input))
        .await
        .map_err(|e| {
            error!(error = ?e, "text generation failed");
            AppError::upstream(format!("Failed to generate recipe text: {e}"))
        })?
        .ok_or_else(|| AppError::upstream("Failed to generate recipe text"))?;

    let mut recipe = parse_recipe(&text)?;

    let image = model
        .generate_image(&image_prompt(&recipe))
        .await
        .map_err(|e| {
            error!(error = ?e, "image generation failed");
            AppError::upstream(format!("Image generation failed: {e}"))
        })?
        .ok_or_else(|| AppError::upstream("Image generation failed - no image data returned"))?;

    let bytes = Base64::decode_vec(image.data.trim())
        .map_err(|e| AppError::upstream(format!("Image payload is not valid base64: {e}")))?;

    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let key = image_key(&recipe.title, millis);
    storage
        .put_object(&key, Bytes::from(bytes), IMAGE_CONTENT_TYPE)
        .await
        .map_err(|e| {
            error!(error = ?e, %key, "image upload failed");
            AppError::upstream(format!("Failed to store recipe image: {e}"))
        })?;

    recipe.image = Some(storage.public_url(&key));
    info!(title = %recipe.title, %key, "recipe generated");
    Ok(recipe)
}
