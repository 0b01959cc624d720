use super::dto::{GenerateInput, GeneratedRecipe};
use crate::recipes::repo_types::RecipeCategory;

pub fn recipe_prompt(input: &GenerateInput) -> String {
    let categories = RecipeCategory::ALL
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        r#"Generate a recipe based on this prompt: "{prompt}"
Ingredients: {ingredients}
Cuisine: {cuisine}
Dietary: {dietary}
Meal Type: {meal_type}

Return the result in strict JSON format:
{{
  "title": "string",
  "ingredients": ["string"],
  "instructions": ["string"],
  "category": {categories},
  "cuisine": "string",
  "mealType": "string",
  "dietary": "string",
  "prepTime": "string",
  "cookTime": "string",
  "servings": number
}}
"#,
        prompt = input.prompt,
        ingredients = input.ingredients.as_deref().unwrap_or("Any"),
        cuisine = input.cuisine.as_deref().unwrap_or("Any"),
        dietary = input.dietary.as_deref().unwrap_or("None"),
        meal_type = input.meal_type.as_deref().unwrap_or("Any"),
    )
}

pub fn image_prompt(recipe: &GeneratedRecipe) -> String {
    let key_ingredients = recipe
        .ingredients
        .iter()
        .take(5)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Generate a high-quality, photorealistic image of the dish \"{title}\".\n\
         Cuisine: {cuisine}.\n\
         Key ingredients: {key_ingredients}.\n\
         Present the dish attractively plated in a well-lit, natural setting with a clean \
         background and realistic textures.\n\
         Camera angle: 45-degree view preferred.\n\
         Do not include any text or watermarks.",
        title = recipe.title,
        cuisine = recipe.cuisine.as_deref().unwrap_or("Any"),
    )
}

/// Removes markdown code fences around a model's JSON answer.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn recipe_prompt_defaults_missing_fields() {
        let prompt = recipe_prompt(&GenerateInput {
            prompt: "cozy soup".into(),
            ingredients: None,
            cuisine: Some("French".into()),
            dietary: None,
            meal_type: None,
        });
        assert!(prompt.contains("\"cozy soup\""));
        assert!(prompt.contains("Ingredients: Any"));
        assert!(prompt.contains("Cuisine: French"));
        assert!(prompt.contains("Dietary: None"));
        assert!(prompt.contains("\"Grilling Recipes\""));
    }

    #[test]
    fn image_prompt_uses_first_five_ingredients() {
        let recipe = GeneratedRecipe {
            title: "Ratatouille".into(),
            ingredients: ["a", "b", "c", "d", "e", "f"].map(String::from).to_vec(),
            ..Default::default()
        };
        let prompt = image_prompt(&recipe);
        assert!(prompt.contains("Key ingredients: a, b, c, d, e."));
        assert!(!prompt.contains(", f"));
    }
}
