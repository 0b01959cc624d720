use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::User;

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=300&width=400";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecipeCategory {
    #[serde(rename = "Quick & Easy")]
    QuickAndEasy,
    #[serde(rename = "Breakfast Favorites")]
    BreakfastFavorites,
    #[serde(rename = "Healthy Salads")]
    HealthySalads,
    #[serde(rename = "Comfort Food")]
    ComfortFood,
    #[serde(rename = "Meat Lovers")]
    MeatLovers,
    Vegetarian,
    #[serde(rename = "Grilling Recipes")]
    GrillingRecipes,
    #[serde(rename = "International Cuisine")]
    InternationalCuisine,
}

impl RecipeCategory {
    pub const ALL: [RecipeCategory; 8] = [
        RecipeCategory::QuickAndEasy,
        RecipeCategory::BreakfastFavorites,
        RecipeCategory::HealthySalads,
        RecipeCategory::ComfortFood,
        RecipeCategory::MeatLovers,
        RecipeCategory::Vegetarian,
        RecipeCategory::GrillingRecipes,
        RecipeCategory::InternationalCuisine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeCategory::QuickAndEasy => "Quick & Easy",
            RecipeCategory::BreakfastFavorites => "Breakfast Favorites",
            RecipeCategory::HealthySalads => "Healthy Salads",
            RecipeCategory::ComfortFood => "Comfort Food",
            RecipeCategory::MeatLovers => "Meat Lovers",
            RecipeCategory::Vegetarian => "Vegetarian",
            RecipeCategory::GrillingRecipes => "Grilling Recipes",
            RecipeCategory::InternationalCuisine => "International Cuisine",
        }
    }
}

impl fmt::Display for RecipeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipeCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown recipe category {s:?}"))
    }
}

/// Recipe record as stored by every backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub title: String,
    pub image: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cuisine: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub meal_type: Option<String>,
    pub dietary: Option<String>,
    pub category: Option<RecipeCategory>,
    pub servings: Option<i32>,
    pub is_favorite: bool,
    pub is_popular: bool,
    pub is_seasonal: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Optional descriptive fields attached to a recipe at save time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMetadata {
    pub cuisine: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub meal_type: Option<String>,
    pub dietary: Option<String>,
    pub category: Option<RecipeCategory>,
    pub servings: Option<i32>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub metadata: RecipeMetadata,
}

impl NewRecipe {
    /// Builds the stored record for `owner`: not a favorite, created now.
    pub fn into_recipe(self, owner: &User) -> Recipe {
        let m = self.metadata;
        Recipe {
            id: Uuid::new_v4(),
            user_id: owner.id,
            user_email: owner.email.clone(),
            title: self.title,
            image: m.image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            ingredients: self.ingredients,
            instructions: self.instructions,
            cuisine: m.cuisine,
            prep_time: m.prep_time,
            cook_time: m.cook_time,
            meal_type: m.meal_type,
            dietary: m.dietary,
            category: m.category,
            servings: m.servings,
            is_favorite: false,
            is_popular: false,
            is_seasonal: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Newest first; ties keep their relative order.
pub fn sort_newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
