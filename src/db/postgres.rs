use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{RecipeRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::recipes::repo_types::{NewRecipe, Recipe, RecipeCategory};
use crate::users::repo_types::{NewUser, User, UserPatch};

const USER_COLUMNS: &str = "id, name, username, email, bio, password_hash, avatar_url, created_at";
const RECIPE_COLUMNS: &str = "id, user_id, user_email, title, image, ingredients, instructions, \
     cuisine, prep_time, cook_time, meal_type, dietary, category, servings, \
     is_favorite, is_popular, is_seasonal, created_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) {
        if let Err(e) = sqlx::migrate!("./migrations").run(&self.pool).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }
}

/// Maps a unique-constraint violation on `users` to `Conflict`.
fn user_write_error(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(c) if c.contains("username") => AppError::conflict("Username already taken"),
                _ => AppError::conflict("Email already registered"),
            };
        }
    }
    AppError::Internal(anyhow::Error::new(e).context("write user"))
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        let user = new.into_user();
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.bio)
            .bind(&user.password_hash)
            .bind(&user.avatar_url)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(user_write_error)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn update_by_email(&self, email: &str, patch: UserPatch) -> AppResult<User> {
        if patch.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        let sql = format!(
            r#"
            UPDATE users
               SET name       = COALESCE($2, name),
                   username   = COALESCE($3, username),
                   bio        = COALESCE($4, bio),
                   avatar_url = COALESCE($5, avatar_url)
             WHERE email = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(patch.name)
            .bind(patch.username)
            .bind(patch.bio)
            .bind(patch.avatar_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(user_write_error)?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}

/// Row shape of `recipes`; the category is stored as its display name.
#[derive(Debug, FromRow)]
pub(crate) struct RecipeRow {
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
    pub category: Option<String>,
    pub servings: Option<i32>,
    pub is_favorite: bool,
    pub is_popular: bool,
    pub is_seasonal: bool,
    pub created_at: OffsetDateTime,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = anyhow::Error;

    fn try_from(r: RecipeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            user_email: r.user_email,
            title: r.title,
            image: r.image,
            ingredients: r.ingredients,
            instructions: r.instructions,
            cuisine: r.cuisine,
            prep_time: r.prep_time,
            cook_time: r.cook_time,
            meal_type: r.meal_type,
            dietary: r.dietary,
            category: r.category.as_deref().map(str::parse::<RecipeCategory>).transpose()?,
            servings: r.servings,
            is_favorite: r.is_favorite,
            is_popular: r.is_popular,
            is_seasonal: r.is_seasonal,
            created_at: r.created_at,
        })
    }
}

fn into_recipes(rows: Vec<RecipeRow>) -> AppResult<Vec<Recipe>> {
    rows.into_iter()
        .map(|r| Recipe::try_from(r).map_err(AppError::from))
        .collect()
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn create(&self, owner: &User, new: NewRecipe) -> AppResult<Recipe> {
        let r = new.into_recipe(owner);
        let sql = format!(
            "INSERT INTO recipes ({RECIPE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {RECIPE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(r.id)
            .bind(r.user_id)
            .bind(&r.user_email)
            .bind(&r.title)
            .bind(&r.image)
            .bind(&r.ingredients)
            .bind(&r.instructions)
            .bind(&r.cuisine)
            .bind(&r.prep_time)
            .bind(&r.cook_time)
            .bind(&r.meal_type)
            .bind(&r.dietary)
            .bind(r.category.map(|c| c.as_str()))
            .bind(r.servings)
            .bind(r.is_favorite)
            .bind(r.is_popular)
            .bind(r.is_seasonal)
            .bind(r.created_at)
            .fetch_one(&self.pool)
            .await
            .context("insert recipe")?;
        Ok(Recipe::try_from(row)?)
    }

    async fn list_all(&self) -> AppResult<Vec<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("list recipes")?;
        into_recipes(rows)
    }

    async fn list_favorites(&self, email: &str) -> AppResult<Vec<Recipe>> {
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes \
             WHERE is_favorite AND user_email = $1 \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .context("list favorite recipes")?;
        into_recipes(rows)
    }

    async fn toggle_favorite(&self, id: Uuid) -> AppResult<Recipe> {
        let sql = format!(
            "UPDATE recipes SET is_favorite = NOT is_favorite WHERE id = $1 \
             RETURNING {RECIPE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("toggle favorite")?
            .ok_or_else(|| AppError::not_found("Recipe not found"))?;
        Ok(Recipe::try_from(row)?)
    }
}
