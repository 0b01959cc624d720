use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecipeRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::recipes::repo_types::{sort_newest_first, NewRecipe, Recipe};
use crate::users::repo_types::{NewUser, User, UserPatch};

/// Process-local store used for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>, // by email
    recipes: RwLock<HashMap<Uuid, Recipe>>,
}

fn username_taken(users: &HashMap<String, User>, username: &str, except_email: &str) -> bool {
    users
        .values()
        .any(|u| u.email != except_email && u.username.as_deref() == Some(username))
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&new.email) {
            return Err(AppError::conflict("Email already registered"));
        }
        if let Some(username) = new.username.as_deref() {
            if username_taken(&users, username, &new.email) {
                return Err(AppError::conflict("Username already taken"));
            }
        }
        let user = new.into_user();
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn update_by_email(&self, email: &str, patch: UserPatch) -> AppResult<User> {
        if patch.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        let mut users = self.users.write().await;
        if !users.contains_key(email) {
            return Err(AppError::not_found("User not found"));
        }
        if let Some(username) = patch.username.as_deref() {
            if username_taken(&users, username, email) {
                return Err(AppError::conflict("Username already taken"));
            }
        }
        let user = users
            .get_mut(email)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        patch.apply(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn create(&self, owner: &User, new: NewRecipe) -> AppResult<Recipe> {
        let recipe = new.into_recipe(owner);
        self.recipes
            .write()
            .await
            .insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn list_all(&self) -> AppResult<Vec<Recipe>> {
        let mut all: Vec<Recipe> = self.recipes.read().await.values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn list_favorites(&self, email: &str) -> AppResult<Vec<Recipe>> {
        let mut favorites: Vec<Recipe> = self
            .recipes
            .read()
            .await
            .values()
            .filter(|r| r.is_favorite && r.user_email == email)
            .cloned()
            .collect();
        sort_newest_first(&mut favorites);
        Ok(favorites)
    }

    async fn toggle_favorite(&self, id: Uuid) -> AppResult<Recipe> {
        let mut recipes = self.recipes.write().await;
        let recipe = recipes
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Recipe not found"))?;
        recipe.is_favorite = !recipe.is_favorite;
        Ok(recipe.clone())
    }
}
