//! DynamoDB backend. Users are keyed by `email`, recipes by `id`; every other
//! lookup is a filtered scan.

use std::collections::HashMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_sdk_dynamodb::{
    config::Region,
    types::{AttributeValue, ReturnValue},
    Client,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use super::{RecipeRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::recipes::repo_types::{sort_newest_first, NewRecipe, Recipe, RecipeCategory};
use crate::users::repo_types::{NewUser, User, UserPatch};

type Item = HashMap<String, AttributeValue>;

pub struct DynamoStore {
    client: Client,
    users_table: String,
    recipes_table: String,
}

impl DynamoStore {
    pub async fn connect(
        region: &str,
        endpoint: Option<&str>,
        users_table: &str,
        recipes_table: &str,
    ) -> Self {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        Self {
            client: Client::new(&shared),
            users_table: users_table.to_string(),
            recipes_table: recipes_table.to_string(),
        }
    }

    async fn scan(
        &self,
        table: &str,
        filter: &str,
        values: Vec<(&str, AttributeValue)>,
    ) -> anyhow::Result<Vec<Item>> {
        let mut req = self.client.scan().table_name(table);
        if !filter.is_empty() {
            req = req.filter_expression(filter);
        }
        for (name, value) in values {
            req = req.expression_attribute_values(name, value);
        }
        req.into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await
            .with_context(|| format!("scan {table}"))
    }

    async fn username_taken(&self, username: &str, except_email: &str) -> anyhow::Result<bool> {
        let hits = self
            .scan(
                &self.users_table,
                "username = :u AND email <> :e",
                vec![(":u", s(username)), (":e", s(except_email))],
            )
            .await?;
        Ok(!hits.is_empty())
    }

    async fn get_recipe(&self, id: Uuid) -> anyhow::Result<Option<Recipe>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.recipes_table)
            .key("id", s(id.to_string()))
            .send()
            .await
            .context("get recipe")?;
        out.item().map(recipe_from_item).transpose()
    }
}

#[async_trait]
impl UserRepo for DynamoStore {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        if let Some(username) = new.username.as_deref() {
            if self.username_taken(username, &new.email).await? {
                return Err(AppError::conflict("Username already taken"));
            }
        }
        let user = new.into_user();
        let res = self
            .client
            .put_item()
            .table_name(&self.users_table)
            .set_item(Some(user_to_item(&user)?))
            .condition_expression("attribute_not_exists(email)")
            .send()
            .await;

        match res {
            Ok(_) => Ok(user),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(AppError::conflict("Email already registered"))
            }
            Err(e) => Err(anyhow::Error::new(e).context("put user").into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.users_table)
            .key("email", s(email))
            .send()
            .await
            .context("get user")?;
        Ok(out.item().map(user_from_item).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let items = self
            .scan(&self.users_table, "id = :id", vec![(":id", s(id.to_string()))])
            .await?;
        Ok(items.first().map(user_from_item).transpose()?)
    }

    async fn update_by_email(&self, email: &str, patch: UserPatch) -> AppResult<User> {
        if patch.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        if self.find_by_email(email).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        if let Some(username) = patch.username.as_deref() {
            if self.username_taken(username, email).await? {
                return Err(AppError::conflict("Username already taken"));
            }
        }

        let fields = [
            ("name", patch.name),
            ("username", patch.username),
            ("bio", patch.bio),
            ("avatar_url", patch.avatar_url),
        ];
        let mut req = self
            .client
            .update_item()
            .table_name(&self.users_table)
            .key("email", s(email))
            .condition_expression("attribute_exists(email)")
            .return_values(ReturnValue::AllNew);
        let mut sets = Vec::new();
        for (attr, value) in fields {
            if let Some(value) = value {
                sets.push(format!("#{attr} = :{attr}"));
                req = req
                    .expression_attribute_names(format!("#{attr}"), attr)
                    .expression_attribute_values(format!(":{attr}"), s(value));
            }
        }
        let res = req
            .update_expression(format!("SET {}", sets.join(", ")))
            .send()
            .await;

        match res {
            Ok(out) => {
                let item = out
                    .attributes()
                    .ok_or_else(|| anyhow!("update returned no attributes"))?;
                Ok(user_from_item(item)?)
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(AppError::not_found("User not found"))
            }
            Err(e) => Err(anyhow::Error::new(e).context("update user").into()),
        }
    }
}

#[async_trait]
impl RecipeRepo for DynamoStore {
    async fn create(&self, owner: &User, new: NewRecipe) -> AppResult<Recipe> {
        let recipe = new.into_recipe(owner);
        self.client
            .put_item()
            .table_name(&self.recipes_table)
            .set_item(Some(recipe_to_item(&recipe)?))
            .send()
            .await
            .context("put recipe")?;
        Ok(recipe)
    }

    async fn list_all(&self) -> AppResult<Vec<Recipe>> {
        let items = self.scan(&self.recipes_table, "", Vec::new()).await?;
        let mut recipes = items
            .iter()
            .map(recipe_from_item)
            .collect::<anyhow::Result<Vec<_>>>()?;
        // scans come back in hash order
        sort_newest_first(&mut recipes);
        Ok(recipes)
    }

    async fn list_favorites(&self, email: &str) -> AppResult<Vec<Recipe>> {
        let items = self
            .scan(
                &self.recipes_table,
                "is_favorite = :t AND user_email = :e",
                vec![(":t", AttributeValue::Bool(true)), (":e", s(email))],
            )
            .await?;
        let mut recipes = items
            .iter()
            .map(recipe_from_item)
            .collect::<anyhow::Result<Vec<_>>>()?;
        sort_newest_first(&mut recipes);
        Ok(recipes)
    }

    async fn toggle_favorite(&self, id: Uuid) -> AppResult<Recipe> {
        // Read-then-write: concurrent toggles on one id may lose an update.
        let current = self
            .get_recipe(id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe not found"))?;

        let res = self
            .client
            .update_item()
            .table_name(&self.recipes_table)
            .key("id", s(id.to_string()))
            .update_expression("SET is_favorite = :v")
            .expression_attribute_values(":v", AttributeValue::Bool(!current.is_favorite))
            .condition_expression("attribute_exists(id)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match res {
            Ok(out) => {
                let item = out
                    .attributes()
                    .ok_or_else(|| anyhow!("update returned no attributes"))?;
                Ok(recipe_from_item(item)?)
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(AppError::not_found("Recipe not found"))
            }
            Err(e) => Err(anyhow::Error::new(e).context("toggle favorite").into()),
        }
    }
}

// ---- item conversion ----

fn s(v: impl Into<String>) -> AttributeValue {
    AttributeValue::S(v.into())
}

fn put_opt(item: &mut Item, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        item.insert(key.to_string(), s(v.clone()));
    }
}

fn string_list(values: &[String]) -> AttributeValue {
    AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
}

fn req_s(item: &Item, key: &str) -> anyhow::Result<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| anyhow!("item attribute {key} missing or not a string"))
}

fn opt_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

fn list_s(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_l().ok())
        .map(|l| l.iter().filter_map(|v| v.as_s().ok().cloned()).collect())
        .unwrap_or_default()
}

fn flag(item: &Item, key: &str) -> bool {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

fn timestamp(item: &Item, key: &str) -> anyhow::Result<OffsetDateTime> {
    let raw = req_s(item, key)?;
    OffsetDateTime::parse(&raw, &Rfc3339).with_context(|| format!("parse {key} {raw:?}"))
}

fn uuid(item: &Item, key: &str) -> anyhow::Result<Uuid> {
    let raw = req_s(item, key)?;
    Uuid::parse_str(&raw).with_context(|| format!("parse {key} {raw:?}"))
}

pub(crate) fn user_to_item(u: &User) -> anyhow::Result<Item> {
    let mut item = Item::new();
    item.insert("email".into(), s(&u.email));
    item.insert("id".into(), s(u.id.to_string()));
    item.insert("name".into(), s(&u.name));
    item.insert("password_hash".into(), s(&u.password_hash));
    item.insert("created_at".into(), s(u.created_at.format(&Rfc3339)?));
    put_opt(&mut item, "username", &u.username);
    put_opt(&mut item, "bio", &u.bio);
    put_opt(&mut item, "avatar_url", &u.avatar_url);
    Ok(item)
}

pub(crate) fn user_from_item(item: &Item) -> anyhow::Result<User> {
    Ok(User {
        id: uuid(item, "id")?,
        name: req_s(item, "name")?,
        username: opt_s(item, "username"),
        email: req_s(item, "email")?,
        bio: opt_s(item, "bio"),
        password_hash: req_s(item, "password_hash")?,
        avatar_url: opt_s(item, "avatar_url"),
        created_at: timestamp(item, "created_at")?,
    })
}

pub(crate) fn recipe_to_item(r: &Recipe) -> anyhow::Result<Item> {
    let mut item = Item::new();
    item.insert("id".into(), s(r.id.to_string()));
    item.insert("user_id".into(), s(r.user_id.to_string()));
    item.insert("user_email".into(), s(&r.user_email));
    item.insert("title".into(), s(&r.title));
    item.insert("image".into(), s(&r.image));
    item.insert("ingredients".into(), string_list(&r.ingredients));
    item.insert("instructions".into(), string_list(&r.instructions));
    put_opt(&mut item, "cuisine", &r.cuisine);
    put_opt(&mut item, "prep_time", &r.prep_time);
    put_opt(&mut item, "cook_time", &r.cook_time);
    put_opt(&mut item, "meal_type", &r.meal_type);
    put_opt(&mut item, "dietary", &r.dietary);
    if let Some(category) = r.category {
        item.insert("category".into(), s(category.to_string()));
    }
    if let Some(servings) = r.servings {
        item.insert("servings".into(), AttributeValue::N(servings.to_string()));
    }
    item.insert("is_favorite".into(), AttributeValue::Bool(r.is_favorite));
    item.insert("is_popular".into(), AttributeValue::Bool(r.is_popular));
    item.insert("is_seasonal".into(), AttributeValue::Bool(r.is_seasonal));
    item.insert("created_at".into(), s(r.created_at.format(&Rfc3339)?));
    Ok(item)
}

pub(crate) fn recipe_from_item(item: &Item) -> anyhow::Result<Recipe> {
    let servings = item
        .get("servings")
        .and_then(|v| v.as_n().ok())
        .map(|n| n.parse::<i32>())
        .transpose()
        .context("parse servings")?;

    Ok(Recipe {
        id: uuid(item, "id")?,
        user_id: uuid(item, "user_id")?,
        user_email: req_s(item, "user_email")?,
        title: req_s(item, "title")?,
        image: req_s(item, "image")?,
        ingredients: list_s(item, "ingredients"),
        instructions: list_s(item, "instructions"),
        cuisine: opt_s(item, "cuisine"),
        prep_time: opt_s(item, "prep_time"),
        cook_time: opt_s(item, "cook_time"),
        meal_type: opt_s(item, "meal_type"),
        dietary: opt_s(item, "dietary"),
        category: opt_s(item, "category")
            .map(|c| c.parse::<RecipeCategory>())
            .transpose()?,
        servings,
        is_favorite: flag(item, "is_favorite"),
        is_popular: flag(item, "is_popular"),
        is_seasonal: flag(item, "is_seasonal"),
        created_at: timestamp(item, "created_at")?,
    })
}
