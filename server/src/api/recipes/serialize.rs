use std::collections::HashMap;

use crate::models::Recipe;
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, tags};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagOut {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientOut {
    pub id: i64,
    pub name: String,
}

/// List shape: omits description and instructions, keeps the image path.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub link: String,
    pub image: Option<String>,
    pub tags: Vec<TagOut>,
    pub ingredients: Vec<IngredientOut>,
}

/// Detail shape: the full recipe, used by create/get/update/upload-image.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub link: String,
    pub instructions: String,
    pub image: Option<String>,
    pub tags: Vec<TagOut>,
    pub ingredients: Vec<IngredientOut>,
}

/// Nested tag/ingredient rows for a batch of recipes, keyed by recipe id.
#[derive(Debug, Default)]
pub struct RecipeAttrs {
    tags: HashMap<i64, Vec<TagOut>>,
    ingredients: HashMap<i64, Vec<IngredientOut>>,
}

impl RecipeAttrs {
    fn tags_for(&mut self, recipe_id: i64) -> Vec<TagOut> {
        self.tags.remove(&recipe_id).unwrap_or_default()
    }

    fn ingredients_for(&mut self, recipe_id: i64) -> Vec<IngredientOut> {
        self.ingredients.remove(&recipe_id).unwrap_or_default()
    }
}

/// Load nested tags and ingredients for the given recipes in two queries.
pub fn load_attrs(conn: &mut PgConnection, recipe_ids: &[i64]) -> QueryResult<RecipeAttrs> {
    let mut attrs = RecipeAttrs::default();

    let tag_rows: Vec<(i64, i64, String)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(recipe_ids))
        .select((recipe_tags::recipe_id, tags::id, tags::name))
        .order(tags::name.asc())
        .load(conn)?;

    for (recipe_id, id, name) in tag_rows {
        attrs
            .tags
            .entry(recipe_id)
            .or_default()
            .push(TagOut { id, name });
    }

    let ingredient_rows: Vec<(i64, i64, String)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(recipe_ids))
        .select((
            recipe_ingredients::recipe_id,
            ingredients::id,
            ingredients::name,
        ))
        .order(ingredients::name.asc())
        .load(conn)?;

    for (recipe_id, id, name) in ingredient_rows {
        attrs
            .ingredients
            .entry(recipe_id)
            .or_default()
            .push(IngredientOut { id, name });
    }

    Ok(attrs)
}

pub fn to_summary(recipe: Recipe, attrs: &mut RecipeAttrs) -> RecipeSummary {
    RecipeSummary {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        link: recipe.link,
        image: recipe.image,
        tags: attrs.tags_for(recipe.id),
        ingredients: attrs.ingredients_for(recipe.id),
    }
}

pub fn to_detail(recipe: Recipe, attrs: &mut RecipeAttrs) -> RecipeDetail {
    RecipeDetail {
        id: recipe.id,
        title: recipe.title,
        description: recipe.description,
        time_minutes: recipe.time_minutes,
        link: recipe.link,
        instructions: recipe.instructions,
        image: recipe.image,
        tags: attrs.tags_for(recipe.id),
        ingredients: attrs.ingredients_for(recipe.id),
    }
}

/// Fetch one of the user's recipes as the detail shape. Ownership is part of
/// the lookup, so a foreign recipe id looks identical to a missing one.
pub fn fetch_detail(
    conn: &mut PgConnection,
    user_id: i64,
    recipe_id: i64,
) -> QueryResult<Option<RecipeDetail>> {
    let recipe: Option<Recipe> = recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::user_id.eq(user_id))
        .select(Recipe::as_select())
        .first(conn)
        .optional()?;

    let Some(recipe) = recipe else {
        return Ok(None);
    };

    let mut attrs = load_attrs(conn, &[recipe.id])?;
    Ok(Some(to_detail(recipe, &mut attrs)))
}
