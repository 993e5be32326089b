use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewRecipe, Recipe};
use crate::schema::recipes;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::nested::{set_recipe_ingredients, set_recipe_tags, validate_names};
use super::nested::{IngredientName, TagName};
use super::serialize::{load_attrs, to_detail, RecipeDetail};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub time_minutes: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub tags: Vec<TagName>,
    #[serde(default)]
    pub ingredients: Vec<IngredientName>,
}

pub fn validate(request: &CreateRecipeRequest) -> Result<(), String> {
    if request.title.trim().is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    if request.time_minutes < 1 {
        return Err("time_minutes must be a positive integer".to_string());
    }
    validate_names("Tag", request.tags.iter().map(|t| t.name.as_str()))?;
    validate_names(
        "Ingredient",
        request.ingredients.iter().map(|i| i.name.as_str()),
    )?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    payload: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> impl IntoResponse {
    // A missing or mistyped field is a validation failure, not a 422
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response()
        }
    };

    if let Err(message) = validate(&request) {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
    }

    let mut conn = get_conn!(pool);

    let tag_names: Vec<String> = request.tags.into_iter().map(|t| t.name).collect();
    let ingredient_names: Vec<String> =
        request.ingredients.into_iter().map(|i| i.name).collect();

    // Recipe row and nested tag/ingredient resolution commit as one unit
    let result: Result<RecipeDetail, diesel::result::Error> = conn.transaction(|conn| {
        let new_recipe = NewRecipe {
            user_id: user.id,
            title: request.title.trim(),
            description: &request.description,
            time_minutes: request.time_minutes,
            link: &request.link,
            instructions: &request.instructions,
        };

        let recipe: Recipe = diesel::insert_into(recipes::table)
            .values(&new_recipe)
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        set_recipe_tags(conn, user.id, recipe.id, &tag_names)?;
        set_recipe_ingredients(conn, user.id, recipe.id, &ingredient_names)?;

        let mut attrs = load_attrs(conn, &[recipe.id])?;
        Ok(to_detail(recipe, &mut attrs))
    });

    match result {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create recipe: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, time_minutes: i32) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.to_string(),
            time_minutes,
            description: String::new(),
            link: String::new(),
            instructions: String::new(),
            tags: Vec::new(),
            ingredients: Vec::new(),
        }
    }

    #[test]
    fn accepts_minimal_payload() {
        assert!(validate(&request("Chocolate cheesecake", 30)).is_ok());
    }

    #[test]
    fn rejects_empty_title() {
        assert!(validate(&request("   ", 30)).is_err());
    }

    #[test]
    fn rejects_non_positive_time() {
        assert!(validate(&request("Soup", 0)).is_err());
        assert!(validate(&request("Soup", -5)).is_err());
        assert!(validate(&request("Soup", 1)).is_ok());
    }

    #[test]
    fn rejects_blank_nested_names() {
        let mut req = request("Soup", 10);
        req.tags.push(TagName {
            name: " ".to_string(),
        });
        assert!(validate(&req).is_err());
    }
}
