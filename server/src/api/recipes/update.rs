use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::RecipeChangeset;
use crate::schema::recipes;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::nested::{set_recipe_ingredients, set_recipe_tags, validate_names};
use super::nested::{IngredientName, TagName};
use super::serialize::{fetch_detail, RecipeDetail};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub instructions: Option<String>,
    /// `Some(vec![])` clears all tag associations; `None` leaves them unchanged
    pub tags: Option<Vec<TagName>>,
    /// `Some(vec![])` clears all ingredient associations; `None` leaves them unchanged
    pub ingredients: Option<Vec<IngredientName>>,
}

pub fn validate(request: &UpdateRecipeRequest, partial: bool) -> Result<(), String> {
    if !partial {
        if request.title.is_none() {
            return Err("title is required".to_string());
        }
        if request.time_minutes.is_none() {
            return Err("time_minutes is required".to_string());
        }
    }
    if let Some(ref title) = request.title {
        if title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
    }
    if let Some(time_minutes) = request.time_minutes {
        if time_minutes < 1 {
            return Err("time_minutes must be a positive integer".to_string());
        }
    }
    if let Some(ref tags) = request.tags {
        validate_names("Tag", tags.iter().map(|t| t.name.as_str()))?;
    }
    if let Some(ref ingredients) = request.ingredients {
        validate_names("Ingredient", ingredients.iter().map(|i| i.name.as_str()))?;
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn put_recipe(
    user: AuthUser,
    state: State<Arc<DbPool>>,
    path: Path<i64>,
    payload: Result<Json<UpdateRecipeRequest>, JsonRejection>,
) -> impl IntoResponse {
    update_recipe(user, state, path, payload, false).await
}

#[utoipa::path(
    patch,
    path = "/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn patch_recipe(
    user: AuthUser,
    state: State<Arc<DbPool>>,
    path: Path<i64>,
    payload: Result<Json<UpdateRecipeRequest>, JsonRejection>,
) -> impl IntoResponse {
    update_recipe(user, state, path, payload, true).await
}

async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateRecipeRequest>, JsonRejection>,
    partial: bool,
) -> axum::response::Response {
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

    if let Err(message) = validate(&request, partial) {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
    }

    let mut conn = get_conn!(pool);

    // Ownership-scoped existence check before any mutation
    let exists: Option<i64> = match recipes::table
        .filter(recipes::id.eq(id))
        .filter(recipes::user_id.eq(user.id))
        .select(recipes::id)
        .first(&mut conn)
        .optional()
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if exists.is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response();
    }

    let tag_names: Option<Vec<String>> = request
        .tags
        .map(|tags| tags.into_iter().map(|t| t.name).collect());
    let ingredient_names: Option<Vec<String>> = request
        .ingredients
        .map(|ingredients| ingredients.into_iter().map(|i| i.name).collect());

    let result: Result<Option<RecipeDetail>, diesel::result::Error> =
        conn.transaction(|conn| {
            let changes = RecipeChangeset {
                title: request.title.as_deref().map(str::trim),
                description: request.description.as_deref(),
                time_minutes: request.time_minutes,
                link: request.link.as_deref(),
                instructions: request.instructions.as_deref(),
                updated_at: Utc::now(),
            };

            diesel::update(recipes::table.find(id))
                .set(&changes)
                .execute(conn)?;

            if let Some(ref names) = tag_names {
                set_recipe_tags(conn, user.id, id, names)?;
            }
            if let Some(ref names) = ingredient_names {
                set_recipe_ingredients(conn, user.id, id, names)?;
            }

            fetch_detail(conn, user.id, id)
        });

    match result {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to update recipe: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request() -> UpdateRecipeRequest {
        UpdateRecipeRequest {
            title: None,
            time_minutes: None,
            description: None,
            link: None,
            instructions: None,
            tags: None,
            ingredients: None,
        }
    }

    #[test]
    fn partial_update_allows_missing_required_fields() {
        assert!(validate(&empty_request(), true).is_ok());
    }

    #[test]
    fn full_update_requires_title_and_time() {
        assert!(validate(&empty_request(), false).is_err());

        let mut req = empty_request();
        req.title = Some("Soup".to_string());
        assert!(validate(&req, false).is_err());

        req.time_minutes = Some(15);
        assert!(validate(&req, false).is_ok());
    }

    #[test]
    fn provided_fields_are_still_validated_when_partial() {
        let mut req = empty_request();
        req.time_minutes = Some(0);
        assert!(validate(&req, true).is_err());

        let mut req = empty_request();
        req.title = Some("  ".to_string());
        assert!(validate(&req, true).is_err());
    }

    #[test]
    fn empty_tag_list_is_valid_and_means_clear() {
        let mut req = empty_request();
        req.tags = Some(Vec::new());
        assert!(validate(&req, true).is_ok());
    }
}
