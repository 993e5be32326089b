use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Ingredient;
use crate::schema::{ingredients, recipe_ingredients};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListIngredientsParams {
    /// 1 restricts to ingredients referenced by at least one of the user's recipes
    pub assigned_only: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/ingredients",
    tag = "ingredients",
    params(ListIngredientsParams),
    responses(
        (status = 200, description = "The user's ingredients, name descending", body = [IngredientResponse]),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_ingredients(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListIngredientsParams>,
) -> impl IntoResponse {
    let assigned_only = params.assigned_only.unwrap_or(0) != 0;

    let mut conn = get_conn!(pool);

    let mut query = ingredients::table
        .filter(ingredients::user_id.eq(user.id))
        .into_boxed();

    if assigned_only {
        query = query.filter(
            ingredients::id.eq_any(recipe_ingredients::table.select(recipe_ingredients::ingredient_id)),
        );
    }

    let rows: Vec<Ingredient> = match query
        .order(ingredients::name.desc())
        .select(Ingredient::as_select())
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch ingredients: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch ingredients".to_string(),
                }),
            )
                .into_response();
        }
    };

    let response: Vec<IngredientResponse> = rows
        .into_iter()
        .map(|ingredient| IngredientResponse {
            id: ingredient.id,
            name: ingredient.name,
        })
        .collect();

    (StatusCode::OK, Json(response)).into_response()
}
