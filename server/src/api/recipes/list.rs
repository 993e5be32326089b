use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use super::query::{load_recipes, parse_id_csv, RecipeQuery};
use super::serialize::{load_attrs, to_summary, RecipeSummary};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Comma-separated tag ids; keeps recipes with at least one of them
    pub tags: Option<String>,
    /// Comma-separated ingredient ids; keeps recipes with at least one of them
    pub ingredients: Option<String>,
}

fn parse_filter(raw: Option<&str>) -> Result<Option<Vec<i64>>, String> {
    match raw {
        // An empty parameter imposes no restriction, same as an absent one
        Some(s) if !s.is_empty() => parse_id_csv(s).map(Some),
        _ => Ok(None),
    }
}

#[utoipa::path(
    get,
    path = "/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "The user's recipes, newest first", body = [RecipeSummary]),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> impl IntoResponse {
    let tag_ids = match parse_filter(params.tags.as_deref()) {
        Ok(ids) => ids,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response()
        }
    };

    let ingredient_ids = match parse_filter(params.ingredients.as_deref()) {
        Ok(ids) => ids,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response()
        }
    };

    let spec = RecipeQuery {
        user_id: user.id,
        tag_ids,
        ingredient_ids,
    };

    let mut conn = get_conn!(pool);

    let recipes = match load_recipes(&mut conn, &spec) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    let recipe_ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut attrs = match load_attrs(&mut conn, &recipe_ids) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Failed to fetch recipe attributes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    let summaries: Vec<RecipeSummary> = recipes
        .into_iter()
        .map(|r| to_summary(r, &mut attrs))
        .collect();

    (StatusCode::OK, Json(summaries)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_filters_are_no_restriction() {
        assert_eq!(parse_filter(None), Ok(None));
        assert_eq!(parse_filter(Some("")), Ok(None));
    }

    #[test]
    fn csv_filter_parses_to_ids() {
        assert_eq!(parse_filter(Some("3,1")), Ok(Some(vec![3, 1])));
    }

    #[test]
    fn malformed_filter_is_an_error() {
        assert!(parse_filter(Some("3,abc")).is_err());
    }
}
