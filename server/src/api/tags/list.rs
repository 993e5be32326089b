use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Tag;
use crate::schema::{recipe_tags, tags};
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
pub struct ListTagsParams {
    /// 1 restricts to tags referenced by at least one of the user's recipes
    pub assigned_only: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/tags",
    tag = "tags",
    params(ListTagsParams),
    responses(
        (status = 200, description = "The user's tags, name descending", body = [TagResponse]),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tags(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListTagsParams>,
) -> impl IntoResponse {
    let assigned_only = params.assigned_only.unwrap_or(0) != 0;

    let mut conn = get_conn!(pool);

    let mut query = tags::table
        .filter(tags::user_id.eq(user.id))
        .into_boxed();

    if assigned_only {
        query = query.filter(tags::id.eq_any(recipe_tags::table.select(recipe_tags::tag_id)));
    }

    let rows: Vec<Tag> = match query
        .order(tags::name.desc())
        .select(Tag::as_select())
        .load(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to fetch tags: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch tags".to_string(),
                }),
            )
                .into_response();
        }
    };

    let response: Vec<TagResponse> = rows
        .into_iter()
        .map(|tag| TagResponse {
            id: tag.id,
            name: tag.name,
        })
        .collect();

    (StatusCode::OK, Json(response)).into_response()
}
