use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::images::{detect_format, recipe_image_path, remove_image, store_image, MAX_FILE_SIZE};
use crate::schema::recipes;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use utoipa::ToSchema;

use super::serialize::{fetch_detail, RecipeDetail};

/// Points the recipe at a stored image path. Returns whether a row was
/// actually updated; the recipe may have been deleted since the ownership
/// check at the top of the handler.
fn set_image_path(
    conn: &mut PgConnection,
    user_id: i64,
    recipe_id: i64,
    image_path: &str,
) -> QueryResult<bool> {
    let rows = diesel::update(
        recipes::table
            .filter(recipes::id.eq(recipe_id))
            .filter(recipes::user_id.eq(user_id)),
    )
    .set((
        recipes::image.eq(Some(image_path)),
        recipes::updated_at.eq(Utc::now()),
    ))
    .execute(conn)?;

    Ok(rows > 0)
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadImageRequest {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/recipes/{id}/upload-image",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body(content_type = "multipart/form-data", content = UploadImageRequest),
    responses(
        (status = 200, description = "Image uploaded successfully", body = RecipeDetail),
        (status = 400, description = "Payload is not a valid image", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_image(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    // 404 before reading the body; ownership is part of the lookup
    let previous_image: Option<Option<String>> = match recipes::table
        .filter(recipes::id.eq(id))
        .filter(recipes::user_id.eq(user.id))
        .select(recipes::image)
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

    let Some(previous_image) = previous_image else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response();
    };

    // Find the "image" field in the multipart body
    let (filename, data) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("image") {
                    continue;
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => break (filename, bytes),
                    Err(e) => {
                        tracing::warn!("Field read error: {}", e);
                        return (
                            e.status(),
                            Json(ErrorResponse {
                                error: format!("Failed to read file data: {}", e.body_text()),
                            }),
                        )
                            .into_response();
                    }
                }
            }
            Ok(None) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "No image provided".to_string(),
                    }),
                )
                    .into_response()
            }
            Err(e) => {
                tracing::warn!("Multipart read error: {}", e);
                return (
                    e.status(),
                    Json(ErrorResponse {
                        error: format!("Failed to read multipart data: {}", e.body_text()),
                    }),
                )
                    .into_response();
            }
        }
    };

    if data.len() > MAX_FILE_SIZE {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("File too large. Maximum size is {} bytes", MAX_FILE_SIZE),
            }),
        )
            .into_response();
    }

    // Reject non-image payloads before touching the recipe row
    let format = match detect_format(&data) {
        Ok(f) => f,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e })).into_response()
        }
    };

    let image_path = recipe_image_path(&filename, format);

    if let Err(e) = store_image(&image_path, &data) {
        tracing::error!("Failed to store image {}: {}", image_path, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to store image".to_string(),
            }),
        )
            .into_response();
    }

    match set_image_path(&mut conn, user.id, id, &image_path) {
        Ok(true) => {}
        Ok(false) => {
            // Recipe vanished between the ownership check and the update;
            // drop the blob we just wrote so it does not leak
            remove_image(&image_path);
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Recipe not found".to_string(),
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to update recipe image: {}", e);
            remove_image(&image_path);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    // Replacing an image releases the previous blob, best-effort
    if let Some(old_path) = previous_image {
        if old_path != image_path {
            remove_image(&old_path);
        }
    }

    match fetch_detail(&mut conn, user.id, id) {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Recipe not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch recipe: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::{NewRecipe, NewUser};
    use crate::schema::users;

    #[test]
    fn set_image_path_reports_whether_a_row_was_updated() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        conn.test_transaction::<_, diesel::result::Error, _>(|conn| {
            let user_id: i64 = diesel::insert_into(users::table)
                .values(&NewUser {
                    email: "upload-image@example.com",
                    password_hash: "x",
                    name: "Test",
                })
                .returning(users::id)
                .get_result(conn)?;

            let recipe_id: i64 = diesel::insert_into(recipes::table)
                .values(&NewRecipe {
                    user_id,
                    title: "Test recipe",
                    description: "",
                    time_minutes: 10,
                    link: "",
                    instructions: "",
                })
                .returning(recipes::id)
                .get_result(conn)?;

            assert!(set_image_path(conn, user_id, recipe_id, "uploads/recipe/a.png")?);

            let stored: Option<String> = recipes::table
                .find(recipe_id)
                .select(recipes::image)
                .first(conn)?;
            assert_eq!(stored.as_deref(), Some("uploads/recipe/a.png"));

            // Once the row is gone the update reports no match
            diesel::delete(recipes::table.find(recipe_id)).execute(conn)?;
            assert!(!set_image_path(conn, user_id, recipe_id, "uploads/recipe/b.png")?);

            Ok(())
        });
    }
}
