use crate::api::ErrorResponse;
use crate::auth::{create_session, verify_password};
use crate::db::DbPool;
use crate::get_conn;
use crate::models::User;
use crate::schema::users;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::normalize_email;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

fn invalid_credentials() -> axum::response::Response {
    // This endpoint is two-outcome: 200 with a token, or 400.
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Unable to authenticate with provided credentials".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/users/token",
    tag = "users",
    request_body(content = TokenRequest, example = json!({"email": "user@example.com", "password": "password"})),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing or invalid credentials", body = ErrorResponse)
    )
)]
pub async fn create_token(
    State(pool): State<Arc<DbPool>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> impl IntoResponse {
    // A body missing either field is the same failure as wrong credentials
    let Ok(Json(req)) = payload else {
        return invalid_credentials();
    };

    if req.email.trim().is_empty() || req.password.is_empty() {
        return invalid_credentials();
    }

    let mut conn = get_conn!(pool);

    let email = normalize_email(req.email.trim());

    let user: User = match users::table
        .filter(users::email.eq(&email))
        .filter(users::is_active.eq(true))
        .select(User::as_select())
        .first(&mut conn)
    {
        Ok(u) => u,
        Err(_) => return invalid_credentials(),
    };

    if !verify_password(&req.password, &user.password_hash) {
        return invalid_credentials();
    }

    let token = match create_session(&mut conn, user.id) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create session".to_string(),
                }),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(TokenResponse { token })).into_response()
}

#[cfg(test)]
mod tests {
    use crate::db::test_pool;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post_token(body: &str) -> StatusCode {
        let app = crate::api::users::router().with_state(Arc::new(test_pool()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/token")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn missing_password_field_is_bad_request() {
        assert_eq!(
            post_token(r#"{"email":"user@example.com"}"#).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        assert_eq!(post_token("not json").await, StatusCode::BAD_REQUEST);
    }
}
