use crate::api::ErrorResponse;
use crate::auth::hash_password;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::NewUser;
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

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// Field-level validation, run before any write.
pub fn validate(req: &CreateUserRequest) -> Result<(), String> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err("Enter a valid email address".to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if req.name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body(content = CreateUserRequest, example = json!({"email": "user@example.com", "password": "password", "name": "User"})),
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request or email already registered", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(pool): State<Arc<DbPool>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> impl IntoResponse {
    // A missing or mistyped field is a validation failure, not a 422
    let req = match payload {
        Ok(Json(req)) => req,
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

    if let Err(message) = validate(&req) {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to hash password".to_string(),
                }),
            )
                .into_response()
        }
    };

    let email = normalize_email(req.email.trim());

    let mut conn = get_conn!(pool);

    let new_user = NewUser {
        email: &email,
        password_hash: &password_hash,
        name: req.name.trim(),
    };

    let user: crate::models::User = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(crate::models::User::as_returning())
        .get_result(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            // Duplicate email is a plain validation failure, not a conflict
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "A user with this email already exists".to_string(),
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create user".to_string(),
                }),
            )
                .into_response();
        }
    };

    (
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
            name: user.name,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, name: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(validate(&request("test@example.com", "testpass", "Test")).is_ok());
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate(&request("test@example.com", "pw", "Test")).is_err());
        // Boundary: exactly 6 characters is allowed
        assert!(validate(&request("test@example.com", "sixchr", "Test")).is_ok());
    }

    #[test]
    fn rejects_bad_email() {
        assert!(validate(&request("", "testpass", "Test")).is_err());
        assert!(validate(&request("no-at-sign", "testpass", "Test")).is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(validate(&request("test@example.com", "testpass", "  ")).is_err());
    }

    mod http {
        use crate::db::test_pool;
        use axum::body::Body;
        use axum::http::{header, Method, Request, StatusCode};
        use std::sync::Arc;
        use tower::ServiceExt;

        #[tokio::test]
        async fn missing_name_field_is_bad_request() {
            let app = crate::api::users::router().with_state(Arc::new(test_pool()));
            let response = app
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(
                            r#"{"email":"user@example.com","password":"testpass"}"#,
                        ))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
