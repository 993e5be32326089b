use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::models::User;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::db::get_user_from_token;

/// Authenticated user, resolved from the `Authorization: Bearer <token>` header.
///
/// Handlers that name this extractor only run for requests carrying a live
/// session token; everything else is rejected with 401 before the handler body.
pub struct AuthUser(pub User);

#[derive(Debug, PartialEq)]
pub enum AuthError {
    /// No Authorization header, or one that is not a `Bearer` credential.
    MissingToken,
    /// The header value is not valid ASCII.
    MalformedHeader,
    /// The token does not match a live session for an active user.
    InvalidToken,
}

impl AuthError {
    fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authentication credentials were not provided",
            AuthError::MalformedHeader => "Invalid Authorization header",
            AuthError::InvalidToken => "Invalid or expired token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: self.message().to_string(),
            }),
        )
            .into_response()
    }
}

/// Pulls the bearer token out of the request headers without touching the database.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

    value.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let pool = Arc::<DbPool>::from_ref(state);

        let user = get_user_from_token(&pool, token)
            .await
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn extracts_bearer_token() {
        let parts = parts_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts), Ok("abc123"));
    }

    #[test]
    fn missing_header_is_rejected() {
        let parts = parts_with_auth(None);
        assert_eq!(bearer_token(&parts), Err(AuthError::MissingToken));
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let parts = parts_with_auth(Some("Token abc123"));
        assert_eq!(bearer_token(&parts), Err(AuthError::MissingToken));

        // Scheme comparison is exact, including the trailing space
        let parts = parts_with_auth(Some("Bearerabc123"));
        assert_eq!(bearer_token(&parts), Err(AuthError::MissingToken));
    }
}
