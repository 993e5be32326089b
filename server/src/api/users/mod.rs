pub mod create;
pub mod token;

use crate::AppState;
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /users endpoints (no auth required)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create::create_user))
        .route("/token", post(token::create_token))
}

/// Normalize an email for storage and lookup: the domain part is
/// case-insensitive, the local part is kept as given.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(create::create_user, token::create_token),
    components(schemas(
        create::CreateUserRequest,
        create::UserResponse,
        token::TokenRequest,
        token::TokenResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("Test@EXAMPLE.COM"), "Test@example.com");
    }

    #[test]
    fn normalize_leaves_plain_strings_alone() {
        assert_eq!(normalize_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn normalize_handles_at_in_local_part() {
        assert_eq!(normalize_email("a@b@EXample.org"), "a@b@example.org");
    }
}
