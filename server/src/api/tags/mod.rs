pub mod delete;
pub mod list;
pub mod update;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for tag endpoints (mounted at /tags)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_tags))
        .route(
            "/{id}",
            axum::routing::patch(update::update_tag).delete(delete::delete_tag),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(list::list_tags, update::update_tag, delete::delete_tag),
    components(schemas(
        list::TagResponse,
        update::UpdateTagRequest,
    ))
)]
pub struct ApiDoc;
