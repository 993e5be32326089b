pub mod delete;
pub mod list;
pub mod update;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for ingredient endpoints (mounted at /ingredients)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_ingredients))
        .route(
            "/{id}",
            axum::routing::patch(update::update_ingredient).delete(delete::delete_ingredient),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_ingredients,
        update::update_ingredient,
        delete::delete_ingredient
    ),
    components(schemas(
        list::IngredientResponse,
        update::UpdateIngredientRequest,
    ))
)]
pub struct ApiDoc;
