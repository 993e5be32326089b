pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod nested;
pub mod query;
pub mod serialize;
pub mod update;
pub mod upload_image;

use crate::images::MAX_FILE_SIZE;
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for recipe endpoints (mounted at /recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::put_recipe)
                .patch(update::patch_recipe)
                .delete(delete::delete_recipe),
        )
        .route(
            "/{id}/upload-image",
            post(upload_image::upload_image).layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024)),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_recipe,
        update::put_recipe,
        update::patch_recipe,
        delete::delete_recipe,
        upload_image::upload_image,
    ),
    components(schemas(
        create::CreateRecipeRequest,
        update::UpdateRecipeRequest,
        upload_image::UploadImageRequest,
        nested::TagName,
        nested::IngredientName,
        serialize::TagOut,
        serialize::IngredientOut,
        serialize::RecipeSummary,
        serialize::RecipeDetail,
    ))
)]
pub struct ApiDoc;
