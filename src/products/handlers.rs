use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ProductForm, ProductId},
    repo_types::Product,
    services::{ensure_owner, new_product, product_changes, validate_new},
};
use crate::{
    auth::AuthUser,
    dto::MessageResponse,
    error::{AppError, AppResult},
    images::services::{upload_image, PRODUCT_IMAGE_FOLDER},
    state::AppState,
};

/// Largest accepted request body, images included.
pub const MAX_BODY_BYTES: usize = 30 * 1024 * 1024;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Loads a product and checks that the caller owns it.
async fn owned_product(state: &AppState, id: Uuid, requester: Uuid) -> AppResult<Product> {
    let product = state
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    ensure_owner(product.user_id, requester)?;
    Ok(product)
}

#[instrument(skip(state, auth, form), fields(user_id = %auth.id))]
pub async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    mut form: ProductForm,
) -> AppResult<(StatusCode, Json<Product>)> {
    validate_new(&form)?;

    let image = match form.image.take() {
        Some(item) => {
            Some(upload_image(state.storage.as_ref(), PRODUCT_IMAGE_FOLDER, item).await?)
        }
        None => None,
    };

    let product = state
        .products
        .create(new_product(auth.id, &form, image)?)
        .await?;

    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_products(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.products.list_by_owner(auth.id).await?;
    Ok(Json(products))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ProductId(id): ProductId,
) -> AppResult<Json<Product>> {
    Ok(Json(owned_product(&state, id, auth.id).await?))
}

#[instrument(skip(state, auth, form), fields(user_id = %auth.id))]
pub async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ProductId(id): ProductId,
    mut form: ProductForm,
) -> AppResult<Json<Product>> {
    let mut product = owned_product(&state, id, auth.id).await?;
    // validate before uploading so a bad form leaves no orphaned image
    product_changes(&form, None)?;

    let image = match form.image.take() {
        Some(item) => {
            Some(upload_image(state.storage.as_ref(), PRODUCT_IMAGE_FOLDER, item).await?)
        }
        None => None,
    };
    product_changes(&form, image)?.apply(&mut product);

    let updated = state
        .products
        .update(&product)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    info!(product_id = %updated.id, "product updated");
    Ok(Json(updated))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ProductId(id): ProductId,
) -> AppResult<Json<MessageResponse>> {
    let product = owned_product(&state, id, auth.id).await?;
    if !state.products.delete(product.id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    info!(product_id = %product.id, "product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
