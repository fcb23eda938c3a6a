use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use uuid::Uuid;

use super::{
    dto::ProductForm,
    repo_types::{ImageDescriptor, NewProduct, ProductChanges},
};
use crate::{
    error::{AppError, AppResult},
    images::services::UploadItem,
};

pub const IMAGE_FIELD: &str = "image";

/// Only the owner may read or modify an owner-scoped record.
pub fn ensure_owner(owner_id: Uuid, requester_id: Uuid) -> AppResult<()> {
    if owner_id == requester_id {
        Ok(())
    } else {
        Err(AppError::auth("User not authorized"))
    }
}

pub async fn read_form(mut mp: Multipart) -> AppResult<ProductForm> {
    let mut form = ProductForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Invalid image upload: {e}")))?;
            // browsers send an empty part when no file was picked
            if !body.is_empty() {
                form.image = Some(UploadItem {
                    file_name,
                    content_type,
                    body,
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::validation(format!("Invalid field {name}: {e}")))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

#[async_trait]
impl<S> FromRequest<S> for ProductForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state).await?;
        read_form(mp).await
    }
}

pub fn new_product(
    user_id: Uuid,
    form: &ProductForm,
    image: Option<ImageDescriptor>,
) -> AppResult<NewProduct> {
    let required = |name: &str| form.text(name);
    match (
        required("name"),
        required("sku"),
        required("category"),
        required("quantity"),
        required("price"),
        required("description"),
    ) {
        (
            Some(name),
            Some(sku),
            Some(category),
            Some(quantity),
            Some(price),
            Some(description),
        ) => Ok(NewProduct {
            user_id,
            name,
            sku,
            category,
            quantity,
            price,
            description,
            image,
        }),
        _ => Err(AppError::validation("Fields are required")),
    }
}

/// Checks every required text field on a create request, before any upload.
pub fn validate_new(form: &ProductForm) -> AppResult<()> {
    new_product(Uuid::nil(), form, None).map(|_| ())
}

/// Builds the update set. Fields that are sent must not be blank; `sku` is ignored.
pub fn product_changes(
    form: &ProductForm,
    image: Option<ImageDescriptor>,
) -> AppResult<ProductChanges> {
    let field = |name: &str, label: &str| -> AppResult<Option<String>> {
        match form.supplied(name) {
            Some(v) if v.is_empty() => Err(AppError::validation(format!("{label} is required"))),
            other => Ok(other),
        }
    };
    Ok(ProductChanges {
        name: field("name", "Name")?,
        category: field("category", "Category")?,
        quantity: field("quantity", "Quantity")?,
        price: field("price", "Price")?,
        description: field("description", "Description")?,
        image,
    })
}
