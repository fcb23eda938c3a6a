use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;
use uuid::Uuid;

use crate::{error::AppError, images::services::UploadItem};

/// Product id from the path. An id that does not parse names no product.
#[derive(Debug, Clone, Copy)]
pub struct ProductId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ProductId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                debug!(error = %e, "unparseable product id");
                AppError::not_found("Product not found")
            })?;
        Ok(Self(id))
    }
}

/// Parsed multipart body of a create or update request.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadItem>,
}

impl ProductForm {
    /// Trimmed value of a text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Trimmed value of a field that was sent, even if blank.
    pub fn supplied(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim().to_string())
    }
}
