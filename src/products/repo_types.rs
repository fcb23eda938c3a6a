use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Uploaded product image as returned by the upload adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    pub file_name: String,
    pub file_path: String, // public URL
    pub file_type: String,
    pub file_size: String, // human readable, e.g. "1.5 KB"
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub quantity: String,
    pub price: String,
    pub description: String,
    pub image: Option<Json<ImageDescriptor>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub quantity: String,
    pub price: String,
    pub description: String,
    pub image: Option<ImageDescriptor>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            sku: r.sku,
            category: r.category,
            quantity: r.quantity,
            price: r.price,
            description: r.description,
            image: r.image.map(|Json(img)| img),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub user_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub quantity: String,
    pub price: String,
    pub description: String,
    pub image: Option<ImageDescriptor>,
}

/// Partial update; `None` keeps the stored value. There is no SKU field.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageDescriptor>,
}

impl ProductChanges {
    pub fn apply(&self, product: &mut Product) {
        let set = |field: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                field.clone_from(v);
            }
        };
        set(&mut product.name, &self.name);
        set(&mut product.category, &self.category);
        set(&mut product.quantity, &self.quantity);
        set(&mut product.price, &self.price);
        set(&mut product.description, &self.description);
        if let Some(image) = &self.image {
            product.image = Some(image.clone());
        }
    }
}
