use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{NewProduct, Product, ProductRow};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn create(&self, product: NewProduct) -> anyhow::Result<Product>;

    /// Products of one owner, newest first.
    async fn list_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<Product>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;

    /// Persists the editable fields of `product`. Owner and SKU are left untouched.
    async fn update(&self, product: &Product) -> anyhow::Result<Option<Product>>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const PRODUCT_COLUMNS: &str = "id, user_id, name, sku, category, quantity, price, description, \
                               image, created_at, updated_at";

#[derive(Clone)]
pub struct PgProductCatalog {
    db: PgPool,
}

impl PgProductCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn create(&self, product: NewProduct) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (user_id, name, sku, category, quantity, price, description, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.user_id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(&product.quantity)
        .bind(&product.price)
        .bind(&product.description)
        .bind(product.image.map(Json))
        .fetch_one(&self.db)
        .await
        .context("insert product")?;
        Ok(row.into())
    }

    async fn list_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
              FROM products
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list products by owner")?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find product")?;
        Ok(row.map(Product::from))
    }

    async fn update(&self, product: &Product) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
               SET name = $2, category = $3, quantity = $4, price = $5,
                   description = $6, image = $7, updated_at = now()
             WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.quantity)
        .bind(&product.price)
        .bind(&product.description)
        .bind(product.image.clone().map(Json))
        .fetch_optional(&self.db)
        .await
        .context("update product")?;
        Ok(row.map(Product::from))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(res.rows_affected() == 1)
    }
}
