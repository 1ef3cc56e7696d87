use thiserror::Error;

use crate::db_types::{Centavos, NewProduct, Product};

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for sale")]
    ProductUnavailable(i64),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: i64 },
    #[error("The cart total is too large")]
    CartTotalTooLarge,
}

impl From<sqlx::Error> for CatalogApiError {
    fn from(e: sqlx::Error) -> Self {
        CatalogApiError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Products on sale: featured first, then by display order and name.
    async fn fetch_active_products(&self) -> Result<Vec<Product>, CatalogApiError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogApiError>;

    /// Fetches the given products, active or not. Unknown ids are skipped.
    async fn fetch_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, CatalogApiError>;

    /// Changes the catalog price. Prices already captured on order items are not affected.
    async fn update_product_price(&self, id: i64, price: Centavos) -> Result<Product, CatalogApiError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError>;
}
