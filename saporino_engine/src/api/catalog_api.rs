use std::fmt::Debug;

use log::*;

use crate::{
    cart::{Cart, MAX_LINE_QUANTITY},
    db_types::{Centavos, GrindType, Product},
    traits::{CatalogApiError, CatalogManagement},
};

/// Reads the catalog, and builds carts priced from it.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn products(&self) -> Result<Vec<Product>, CatalogApiError> {
        self.db.fetch_active_products().await
    }

    pub async fn product_by_id(&self, id: i64) -> Result<Option<Product>, CatalogApiError> {
        self.db.fetch_product(id).await
    }

    /// Builds a cart from `(product_id, quantity)` pairs using current catalog prices. Clients never supply prices.
    ///
    /// Every product must exist and be active, and every quantity must be between 1 and [`MAX_LINE_QUANTITY`].
    /// Repeated ids add up, and the sum is held to the same limit.
    pub async fn price_cart(&self, lines: &[(i64, i64)]) -> Result<Cart, CatalogApiError> {
        if let Some((product_id, quantity)) =
            lines.iter().copied().find(|(_, q)| *q <= 0 || *q > MAX_LINE_QUANTITY)
        {
            return Err(CatalogApiError::InvalidQuantity { product_id, quantity });
        }
        let ids: Vec<i64> = lines.iter().map(|(id, _)| *id).collect();
        let products = self.available_products(&ids).await?;
        let mut cart = Cart::new();
        for (id, quantity) in lines {
            if let Some(product) = products.iter().find(|p| p.id == *id) {
                let current = cart.lines().iter().find(|l| l.product_id == *id).map(|l| l.quantity).unwrap_or(0);
                let combined = current + quantity;
                if combined > MAX_LINE_QUANTITY {
                    return Err(CatalogApiError::InvalidQuantity { product_id: *id, quantity: combined });
                }
                if current == 0 {
                    cart.add(product);
                }
                cart.set_quantity(*id, combined);
            }
        }
        let total = cart.checked_total().ok_or(CatalogApiError::CartTotalTooLarge)?;
        trace!("🛒️ Priced cart with {} lines: {total}", cart.lines().len());
        Ok(cart)
    }

    /// Builds a subscription box: one of each selected coffee, at the flat subscription price.
    pub async fn subscription_cart(&self, product_ids: &[i64], grind_type: GrindType) -> Result<Cart, CatalogApiError> {
        let products = self.available_products(product_ids).await?;
        let mut cart = Cart::new();
        for id in product_ids {
            if let Some(product) = products.iter().find(|p| p.id == *id) {
                cart.add_subscription(product, grind_type);
            }
        }
        Ok(cart)
    }

    pub async fn update_price(&self, id: i64, price: Centavos) -> Result<Product, CatalogApiError> {
        if price < Centavos::from(0) {
            return Err(CatalogApiError::InvalidPrice(price.to_string()));
        }
        let product = self.db.update_product_price(id, price).await?;
        info!("🛒️ Product #{id} ({}) repriced to {price}", product.name);
        Ok(product)
    }

    async fn available_products(&self, ids: &[i64]) -> Result<Vec<Product>, CatalogApiError> {
        let products = self.db.fetch_products_by_ids(ids).await?;
        for id in ids {
            match products.iter().find(|p| p.id == *id) {
                None => return Err(CatalogApiError::ProductNotFound(*id)),
                Some(p) if !p.active => return Err(CatalogApiError::ProductUnavailable(*id)),
                Some(_) => {},
            }
        }
        Ok(products)
    }
}
