//! `SqliteDatabase` is the storefront's SQLite backend. It implements all the traits defined in the [`traits`]
//! module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, products};
use crate::{
    api::order_objects::{OrderQueryFilter, PaymentSource, PaymentUpdate, ShippingUpdate},
    db_types::{Centavos, NewOrder, NewOrderItem, NewProduct, Order, OrderId, OrderItem, OrderStatusType, Product},
    shipping::generate_tracking_code,
    traits::{
        CatalogApiError,
        CatalogManagement,
        GatewayUpdateResult,
        OrderFlowError,
        OrderManagement,
        StorefrontDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `SPG_DATABASE_URL` from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_items(&self, order: NewOrder, items: Vec<NewOrderItem>) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let count = items.len();
        for item in items {
            orders::insert_order_item(&order.id, item, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {} saved with {count} items. Total {}", order.id, order.total_amount);
        Ok(order)
    }

    async fn attach_preference(&self, order_id: &OrderId, preference_id: &str) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let result = match orders::attach_preference(order_id, preference_id, &mut tx).await? {
            Some(order) => {
                trace!("🗃️ Preference {preference_id} attached to order {order_id}");
                Ok(order)
            },
            None => match orders::fetch_order_by_id(order_id, &mut tx).await? {
                Some(order) => Err(OrderFlowError::OrderNotPending(order_id.clone(), order.status)),
                None => Err(OrderFlowError::OrderNotFound(order_id.clone())),
            },
        };
        tx.commit().await?;
        result
    }

    async fn apply_gateway_update(
        &self,
        update: &PaymentUpdate,
        source: PaymentSource,
    ) -> Result<GatewayUpdateResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let result = match orders::apply_gateway_status(update, source, &mut tx).await? {
            Some(order) => GatewayUpdateResult::Updated(order),
            None => match orders::fetch_order_by_id(&update.order_id, &mut tx).await? {
                None => GatewayUpdateResult::NotFound,
                Some(order) if order.status == update.status => {
                    let order = orders::backfill_gateway_fields(update, &mut tx).await?.unwrap_or(order);
                    GatewayUpdateResult::Unchanged(order)
                },
                Some(order) => GatewayUpdateResult::Stale { order, requested: update.status },
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let current = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if current.status == status {
            debug!("🗃️ Order {order_id} is already {status}. Update skipped.");
            return Err(OrderFlowError::OrderModificationNoOp);
        }
        let tracking_code = generate_tracking_code(Utc::now());
        let order = orders::update_order_status(order_id, status, &tracking_code, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        info!("🗃️ Order {order_id} status changed from {} to {status}", current.status);
        Ok(order)
    }

    async fn update_shipping(&self, order_id: &OrderId, update: ShippingUpdate) -> Result<Order, OrderFlowError> {
        if update.is_empty() {
            debug!("🗃️ No shipping fields to update for order {order_id}. Update request skipped.");
            return Err(OrderFlowError::OrderModificationNoOp);
        }
        let mut conn = self.pool.acquire().await?;
        orders::update_shipping(order_id, update, &mut conn)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_active_products(&self) -> Result<Vec<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_active_products(&mut conn).await?;
        Ok(products)
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products_by_ids(ids, &mut conn).await?;
        Ok(products)
    }

    async fn update_product_price(&self, id: i64, price: Centavos) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::update_price(id, price, &mut conn).await?.ok_or(CatalogApiError::ProductNotFound(id))?;
        debug!("🗃️ Price of product #{id} is now {price}");
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        Ok(product)
    }
}
