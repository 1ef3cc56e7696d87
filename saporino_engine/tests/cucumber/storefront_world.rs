use std::collections::HashMap;

use cucumber::World;
use log::*;
use saporino_engine::{
    db_types::{Order, Product},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct StorefrontWorld {
    pub system: Option<StorefrontSystem>,
    pub products: HashMap<String, Product>,
    /// Orders placed during the scenario, keyed by the alias used in the feature file.
    pub orders: HashMap<String, Order>,
}

#[derive(Debug)]
pub struct StorefrontSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub catalog: CatalogApi<SqliteDatabase>,
}

impl StorefrontWorld {
    pub fn system(&self) -> &StorefrontSystem {
        self.system.as_ref().expect("Storefront not initialised")
    }

    pub fn order(&self, alias: &str) -> &Order {
        self.orders.get(alias).unwrap_or_else(|| panic!("No order called {alias}"))
    }
}

impl StorefrontSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        debug!("🚀️ Created database: {url}");
        let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
        let catalog = CatalogApi::new(db.clone());
        Self { db_path: url, db, orders, catalog }
    }
}
