#![allow(dead_code)]
use saporino_engine::{
    db_types::{AccountInfo, Centavos, NewProduct, Product},
    events::EventProducers,
    order_objects::{CheckoutCustomer, ShippingAddress},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    CatalogApi,
    CatalogManagement,
    OrderFlowApi,
    SqliteDatabase,
    StorefrontDatabase,
};

pub struct TestSystem {
    pub url: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub catalog: CatalogApi<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let orders = OrderFlowApi::new(db.clone(), producers);
        let catalog = CatalogApi::new(db.clone());
        Self { url, db, orders, catalog }
    }

    /// Seeds two coffees: #1 at R$ 35,00 and #2 at R$ 50,00.
    pub async fn seed_products(&self) -> (Product, Product) {
        let p1 = self.db.insert_product(NewProduct::new("Catuaí Amarelo", Centavos::from(3500))).await.unwrap();
        let p2 = self.db.insert_product(NewProduct::new("Bourbon Vermelho", Centavos::from(5000)).featured()).await.unwrap();
        (p1, p2)
    }

    pub async fn tear_down(mut self) {
        self.db.close().await.unwrap();
        drop_database(&self.url).await;
    }
}

pub fn customer() -> CheckoutCustomer {
    CheckoutCustomer {
        name: "Ana Souza".into(),
        email: "ana@example.com".into(),
        phone: "(11) 98765-4321".into(),
        address: ShippingAddress {
            postal_code: "01310-100".into(),
            street: "Avenida Paulista".into(),
            number: "1578".into(),
            complement: Some("apto 12".into()),
            neighborhood: "Bela Vista".into(),
            city: "São Paulo".into(),
            state: "São Paulo".into(),
        },
        account: None,
    }
}

pub fn personal_account() -> AccountInfo {
    AccountInfo::Personal { cpf: "123.456.789-09".into(), birth_date: "1990-05-17".into() }
}

pub fn business_account() -> AccountInfo {
    AccountInfo::Business {
        cnpj: "12.345.678/0001-95".into(),
        inscricao_estadual: "123.456.789.110".into(),
        email_xml: "nfe@padaria.com.br".into(),
    }
}
