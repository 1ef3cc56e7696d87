use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{Centavos, NewProduct, Product};

pub async fn fetch_active_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products =
        sqlx::query_as("SELECT * FROM products WHERE active = 1 ORDER BY featured DESC, display_order ASC, name ASC")
            .fetch_all(conn)
            .await?;
    Ok(products)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products_by_ids(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM products WHERE id IN (");
    let mut in_list = builder.separated(", ");
    for id in ids {
        in_list.push_bind(*id);
    }
    builder.push(") ORDER BY id ASC");
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn update_price(id: i64, price: Centavos, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("UPDATE products SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(price)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(product)
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, description, price, category, weight_grams, stock, featured, active, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.category)
    .bind(product.weight_grams)
    .bind(product.stock)
    .bind(product.featured)
    .bind(product.active)
    .bind(product.display_order)
    .fetch_one(conn)
    .await?;
    Ok(product)
}
