use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    api::order_objects::{OrderQueryFilter, PaymentSource, PaymentUpdate, ShippingUpdate},
    db_types::{AccountInfo, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType},
    status::Correction,
};

/// Inserts a new order header with status `pending`. This is not atomic on its own. Run it inside a transaction
/// together with [`insert_order_item`] and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let (account_type, cpf, birth_date, cnpj, inscricao_estadual, email_xml) = match order.account {
        Some(AccountInfo::Personal { cpf, birth_date }) => (Some("PF"), Some(cpf), Some(birth_date), None, None, None),
        Some(AccountInfo::Business { cnpj, inscricao_estadual, email_xml }) => {
            (Some("PJ"), None, None, Some(cnpj), Some(inscricao_estadual), Some(email_xml))
        },
        None => (None, None, None, None, None, None),
    };
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                customer_name,
                customer_email,
                customer_phone,
                shipping_postal_code,
                shipping_address,
                shipping_number,
                shipping_complement,
                shipping_neighborhood,
                shipping_city,
                shipping_state,
                account_type,
                cpf,
                birth_date,
                cnpj,
                inscricao_estadual,
                email_xml,
                total_amount,
                shipping_cost,
                freight_type,
                status,
                order_type,
                subscription_shipping_day,
                grind_type
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, 'pending',
                $21, $22, $23
            )
            RETURNING *;
        "#,
    )
    .bind(order.id.as_str())
    .bind(order.customer_name)
    .bind(order.customer_email)
    .bind(order.customer_phone)
    .bind(order.shipping_postal_code)
    .bind(order.shipping_address)
    .bind(order.shipping_number)
    .bind(order.shipping_complement)
    .bind(order.shipping_neighborhood)
    .bind(order.shipping_city)
    .bind(order.shipping_state)
    .bind(account_type)
    .bind(cpf)
    .bind(birth_date)
    .bind(cnpj)
    .bind(inscricao_estadual)
    .bind(email_xml)
    .bind(order.total_amount)
    .bind(order.shipping_cost)
    .bind(order.freight_type)
    .bind(order.order_type)
    .bind(order.subscription_shipping_day)
    .bind(order.grind_type)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_item(
    order_id: &OrderId,
    item: NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price, subtotal, grind_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.subtotal)
    .bind(item.grind_type)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_by_id(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in descending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(email) = query.customer_email {
        where_clause.push("customer_email = ");
        where_clause.push_bind_unseparated(email);
    }
    if let Some(order_type) = query.order_type {
        where_clause.push("order_type = ");
        where_clause.push_bind_unseparated(order_type);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.as_str());
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at DESC, rowid DESC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Stores the gateway preference id on a `pending` order. Returns `None` if there is no pending order with this id.
pub async fn attach_preference(
    order_id: &OrderId,
    preference_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET mercadopago_preference_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = \
         'pending' RETURNING *",
    )
    .bind(preference_id)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Conditionally moves an order to the status in `update`.
///
/// The order is only touched if its current status is one of `update.status.gateway_sources()`, or, for the webhook,
/// matches one of `update.status.webhook_corrections()`. The check and the write are a single statement, so no other
/// writer can slip in between. Returns `None` if nothing was updated.
///
/// Webhook writes mark the status as confirmed and overwrite the gateway ids. Return page writes clear the flag and
/// only fill in ids that are still empty. `paid_at` is only stamped by a webhook approval.
pub async fn apply_gateway_status(
    update: &PaymentUpdate,
    source: PaymentSource,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sources = update.status.gateway_sources();
    let corrections: &[(OrderStatusType, Correction)] = match source {
        PaymentSource::Webhook => update.status.webhook_corrections(),
        PaymentSource::ReturnPage => &[],
    };
    if sources.is_empty() && corrections.is_empty() {
        trace!("🗃️ A gateway cannot set status {}. Nothing to update.", update.status);
        return Ok(None);
    }
    let confirmed = source == PaymentSource::Webhook;
    let status = update.status.as_str();
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(status);
    builder.push(", status_confirmed = ");
    builder.push_bind(confirmed);
    for (column, value) in [
        ("mercadopago_payment_id", update.payment_id.as_deref()),
        ("mercadopago_collection_id", update.collection_id.as_deref()),
        ("mercadopago_collection_status", update.collection_status.as_deref()),
        ("payment_method", update.payment_method.as_deref()),
    ] {
        builder.push(format!(", {column} = COALESCE("));
        if confirmed {
            builder.push_bind(value);
            builder.push(format!(", {column})"));
        } else {
            builder.push(format!("{column}, "));
            builder.push_bind(value);
            builder.push(")");
        }
    }
    builder.push(", paid_at = CASE WHEN ");
    builder.push_bind(status);
    builder.push(" = 'approved' AND ");
    builder.push_bind(confirmed);
    builder.push(" THEN COALESCE(paid_at, CURRENT_TIMESTAMP) WHEN ");
    builder.push_bind(status);
    builder.push(" = 'rejected' THEN NULL ELSE paid_at END");
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE id = ");
    builder.push_bind(update.order_id.as_str());
    builder.push(" AND (");
    if sources.is_empty() {
        builder.push("0");
    } else {
        builder.push("status IN (");
        let mut in_list = builder.separated(", ");
        for source in sources {
            in_list.push_bind(source.as_str());
        }
        builder.push(")");
    }
    for (current, rule) in corrections {
        builder.push(" OR (status = ");
        builder.push_bind(current.as_str());
        match rule {
            Correction::Always => {},
            Correction::Unconfirmed => {
                builder.push(" AND status_confirmed = 0");
            },
            Correction::UnconfirmedOrSamePayment => {
                builder.push(" AND (status_confirmed = 0 OR mercadopago_payment_id = ");
                builder.push_bind(update.payment_id.as_deref());
                builder.push(")");
            },
        }
        builder.push(")");
    }
    builder.push(") RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(order)
}

/// Fills in gateway ids that are still empty, without changing the status. Used when a repeated notification for
/// the current status carries ids the first one lacked.
pub async fn backfill_gateway_fields(
    update: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                mercadopago_payment_id = COALESCE(mercadopago_payment_id, $1),
                mercadopago_collection_id = COALESCE(mercadopago_collection_id, $2),
                mercadopago_collection_status = COALESCE(mercadopago_collection_status, $3),
                payment_method = COALESCE(payment_method, $4)
            WHERE id = $5
            RETURNING *;
        "#,
    )
    .bind(update.payment_id.as_deref())
    .bind(update.collection_id.as_deref())
    .bind(update.collection_status.as_deref())
    .bind(update.payment_method.as_deref())
    .bind(update.order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Sets the status without any transition check. Moving to `shipped` stamps `shipped_at` and keeps an existing
/// tracking code, falling back to `tracking_code`. Moving to `approved` stamps `paid_at` if it is still empty. Admin
/// writes count as confirmed.
pub async fn update_order_status(
    order_id: &OrderId,
    status: OrderStatusType,
    tracking_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = ?1,
                status_confirmed = 1,
                shipped_at = CASE WHEN ?1 = 'shipped' THEN COALESCE(shipped_at, CURRENT_TIMESTAMP) ELSE shipped_at END,
                tracking_code = CASE WHEN ?1 = 'shipped' THEN COALESCE(tracking_code, ?2) ELSE tracking_code END,
                paid_at = CASE WHEN ?1 = 'approved' THEN COALESCE(paid_at, CURRENT_TIMESTAMP) ELSE paid_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?3
            RETURNING *;
        "#,
    )
    .bind(status.as_str())
    .bind(tracking_code)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn update_shipping(
    order_id: &OrderId,
    update: ShippingUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(carrier) = update.carrier_name {
        set_clause.push("carrier_name = ");
        set_clause.push_bind_unseparated(carrier);
    }
    if let Some(code) = update.tracking_code {
        set_clause.push("tracking_code = ");
        set_clause.push_bind_unseparated(code);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" RETURNING *");
    debug!("🗃️ Updating shipping details for order {order_id}");
    let order = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(order)
}
