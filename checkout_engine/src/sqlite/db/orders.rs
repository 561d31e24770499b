use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrderItem, NewOrderRequest, Order, OrderNumber, OrderPricing, PaymentDetails, StatusHistoryEntry},
    traits::StorefrontError,
};

/// Inserts a new order row under the given order number. This is not atomic on its own; callers embed it in a
/// transaction together with the stock reservation and pass `&mut tx` as the connection argument.
///
/// A unique-constraint violation on the order number is reported as [`StorefrontError::OrderAlreadyExists`] so the
/// caller can retry with a fresh number.
pub async fn insert_order(
    request: &NewOrderRequest,
    pricing: OrderPricing,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let addr = &request.shipping_address;
    let method = request.payment_method.unwrap_or(crate::db_types::PaymentMethod::BankTransfer);
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                full_name,
                phone,
                street,
                ward,
                district,
                city,
                zip_code,
                payment_method,
                subtotal,
                shipping_fee,
                tax,
                discount,
                total_amount,
                notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *;
        "#,
    )
    .bind(number)
    .bind(&request.customer_id)
    .bind(&addr.full_name)
    .bind(&addr.phone)
    .bind(&addr.street)
    .bind(&addr.ward)
    .bind(&addr.district)
    .bind(&addr.city)
    .bind(&addr.zip_code)
    .bind(method)
    .bind(pricing.subtotal)
    .bind(pricing.shipping_fee)
    .bind(pricing.tax)
    .bind(pricing.discount)
    .bind(pricing.total_amount())
    .bind(&request.notes)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => StorefrontError::OrderAlreadyExists(number.clone()),
        _ => StorefrontError::from(e),
    })?;
    Ok(order)
}

pub async fn insert_items(
    order_id: i64,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    for item in items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, variant_sku, quantity, price) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order_id)
        .bind(&item.product_id)
        .bind(&item.variant_sku)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Appends one entry to the order's audit log. The log is append-only; there is no update or delete counterpart to
/// this function anywhere in the crate.
pub async fn insert_status_history(
    order_id: i64,
    status: &str,
    note: &str,
    updated_by: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query("INSERT INTO order_status_history (order_id, status, note, updated_by) VALUES ($1, $2, $3, $4)")
        .bind(order_id)
        .bind(status)
        .bind(note)
        .bind(updated_by)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// The oldest pending bank-transfer order whose number equals or contains `code`. The payment-status filter is what
/// makes webhook redelivery a no-op rather than a double-apply.
pub async fn fetch_pending_transfer_order(
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE payment_method = 'bank_transfer'
          AND payment_status = 'pending'
          AND (order_number = $1 OR order_number LIKE $2)
        ORDER BY created_at ASC
        LIMIT 1"#,
    )
    .bind(code)
    .bind(format!("%{code}%"))
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Like [`fetch_pending_transfer_order`] without the payment-status filter. Used to recognise webhook replays.
pub async fn fetch_transfer_order_matching(
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE payment_method = 'bank_transfer'
          AND (order_number = $1 OR order_number LIKE $2)
        ORDER BY created_at ASC
        LIMIT 1"#,
    )
    .bind(code)
    .bind(format!("%{code}%"))
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The conditional settle. Exactly one caller can ever see a row come back: the guard and the write are a single
/// statement, so a concurrent cancel (or a replayed webhook) gets `None` instead of a second settlement.
pub async fn mark_paid(
    order_id: i64,
    details: &PaymentDetails,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            payment_status = 'paid',
            transaction_id = $2,
            paid_at = $3,
            payment_gateway = $4,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND payment_status = 'pending'
        RETURNING *"#,
    )
    .bind(order_id)
    .bind(&details.transaction_id)
    .bind(details.paid_at)
    .bind(&details.payment_gateway)
    .fetch_optional(conn)
    .await?;
    trace!("📝️ mark_paid({order_id}) -> {}", if order.is_some() { "settled" } else { "no-op" });
    Ok(order)
}

/// The conditional cancel, mirror image of [`mark_paid`]. The status guard means a settled order can never be
/// cancelled by the sweep, no matter how the writes interleave.
pub async fn cancel_unpaid(
    order_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = 'cancelled',
            payment_status = 'failed',
            cancel_reason = $2,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND payment_status = 'pending' AND status IN ('pending', 'confirmed')
        RETURNING *"#,
    )
    .bind(order_id)
    .bind(reason)
    .fetch_optional(conn)
    .await?;
    trace!("📝️ cancel_unpaid({order_id}) -> {}", if order.is_some() { "cancelled" } else { "no-op" });
    Ok(order)
}

/// Bank-transfer orders still awaiting payment that were created before `cutoff`.
///
/// `unixepoch` is used on both sides because rows written by `CURRENT_TIMESTAMP` and timestamps bound from chrono
/// carry different text formats; comparing them lexically would be wrong.
pub async fn overdue_transfer_orders(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE payment_method = 'bank_transfer'
          AND payment_status = 'pending'
          AND status IN ('pending', 'confirmed')
          AND unixepoch(created_at) < unixepoch($1)
        ORDER BY created_at ASC"#,
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<crate::db_types::OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_history(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
