//! Cart collaborator boundary. The cart itself is maintained elsewhere; checkout only ever deletes the lines it has
//! just turned into an order.
use sqlx::{QueryBuilder, SqliteConnection};

pub async fn remove_items(
    customer_id: &str,
    product_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if product_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new("DELETE FROM cart_items WHERE customer_id = ");
    builder.push_bind(customer_id);
    builder.push(" AND product_id IN (");
    let mut ids = builder.separated(", ");
    for id in product_ids {
        ids.push_bind(id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn add_item(
    customer_id: &str,
    product_id: &str,
    variant_sku: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO cart_items (customer_id, product_id, variant_sku, quantity) VALUES ($1, $2, $3, $4)")
        .bind(customer_id)
        .bind(product_id)
        .bind(variant_sku)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn count_items(customer_id: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}
