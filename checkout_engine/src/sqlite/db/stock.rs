//! The stock ledger.
//!
//! Per-variant stock only ever moves through the two conditional updates in this module. There is deliberately no
//! `set_stock` and no read-modify-write path: two checkouts racing for the last unit are decided by whichever
//! `reserve` statement runs first, and the loser's predicate fails.
use sqlx::SqliteConnection;

use crate::{db_types::ProductVariant, traits::StorefrontError};

pub async fn product_exists(product_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(found.is_some())
}

pub async fn fetch_variant(sku: &str, conn: &mut SqliteConnection) -> Result<Option<ProductVariant>, sqlx::Error> {
    let variant = sqlx::query_as(
        "SELECT variant_sku, product_id, price, stock, sold_count FROM product_variants WHERE variant_sku = $1",
    )
    .bind(sku)
    .fetch_optional(conn)
    .await?;
    Ok(variant)
}

/// Atomically takes `quantity` units off the variant's stock, bumping `sold_count` to match. Returns `false` when
/// the variant holds fewer units than requested; the row is untouched in that case.
pub async fn reserve(sku: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE product_variants SET
            stock = stock - $1,
            sold_count = sold_count + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE variant_sku = $2 AND stock >= $1"#,
    )
    .bind(quantity)
    .bind(sku)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Returns `quantity` units to the variant, undoing a reservation. `sold_count` never drops below zero, so a manual
/// stock correction in between cannot push it negative.
pub async fn release(sku: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    let result = sqlx::query(
        r#"
        UPDATE product_variants SET
            stock = stock + $1,
            sold_count = MAX(sold_count - $1, 0),
            updated_at = CURRENT_TIMESTAMP
        WHERE variant_sku = $2"#,
    )
    .bind(quantity)
    .bind(sku)
    .execute(conn)
    .await?;
    if result.rows_affected() == 1 {
        Ok(())
    } else {
        Err(StorefrontError::VariantNotFound(sku.to_string()))
    }
}
