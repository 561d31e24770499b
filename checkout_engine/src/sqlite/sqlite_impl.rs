//! `SqliteDatabase` is a concrete implementation of a storefront checkout backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the [`crate::traits`] module.
//! Transactions are composed here out of the low-level functions in [`super::db`]; the invariants (conditional stock
//! moves, state-guarded settlement and cancellation) live in the SQL those functions run.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{cart, db_url, new_pool, orders, stock};
use crate::{
    db_types::{
        NewOrderItem,
        NewOrderRequest,
        Order,
        OrderItem,
        OrderNumber,
        OrderPricing,
        PaymentDetails,
        ProductVariant,
        StatusHistoryEntry,
    },
    helpers::generate_order_number,
    order_lifecycle::HISTORY_ORDER_CREATED,
    traits::{StorefrontDatabase, StorefrontError},
};

/// How many random order-number suffixes to try before giving up on a creation attempt.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

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

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, request: &NewOrderRequest, pricing: OrderPricing) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        // The conditional decrement is both the stock check and the first statement of the transaction, so the
        // write lock is taken up front (a read-then-write transaction can hit SQLITE_BUSY on the upgrade under
        // concurrent checkouts). Any failure rolls the whole transaction back, releasing earlier reservations.
        for item in &request.items {
            if !stock::reserve(&item.variant_sku, item.quantity, &mut tx).await? {
                return Err(reservation_failure(item, &mut tx).await?);
            }
            let variant = stock::fetch_variant(&item.variant_sku, &mut tx)
                .await?
                .filter(|v| v.product_id == item.product_id)
                .ok_or_else(|| StorefrontError::VariantNotFound(item.variant_sku.clone()))?;
            if variant.price != item.price {
                warn!(
                    "🗃️ Variant {} is priced at {} but the cart sent {}. The cart price is kept as the snapshot.",
                    item.variant_sku, variant.price, item.price
                );
            }
        }
        let mut order = None;
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let number = generate_order_number(Utc::now());
            match orders::insert_order(request, pricing, &number, &mut tx).await {
                Ok(inserted) => {
                    order = Some(inserted);
                    break;
                },
                Err(StorefrontError::OrderAlreadyExists(n)) => {
                    debug!("🗃️ Order number {n} is taken. Retrying with a fresh suffix.");
                },
                Err(e) => return Err(e),
            }
        }
        let order = order.ok_or(StorefrontError::OrderNumberExhausted)?;
        orders::insert_items(order.id, &request.items, &mut tx).await?;
        orders::insert_status_history(order.id, HISTORY_ORDER_CREATED, "Order created", None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_number, order.id);
        Ok(order)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let entries = orders::fetch_history(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_pending_transfer_order(&self, code: &str) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_pending_transfer_order(code, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_transfer_order_matching(&self, code: &str) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_transfer_order_matching(code, &mut conn).await?;
        Ok(order)
    }

    async fn mark_order_paid(
        &self,
        order_id: i64,
        details: &PaymentDetails,
        note: &str,
        updated_by: Option<&str>,
    ) -> Result<Option<Order>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::mark_paid(order_id, details, &mut tx).await?;
        if let Some(order) = &updated {
            orders::insert_status_history(
                order.id,
                crate::order_lifecycle::HISTORY_PAYMENT_CONFIRMED,
                note,
                updated_by,
                &mut tx,
            )
            .await?;
            debug!("🗃️ Order {} settled by {} via {}", order.order_number, details.transaction_id, details.payment_gateway);
        }
        tx.commit().await?;
        Ok(updated)
    }

    async fn cancel_unpaid_order(
        &self,
        order_id: i64,
        reason: &str,
        note: &str,
    ) -> Result<Option<Order>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::cancel_unpaid(order_id, reason, &mut tx).await?;
        if let Some(order) = &updated {
            let items = orders::fetch_items(order.id, &mut tx).await?;
            for item in &items {
                stock::release(&item.variant_sku, item.quantity, &mut tx).await?;
            }
            orders::insert_status_history(order.id, crate::order_lifecycle::HISTORY_CANCELLED, note, None, &mut tx)
                .await?;
            debug!("🗃️ Order {} cancelled ({reason}); {} item reservations released", order.order_number, items.len());
        }
        tx.commit().await?;
        Ok(updated)
    }

    async fn fetch_overdue_transfer_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let overdue = orders::overdue_transfer_orders(cutoff, &mut conn).await?;
        Ok(overdue)
    }

    async fn clear_cart_items(&self, customer_id: &str, product_ids: &[String]) -> Result<u64, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let removed = cart::remove_items(customer_id, product_ids, &mut conn).await?;
        trace!("🗃️ Removed {removed} cart line(s) for customer {customer_id}");
        Ok(removed)
    }

    async fn fetch_variant(&self, sku: &str) -> Result<Option<ProductVariant>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let variant = stock::fetch_variant(sku, &mut conn).await?;
        Ok(variant)
    }

    async fn close(&mut self) -> Result<(), StorefrontError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Works out why a reservation predicate failed: missing product, missing variant, or simply not enough stock.
/// Runs inside the creation transaction, so the answer is consistent with what the predicate saw.
async fn reservation_failure(
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<StorefrontError, StorefrontError> {
    if !stock::product_exists(&item.product_id, conn).await? {
        return Ok(StorefrontError::ProductNotFound(item.product_id.clone()));
    }
    match stock::fetch_variant(&item.variant_sku, conn).await? {
        Some(v) if v.product_id == item.product_id => {
            Ok(StorefrontError::InsufficientStock { sku: item.variant_sku.clone(), requested: item.quantity })
        },
        _ => Ok(StorefrontError::VariantNotFound(item.variant_sku.clone())),
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment (or the compiled default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies the embedded schema migrations. The server calls this at startup so a fresh deployment
    /// is self-bootstrapping.
    pub async fn run_migrations(&self) -> Result<(), StorefrontError> {
        sqlx::migrate!("./src/sqlite/db/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorefrontError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
