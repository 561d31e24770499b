use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    NewOrderRequest,
    Order,
    OrderItem,
    OrderNumber,
    OrderPricing,
    PaymentDetails,
    ProductVariant,
    StatusHistoryEntry,
};

/// The storage contract for the order lifecycle and payment reconciliation flows.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Creates a new order in a single atomic transaction:
    /// * every item's product and variant are verified to exist;
    /// * stock is reserved per item with a conditional decrement (the decrement *is* the availability check), so
    ///   there is no read-then-write window. A failed predicate rolls the whole transaction back;
    /// * the order row, its items (price snapshot per item) and the initial `pending` history entry are inserted,
    ///   under a freshly allocated unique order number.
    ///
    /// On any failure nothing is persisted and no stock is touched.
    async fn create_order(&self, request: &NewOrderRequest, pricing: OrderPricing) -> Result<Order, StorefrontError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StorefrontError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, StorefrontError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorefrontError>;

    async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, StorefrontError>;

    /// The oldest `bank_transfer` order still awaiting payment whose order number equals or contains `code`.
    ///
    /// The `payment_status = pending` filter is the idempotency mechanism: a webhook redelivery finds nothing to
    /// settle instead of settling twice.
    async fn fetch_pending_transfer_order(&self, code: &str) -> Result<Option<Order>, StorefrontError>;

    /// Like [`Self::fetch_pending_transfer_order`] but without the payment-status filter. Used to distinguish a
    /// replayed webhook (order already paid with the same transaction id) from a genuinely unknown code.
    async fn fetch_transfer_order_matching(&self, code: &str) -> Result<Option<Order>, StorefrontError>;

    /// Applies a payment to the order iff its payment status is still `pending`, and appends a `payment_confirmed`
    /// history entry, atomically. Returns `None` when the precondition no longer holds (already settled, or
    /// cancelled in the meantime); the caller decides whether that is a replay or a lost race.
    ///
    /// This is the only write path for the settlement columns; they are written exactly once per order.
    async fn mark_order_paid(
        &self,
        order_id: i64,
        details: &PaymentDetails,
        note: &str,
        updated_by: Option<&str>,
    ) -> Result<Option<Order>, StorefrontError>;

    /// Cancels an unpaid order iff it is still cancellable (`payment_status = pending`, status `pending` or
    /// `confirmed`), releasing every item's reserved stock and appending a `cancelled` history entry in the same
    /// transaction. Returns `None` when the guard fails, e.g. because a payment won the race.
    async fn cancel_unpaid_order(&self, order_id: i64, reason: &str, note: &str)
        -> Result<Option<Order>, StorefrontError>;

    /// All `bank_transfer` orders still awaiting payment that were created before `cutoff`.
    async fn fetch_overdue_transfer_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, StorefrontError>;

    /// Cart-collaborator boundary: removes the given products from the customer's cart after checkout. Callers
    /// treat failures as non-fatal.
    async fn clear_cart_items(&self, customer_id: &str, product_ids: &[String]) -> Result<u64, StorefrontError>;

    async fn fetch_variant(&self, sku: &str) -> Result<Option<ProductVariant>, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since order number {0} already exists")]
    OrderAlreadyExists(OrderNumber),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Variant {0} does not exist")]
    VariantNotFound(String),
    #[error("Insufficient stock for variant {sku}: {requested} requested")]
    InsufficientStock { sku: String, requested: i64 },
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}
