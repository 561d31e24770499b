use shop_common::Money;
use thiserror::Error;

use crate::{order_lifecycle::TransitionError, traits::StorefrontError};

/// Failures of the checkout, manual-confirmation and expiry flows. Validation variants surface to the caller before
/// anything has been persisted.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("An order must contain at least one item")]
    EmptyOrder,
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Variant {0} does not exist")]
    VariantNotFound(String),
    #[error("Insufficient stock for variant {sku}: {requested} requested")]
    InsufficientStock { sku: String, requested: i64 },
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("Order {0} has already been paid")]
    AlreadyPaid(String),
    #[error("Order {0} has been cancelled")]
    AlreadyCancelled(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorefrontError> for OrderFlowError {
    fn from(e: StorefrontError) -> Self {
        match e {
            StorefrontError::ProductNotFound(id) => Self::ProductNotFound(id),
            StorefrontError::VariantNotFound(sku) => Self::VariantNotFound(sku),
            StorefrontError::InsufficientStock { sku, requested } => Self::InsufficientStock { sku, requested },
            StorefrontError::OrderNotFound(number) => Self::OrderNotFound(number.to_string()),
            StorefrontError::OrderIdNotFound(id) => Self::OrderNotFound(format!("#{id}")),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<TransitionError> for OrderFlowError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyPaid(number) => Self::AlreadyPaid(number),
            TransitionError::AlreadyCancelled(number) => Self::AlreadyCancelled(number),
            TransitionError::Forbidden(..) => Self::DatabaseError(e.to_string()),
        }
    }
}

/// Failures of the webhook reconciliation flow. These are *results*, not exceptions: the webhook endpoint converts
/// every one of them into an acknowledged 200 response so providers do not retry-storm a business rejection.
/// Unmatched and mismatched payments stay visible in the logs for manual reconciliation.
#[derive(Debug, Clone, Error)]
pub enum PaymentMatchError {
    #[error("The payload did not match any known provider shape")]
    UnrecognizedPayload,
    #[error("No order code could be found in the transfer memo: {0:?}")]
    OrderNumberNotFound(String),
    #[error("No pending bank-transfer order matches code {0}")]
    OrderNotFound(String),
    #[error("Transfer amount {received} does not match order total {expected} (tolerance {tolerance})")]
    AmountMismatch { expected: Money, received: Money, tolerance: Money },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StorefrontError> for PaymentMatchError {
    fn from(e: StorefrontError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
