use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------     OrderNumber     ---------------------------------------------------------
/// The human-readable, globally unique order reference (`ORD-YYYYMMDD-NNNN`). Assigned once at creation and never
/// changed afterwards. Buyers put this (or an abbreviated form of it) into their bank-transfer memo.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Newly created; payment has not been settled yet.
    Pending,
    /// Acknowledged by the shop, still unpaid (e.g. COD orders awaiting packing).
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    /// Terminal. Reserved stock has been released.
    Cancelled,
    Refunded,
    Returned,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Confirmed => "confirmed",
            OrderStatusType::Processing => "processing",
            OrderStatusType::Shipped => "shipped",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Cancelled => "cancelled",
            OrderStatusType::Refunded => "refunded",
            OrderStatusType::Returned => "returned",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatusType {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatusType::Pending => "pending",
            PaymentStatusType::Paid => "paid",
            PaymentStatusType::Failed => "failed",
            PaymentStatusType::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Card,
    BankTransfer,
    Ewallet,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Ewallet => "ewallet",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "card" => Ok(Self::Card),
            "bank_transfer" => Ok(Self::BankTransfer),
            "ewallet" => Ok(Self::Ewallet),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------   ShippingAddress   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub ward: Option<String>,
    pub district: String,
    pub city: String,
    pub zip_code: Option<String>,
}

//--------------------------------------   PaymentDetails    ---------------------------------------------------------
/// Settlement details, written exactly once when a payment is first applied to an order. Present if and only if the
/// order's payment status is `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
    pub payment_gateway: String,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: String,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub discount: Money,
    pub total_amount: Money,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_gateway: Option<String>,
    pub cancel_reason: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The settlement record for this order, if a payment has been applied.
    pub fn payment_details(&self) -> Option<PaymentDetails> {
        match (&self.transaction_id, &self.paid_at, &self.payment_gateway) {
            (Some(txid), Some(paid_at), Some(gateway)) => Some(PaymentDetails {
                transaction_id: txid.clone(),
                paid_at: *paid_at,
                payment_gateway: gateway.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_awaiting_payment(&self) -> bool {
        self.payment_status == PaymentStatusType::Pending
    }
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A single line of an order. `price` is the variant price snapshotted at order time and is never recomputed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub variant_sku: String,
    pub quantity: i64,
    pub price: Money,
    pub status: OrderStatusType,
}

//--------------------------------------  StatusHistoryEntry ---------------------------------------------------------
/// One row of an order's append-only audit log. `status` is a free-form label rather than [`OrderStatusType`]:
/// payment application records `payment_confirmed`, which is not an order status.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: String,
    pub note: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   IncomingPayment   ---------------------------------------------------------
/// The canonical shape of a bank/gateway payment notification, produced by the provider adapters. Transient; the
/// settlement that results from it is recorded on the order itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPayment {
    pub amount: Money,
    /// The transfer memo as typed by the payer. Scanned for an order code.
    pub content: String,
    pub transaction_id: String,
    pub bank_code: Option<String>,
    pub transfer_time: Option<DateTime<Utc>>,
}

//--------------------------------------   NewOrderRequest   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub customer_id: String,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: String,
    pub variant_sku: String,
    pub quantity: i64,
    /// The price the cart displayed to the buyer. The variant's stored price is authoritative; a divergence is
    /// logged but does not fail the order.
    pub price: Money,
}

//--------------------------------------    OrderPricing     ---------------------------------------------------------
/// The computed money columns of a new order. `total_amount` is derived, never stored independently of its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPricing {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub discount: Money,
}

impl OrderPricing {
    pub fn total_amount(&self) -> Money {
        self.subtotal + self.shipping_fee + self.tax - self.discount
    }
}

//--------------------------------------   ProductVariant    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub variant_sku: String,
    pub product_id: String,
    pub price: Money,
    pub stock: i64,
    pub sold_count: i64,
}
