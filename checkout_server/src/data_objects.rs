use std::fmt::Display;

use checkout_engine::PaymentMatch;
use serde::{Deserialize, Serialize};
use shop_common::Money;

/// The webhook acknowledgement body. Always sent with HTTP 200: a rejected payment is still a received payment, and
/// anything other than a 2xx makes the provider redeliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAck {
    pub fn confirmed(outcome: &PaymentMatch) -> Self {
        Self { success: true, order_number: Some(outcome.order.order_number.to_string()), error: None }
    }

    pub fn rejected<S: Display>(error: S) -> Self {
        Self { success: false, order_number: None, error: Some(error.to_string()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualConfirmRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub cancelled_count: usize,
    pub cancelled_orders: Vec<String>,
}

/// Everything the storefront needs to render the bank-transfer screen for a pending order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfoResponse {
    pub order_number: String,
    pub amount: Money,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    /// The memo the buyer should put on the transfer; the matcher extracts the order code from it.
    pub memo: String,
    pub qr_url: String,
    /// Seconds until the expiry sweep becomes eligible to cancel the order. Zero once the window has passed.
    pub remaining_seconds: i64,
}
