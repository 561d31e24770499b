use serde_json::Value;

use super::{first_string, money_value, parse_transfer_time, string_value, ProviderAdapter};
use crate::db_types::IncomingPayment;

/// Matches the coded-response gateway shape:
/// `{"code": "00", "data": {amount, description|orderCode, reference|id, transactionDateTime}}`.
///
/// Only `code == "00"` (success) payloads match; anything else falls through the chain.
pub struct CodedResponseAdapter;

impl ProviderAdapter for CodedResponseAdapter {
    fn name(&self) -> &'static str {
        "coded_response"
    }

    fn try_parse(&self, payload: &Value) -> Option<IncomingPayment> {
        if payload.get("code")?.as_str()? != "00" {
            return None;
        }
        let data = payload.get("data")?;
        if !data.is_object() {
            return None;
        }
        let amount = money_value(data.get("amount")?)?;
        let content = first_string(data, &["description", "orderCode"])?;
        let transaction_id = first_string(data, &["reference", "id"])?;
        let transfer_time = data.get("transactionDateTime").and_then(string_value).as_deref().and_then(parse_transfer_time);
        Some(IncomingPayment { amount, content, transaction_id, bank_code: None, transfer_time })
    }
}
