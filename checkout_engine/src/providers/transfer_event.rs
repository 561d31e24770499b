use serde_json::Value;

use super::{first_string, money_value, parse_transfer_time, string_value, ProviderAdapter};
use crate::db_types::IncomingPayment;

/// Matches the flat per-transfer event shape:
/// `{transferType, content, transferAmount, id|referenceCode, subAccId, transactionDate}`.
pub struct TransferEventAdapter;

impl ProviderAdapter for TransferEventAdapter {
    fn name(&self) -> &'static str {
        "transfer_event"
    }

    fn try_parse(&self, payload: &Value) -> Option<IncomingPayment> {
        // The discriminating field; its value ("in"/"out") is informational only.
        payload.get("transferType")?;
        let amount = money_value(payload.get("transferAmount")?)?;
        let content = string_value(payload.get("content")?)?;
        let transaction_id = first_string(payload, &["id", "referenceCode"])?;
        let bank_code = first_string(payload, &["subAccId"]);
        let transfer_time = payload.get("transactionDate").and_then(string_value).as_deref().and_then(parse_transfer_time);
        Some(IncomingPayment { amount, content, transaction_id, bank_code, transfer_time })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use shop_common::Money;

    use super::*;

    #[test]
    fn parses_the_flat_event_shape() {
        let payload = json!({
            "transferType": "in",
            "content": "DH00412345 thank you",
            "transferAmount": 529500,
            "referenceCode": "FT26040HH1",
            "subAccId": "0123456789",
            "transactionDate": "2026-02-09 14:30:00"
        });
        let payment = TransferEventAdapter.try_parse(&payload).unwrap();
        assert_eq!(payment.amount, Money::from(529_500));
        assert_eq!(payment.transaction_id, "FT26040HH1");
        assert_eq!(payment.bank_code.as_deref(), Some("0123456789"));
    }

    #[test]
    fn requires_the_transfer_type_discriminator() {
        let payload = json!({"content": "DH00412345", "transferAmount": 1000, "id": "FT1"});
        assert!(TransferEventAdapter.try_parse(&payload).is_none());
    }
}
