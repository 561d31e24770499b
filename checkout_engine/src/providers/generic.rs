use serde_json::Value;

use super::{first_string, money_value, parse_transfer_time, string_value, ProviderAdapter};
use crate::db_types::IncomingPayment;

/// The catch-all shape: `{amount, content|description|memo, transactionId|id|reference, bankCode?, transferTime?}`.
/// Last in the chain. A payload without a readable transaction id never matches: the transaction id is the
/// idempotency anchor and a payment without one cannot be applied safely.
pub struct GenericAdapter;

impl ProviderAdapter for GenericAdapter {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn try_parse(&self, payload: &Value) -> Option<IncomingPayment> {
        let amount = money_value(payload.get("amount")?)?;
        let content = first_string(payload, &["content", "description", "memo"])?;
        let transaction_id = first_string(payload, &["transactionId", "id", "reference"])?;
        let bank_code = first_string(payload, &["bankCode"]);
        let transfer_time = payload.get("transferTime").and_then(string_value).as_deref().and_then(parse_transfer_time);
        Some(IncomingPayment { amount, content, transaction_id, bank_code, transfer_time })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use shop_common::Money;

    use super::*;

    #[test]
    fn parses_the_minimal_shape() {
        let payload = json!({"amount": 530000, "memo": "ORD-20260209-1234", "reference": "TX-1"});
        let payment = GenericAdapter.try_parse(&payload).unwrap();
        assert_eq!(payment.amount, Money::from(530_000));
        assert_eq!(payment.content, "ORD-20260209-1234");
        assert_eq!(payment.transaction_id, "TX-1");
        assert!(payment.bank_code.is_none());
        assert!(payment.transfer_time.is_none());
    }

    #[test]
    fn numeric_transaction_ids_are_accepted() {
        let payload = json!({"amount": 1000, "content": "DH00412345", "id": 998877});
        let payment = GenericAdapter.try_parse(&payload).unwrap();
        assert_eq!(payment.transaction_id, "998877");
    }

    #[test]
    fn a_payload_without_txid_does_not_match() {
        let payload = json!({"amount": 1000, "content": "DH00412345"});
        assert!(GenericAdapter.try_parse(&payload).is_none());
    }
}
