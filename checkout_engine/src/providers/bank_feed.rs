use log::warn;
use serde_json::Value;

use super::{first_string, money_value, parse_transfer_time, string_value, ProviderAdapter};
use crate::db_types::IncomingPayment;

/// Matches the batched account-feed shape: `{"data": [{amount, description, id|tid, bankSubAccId, when}]}`.
///
/// Feeds deliver one transfer per call in practice; if a batch ever carries more than one entry, the first is
/// normalised and the rest are logged so the provider's redelivery can pick them up.
pub struct BankFeedAdapter;

impl ProviderAdapter for BankFeedAdapter {
    fn name(&self) -> &'static str {
        "bank_feed"
    }

    fn try_parse(&self, payload: &Value) -> Option<IncomingPayment> {
        let batch = payload.get("data")?.as_array()?;
        let tx = batch.first()?;
        if batch.len() > 1 {
            warn!("💸️ Bank feed delivered {} transactions in one call; only the first is processed", batch.len());
        }
        let amount = money_value(tx.get("amount")?)?;
        let content = string_value(tx.get("description")?)?;
        let transaction_id = first_string(tx, &["id", "tid"])?;
        let bank_code = first_string(tx, &["bankSubAccId"]);
        let transfer_time = tx.get("when").and_then(string_value).as_deref().and_then(parse_transfer_time);
        Some(IncomingPayment { amount, content, transaction_id, bank_code, transfer_time })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use shop_common::Money;

    use super::*;

    #[test]
    fn parses_the_batched_feed_shape() {
        let payload = json!({
            "data": [{
                "amount": 529500,
                "description": "DH00412345 thanks",
                "tid": "FEED-77812",
                "bankSubAccId": "970422",
                "when": "2026-02-09 14:30:00"
            }]
        });
        let payment = BankFeedAdapter.try_parse(&payload).unwrap();
        assert_eq!(payment.amount, Money::from(529_500));
        assert_eq!(payment.content, "DH00412345 thanks");
        assert_eq!(payment.transaction_id, "FEED-77812");
        assert_eq!(payment.bank_code.as_deref(), Some("970422"));
        assert!(payment.transfer_time.is_some());
    }

    #[test]
    fn empty_batches_do_not_match() {
        assert!(BankFeedAdapter.try_parse(&json!({"data": []})).is_none());
        assert!(BankFeedAdapter.try_parse(&json!({"data": {"amount": 1}})).is_none());
    }

    #[test]
    fn a_missing_transaction_id_does_not_match() {
        let payload = json!({"data": [{"amount": 1000, "description": "DH00412345"}]});
        assert!(BankFeedAdapter.try_parse(&payload).is_none());
    }
}
