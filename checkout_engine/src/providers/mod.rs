//! Provider payload adapters.
//!
//! Bank and gateway webhooks arrive in several shapes, and new providers show up with shapes of their own. Each
//! shape is handled by one [`ProviderAdapter`]; the matcher walks the ordered list in [`normalize_payment`] and the
//! first adapter that recognises the payload produces the canonical [`IncomingPayment`]. Provider quirks stay inside
//! their adapter.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use serde_json::Value;
use shop_common::Money;

use crate::db_types::IncomingPayment;

mod bank_feed;
mod coded_response;
mod generic;
mod transfer_event;

pub use bank_feed::BankFeedAdapter;
pub use coded_response::CodedResponseAdapter;
pub use generic::GenericAdapter;
pub use transfer_event::TransferEventAdapter;

pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the normalised payment if this adapter recognises the payload shape, or `None` to let the next
    /// adapter have a go. Adapters must not have side effects.
    fn try_parse(&self, payload: &Value) -> Option<IncomingPayment>;
}

/// The adapter chain, in matching priority order. The generic adapter goes last so that a sloppy payload does not
/// shadow a more specific provider shape.
pub fn adapters() -> Vec<Box<dyn ProviderAdapter>> {
    vec![
        Box::new(BankFeedAdapter),
        Box::new(CodedResponseAdapter),
        Box::new(TransferEventAdapter),
        Box::new(GenericAdapter),
    ]
}

/// Normalises a raw webhook payload into an [`IncomingPayment`] via the first matching adapter. `None` means no
/// adapter recognised the shape.
pub fn normalize_payment(payload: &Value) -> Option<IncomingPayment> {
    adapters().iter().find_map(|adapter| {
        let payment = adapter.try_parse(payload)?;
        debug!("💸️ Payload matched the '{}' provider adapter. txid: {}", adapter.name(), payment.transaction_id);
        Some(payment)
    })
}

/// Reads a money amount from a JSON value. Providers disagree on whether amounts are integers, floats or quoted
/// strings; fractional amounts are rounded to the nearest unit.
pub(crate) fn money_value(value: &Value) -> Option<Money> {
    match value {
        Value::Number(n) => n.as_i64().map(Money::from).or_else(|| n.as_f64().map(round_to_money)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().map(Money::from).ok().or_else(|| s.parse::<f64>().ok().map(round_to_money))
        },
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_money(amount: f64) -> Money {
    Money::from(amount.round() as i64)
}

/// Reads a string field, accepting JSON numbers as well since some providers send numeric transaction ids.
pub(crate) fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the first present-and-readable string among the given keys of a JSON object.
pub(crate) fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(k).and_then(string_value))
}

/// Parses a provider timestamp. RFC 3339 is tried first; the bare `YYYY-MM-DD HH:MM:SS` form that bank feeds favour
/// is taken as UTC.
pub(crate) fn parse_transfer_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok().map(|naive| naive.and_utc())
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn adapter_priority_is_stable() {
        let names: Vec<&str> = adapters().iter().map(|a| a.name()).collect();
        assert_eq!(names, ["bank_feed", "coded_response", "transfer_event", "generic"]);
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        assert!(normalize_payment(&json!({"hello": "world"})).is_none());
        assert!(normalize_payment(&json!(42)).is_none());
        assert!(normalize_payment(&json!([1, 2, 3])).is_none());
    }

    #[test]
    fn specific_shapes_win_over_the_generic_fallback() {
        // Has both a transferType shape and enough fields for the generic adapter to be tempted.
        let payload = json!({
            "transferType": "in",
            "content": "DH00412345",
            "transferAmount": 530000,
            "id": "FT123",
            "amount": 1,
            "transactionId": "bogus"
        });
        let payment = normalize_payment(&payload).unwrap();
        assert_eq!(payment.transaction_id, "FT123");
        assert_eq!(payment.amount, Money::from(530_000));
    }

    #[test]
    fn amounts_parse_from_numbers_and_strings() {
        assert_eq!(money_value(&json!(529500)), Some(Money::from(529_500)));
        assert_eq!(money_value(&json!(529500.4)), Some(Money::from(529_500)));
        assert_eq!(money_value(&json!("529500")), Some(Money::from(529_500)));
        assert_eq!(money_value(&json!(null)), None);
    }

    #[test]
    fn transfer_times_accept_both_formats() {
        let rfc = parse_transfer_time("2026-02-09T14:30:00+07:00").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2026-02-09T07:30:00+00:00");
        let bare = parse_transfer_time("2026-02-09 14:30:00").unwrap();
        assert_eq!(bare.to_rfc3339(), "2026-02-09T14:30:00+00:00");
        assert!(parse_transfer_time("not a time").is_none());
    }
}
