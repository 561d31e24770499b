use chrono::{DateTime, Utc};
use log::warn;
use rand::Rng;
use regex::Regex;

use crate::db_types::OrderNumber;

/// Generates a fresh order number of the form `ORD-YYYYMMDD-NNNN`. The serial part is random; callers must be
/// prepared to retry on a unique-constraint violation.
pub fn generate_order_number(now: DateTime<Utc>) -> OrderNumber {
    let serial: u32 = rand::thread_rng().gen_range(0..10_000);
    OrderNumber(format!("ORD-{}-{serial:04}", now.format("%Y%m%d")))
}

/// Scans a bank-transfer memo for an order code. Two forms are recognised, and the leftmost match in the memo wins:
/// * the fully-qualified order number, `ORD-YYYYMMDD-NNNN`;
/// * a compact code: two letters immediately followed by at least four digits (e.g. `DH00412345`), of which the
///   digits are the code.
///
/// Memos are typed by humans into banking apps, so matching is case-insensitive and ignores surrounding text.
pub fn extract_order_code(memo: &str) -> Option<String> {
    let pattern = Regex::new(r"(?i)(ORD-\d{8}-\d{4})|[A-Z]{2}(\d{4,})").unwrap();
    let captures = pattern.captures(memo)?;
    if let Some(full) = captures.get(1) {
        return Some(full.as_str().to_uppercase());
    }
    captures.get(2).map(|digits| digits.as_str().to_string()).or_else(|| {
        warn!("💸️ Order code pattern matched without capturing a code. Memo: {memo}");
        None
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_numbers_have_the_dashed_form() {
        let now = "2026-02-09T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let number = generate_order_number(now);
        let pattern = Regex::new(r"^ORD-20260209-\d{4}$").unwrap();
        assert!(pattern.is_match(number.as_str()), "unexpected order number {number}");
    }

    #[test]
    fn compact_codes_extract_their_digits() {
        let code = extract_order_code("DH00412345 thanks").unwrap();
        assert_eq!(code, "00412345");
        let code = extract_order_code("chuyen tien dh00412345").unwrap();
        assert_eq!(code, "00412345");
    }

    #[test]
    fn dashed_numbers_are_taken_whole() {
        let code = extract_order_code("ORD-20260209-1234").unwrap();
        assert_eq!(code, "ORD-20260209-1234");
        let code = extract_order_code("pay for ord-20260209-1234 please").unwrap();
        assert_eq!(code, "ORD-20260209-1234");
    }

    #[test]
    fn first_match_in_the_memo_wins() {
        let code = extract_order_code("DH98765 and also ORD-20260209-1234").unwrap();
        assert_eq!(code, "98765");
    }

    #[test]
    fn unrecognisable_memos_yield_nothing() {
        assert_eq!(extract_order_code(""), None);
        assert_eq!(extract_order_code("thanks for the goods"), None);
        // Too few digits after the prefix.
        assert_eq!(extract_order_code("DH123"), None);
        // Digits with no letter prefix.
        assert_eq!(extract_order_code("41234567"), None);
    }
}
