use checkout_engine::db_types::Order;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;

use crate::{config::BankAccount, data_objects::PaymentInfoResponse};

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook delivery against the shared secret. Two schemes are accepted:
/// * `x-signature`: hex-encoded HMAC-SHA256 of the raw request body;
/// * `authorization`: the shared secret itself, optionally prefixed with `Apikey `.
///
/// Both paths compare in constant time: `Mac::verify_slice` for the digest, a byte fold for the plain token.
pub fn verify_webhook_signature(
    secret: &str,
    body: &[u8],
    signature: Option<&str>,
    authorization: Option<&str>,
) -> bool {
    if let Some(signature) = signature {
        return verify_hmac(secret, body, signature);
    }
    if let Some(auth) = authorization {
        let token = auth.strip_prefix("Apikey ").unwrap_or(auth);
        return constant_time_eq(token.as_bytes(), secret.as_bytes());
    }
    false
}

fn verify_hmac(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        warn!("🔐️ Could not build an HMAC instance from the configured secret");
        return false;
    };
    mac.update(body);
    match decode_hex(signature_hex) {
        Some(signature) => mac.verify_slice(&signature).is_ok(),
        None => false,
    }
}

/// Computes the hex HMAC-SHA256 a provider would send for `body`. The server only needs this in tests, but tooling
/// that replays webhooks uses it too.
pub fn calculate_hmac_hex(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect()
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok()).collect()
}

/// Assembles the bank-transfer instructions for a pending order: account display data, the VietQR image link and
/// the countdown until the expiry sweep may cancel the order.
pub fn payment_info_for(
    order: &Order,
    bank: &BankAccount,
    payment_timeout: Duration,
    now: DateTime<Utc>,
) -> PaymentInfoResponse {
    let memo = order.order_number.to_string();
    let qr_url = format!(
        "https://img.vietqr.io/image/{}-{}-compact2.png?amount={}&addInfo={}&accountName={}",
        bank.bank_code,
        bank.account_number,
        order.total_amount.value(),
        urlencoding::encode(&memo),
        urlencoding::encode(&bank.account_name),
    );
    let elapsed = (now - order.created_at).num_seconds();
    let remaining_seconds = (payment_timeout.num_seconds() - elapsed).max(0);
    PaymentInfoResponse {
        order_number: order.order_number.to_string(),
        amount: order.total_amount,
        bank_code: bank.bank_code.clone(),
        account_number: bank.account_number.clone(),
        account_name: bank.account_name.clone(),
        memo,
        qr_url,
        remaining_seconds,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_signatures_verify_round_trip() {
        let body = br#"{"amount": 530000}"#;
        let signature = calculate_hmac_hex("topsecret", body);
        assert!(verify_webhook_signature("topsecret", body, Some(&signature), None));
        assert!(!verify_webhook_signature("topsecret", body, Some("deadbeef"), None));
        assert!(!verify_webhook_signature("other", body, Some(&signature), None));
        assert!(!verify_webhook_signature("topsecret", body, Some("not hex"), None));
    }

    #[test]
    fn authorization_token_accepts_the_apikey_prefix() {
        assert!(verify_webhook_signature("topsecret", b"", None, Some("topsecret")));
        assert!(verify_webhook_signature("topsecret", b"", None, Some("Apikey topsecret")));
        assert!(!verify_webhook_signature("topsecret", b"", None, Some("Apikey wrong")));
        assert!(!verify_webhook_signature("topsecret", b"", None, None));
    }

    #[test]
    fn constant_time_eq_checks_content_and_length() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
