use std::env;

use checkout_engine::CheckoutPolicy;
use chrono::Duration;
use log::*;
use shop_common::{Money, Secret};

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8460;
const DEFAULT_PAYMENT_TIMEOUT_MINUTES: i64 = 30;
const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 500_000;
const DEFAULT_SHIPPING_FEE: i64 = 30_000;
const DEFAULT_AMOUNT_TOLERANCE: i64 = 1_000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret for webhook signature verification. When absent, webhook calls are accepted unverified (only
    /// sensible behind a trusted proxy) and a warning is logged at startup.
    pub webhook_secret: Option<Secret<String>>,
    /// The account buyers transfer into; rendered on the payment-info endpoint and in the QR link.
    pub bank: BankAccount,
    /// The engine-facing knobs: shipping, amount tolerance, payment timeout.
    pub policy: CheckoutPolicy,
}

#[derive(Clone, Debug, Default)]
pub struct BankAccount {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: String::default(),
            webhook_secret: None,
            bank: BankAccount::default(),
            policy: CheckoutPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = env::var("SHOP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}, \
                         instead."
                    );
                    DEFAULT_SHOP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let webhook_secret = match env::var("SHOP_WEBHOOK_SECRET") {
            Ok(s) if !s.trim().is_empty() => Some(Secret::new(s)),
            _ => {
                warn!(
                    "🪛️ SHOP_WEBHOOK_SECRET is not set. Webhook signatures will NOT be verified. Do not run like \
                     this unless the webhook endpoint is only reachable from a trusted proxy."
                );
                None
            },
        };
        let bank = BankAccount::from_env_or_default();
        let policy = configure_checkout_policy();
        Self { host, port, database_url, webhook_secret, bank, policy }
    }
}

impl BankAccount {
    pub fn from_env_or_default() -> Self {
        let bank_code = env::var("SHOP_BANK_CODE").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_BANK_CODE is not set. The payment-info QR link will be broken.");
            String::default()
        });
        let account_number = env::var("SHOP_BANK_ACCOUNT").ok().unwrap_or_else(|| {
            error!("🪛️ SHOP_BANK_ACCOUNT is not set. The payment-info QR link will be broken.");
            String::default()
        });
        let account_name = env::var("SHOP_BANK_ACCOUNT_NAME").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_BANK_ACCOUNT_NAME is not set.");
            String::default()
        });
        Self { bank_code, account_number, account_name }
    }
}

fn configure_checkout_policy() -> CheckoutPolicy {
    let payment_timeout = env::var("SHOP_PAYMENT_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ SHOP_PAYMENT_TIMEOUT is not set. Using the default value of {DEFAULT_PAYMENT_TIMEOUT_MINUTES} \
                 minutes."
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for SHOP_PAYMENT_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or_else(|| Duration::minutes(DEFAULT_PAYMENT_TIMEOUT_MINUTES));
    CheckoutPolicy {
        free_shipping_threshold: env_money("SHOP_FREE_SHIPPING_THRESHOLD", DEFAULT_FREE_SHIPPING_THRESHOLD),
        flat_shipping_fee: env_money("SHOP_SHIPPING_FEE", DEFAULT_SHIPPING_FEE),
        amount_tolerance: env_money("SHOP_AMOUNT_TOLERANCE", DEFAULT_AMOUNT_TOLERANCE),
        payment_timeout,
    }
}

fn env_money(var: &str, default: i64) -> Money {
    let value = env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for {var}: {s}. {e}"))
        })
        .ok()
        .unwrap_or(default);
    Money::from(value)
}
