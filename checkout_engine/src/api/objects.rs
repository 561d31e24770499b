use chrono::Duration;
use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::db_types::{NewOrderItem, Order, OrderPricing};

/// The commercial knobs of the checkout and reconciliation flows. Built once at startup from the environment and
/// passed into [`crate::OrderFlowApi`]; nothing in the engine reads configuration from anywhere else.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutPolicy {
    /// Orders with a subtotal above this ship for free.
    pub free_shipping_threshold: Money,
    /// The flat fee charged below the threshold.
    pub flat_shipping_fee: Money,
    /// Absolute tolerance when matching a transfer amount against an order total. Banks round; buyers fat-finger.
    pub amount_tolerance: Money,
    /// How long a bank-transfer order may stay unpaid before the sweep cancels it.
    pub payment_timeout: Duration,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from(500_000),
            flat_shipping_fee: Money::from(30_000),
            amount_tolerance: Money::from(1_000),
            payment_timeout: Duration::minutes(30),
        }
    }
}

impl CheckoutPolicy {
    /// Prices an order from its item lines. Tax and discount are carried as columns for the fulfilment flows but are
    /// always zero at creation time.
    pub fn price_order(&self, items: &[NewOrderItem]) -> OrderPricing {
        let subtotal: Money = items.iter().map(|i| i.price * i.quantity).sum();
        let shipping_fee =
            if subtotal > self.free_shipping_threshold { Money::from(0) } else { self.flat_shipping_fee };
        OrderPricing { subtotal, shipping_fee, tax: Money::from(0), discount: Money::from(0) }
    }
}

/// A successfully reconciled payment. `already_applied` marks a webhook replay: the order was settled by an earlier
/// delivery of the same notification and this call changed nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMatch {
    pub order: Order,
    pub already_applied: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    fn item(price: i64, quantity: i64) -> NewOrderItem {
        NewOrderItem {
            product_id: "p1".to_string(),
            variant_sku: "sku-1".to_string(),
            quantity,
            price: Money::from(price),
        }
    }

    #[test]
    fn small_orders_pay_the_flat_fee() {
        let policy = CheckoutPolicy::default();
        let pricing = policy.price_order(&[item(100_000, 2)]);
        assert_eq!(pricing.subtotal, Money::from(200_000));
        assert_eq!(pricing.shipping_fee, Money::from(30_000));
        assert_eq!(pricing.total_amount(), Money::from(230_000));
    }

    #[test]
    fn shipping_is_free_above_the_threshold() {
        let policy = CheckoutPolicy::default();
        let pricing = policy.price_order(&[item(500_001, 1)]);
        assert_eq!(pricing.shipping_fee, Money::from(0));
        assert_eq!(pricing.total_amount(), Money::from(500_001));
    }

    #[test]
    fn the_threshold_itself_is_not_free() {
        let policy = CheckoutPolicy::default();
        let pricing = policy.price_order(&[item(500_000, 1)]);
        assert_eq!(pricing.shipping_fee, Money::from(30_000));
    }
}
