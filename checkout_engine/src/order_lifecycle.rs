//! Shared order state-transition rules.
//!
//! Every component that mutates an order (checkout, payment matching, manual confirmation, the expiry sweep) goes
//! through the predicates in this module, and the SQLite layer encodes the same predicates in the `WHERE` clauses of
//! its conditional updates. The transition table is written down exactly once, here.
//!
//! | From \ To  | confirmed | processing | shipped | delivered | cancelled | refunded | returned |
//! |------------|-----------|------------|---------|-----------|-----------|----------|----------|
//! | pending    | 1         | 1          | Err     | Err       | 1         | Err      | Err      |
//! | confirmed  | Err       | 1          | Err     | Err       | 1         | Err      | Err      |
//! | processing | Err       | Err        | 1       | Err       | 1         | Err      | Err      |
//! | shipped    | Err       | Err        | Err     | 1         | Err       | Err      | 1        |
//! | delivered  | Err       | Err        | Err     | Err       | Err       | 1        | 1        |
//! | cancelled  | Err       | Err        | Err     | Err       | Err       | Err      | Err      |
//!
//! Payment application is not an order-status transition: it flips `payment_status` from `pending` to `paid` and may
//! leave `status` untouched. Its guards are [`verify_payment_applicable`] and, atomically, the state-guarded update in
//! the storage layer.

use thiserror::Error;

use crate::db_types::{Order, OrderStatusType, PaymentStatusType};

/// History labels used by the lifecycle flows. The audit log stores these as free text.
pub const HISTORY_ORDER_CREATED: &str = "pending";
pub const HISTORY_PAYMENT_CONFIRMED: &str = "payment_confirmed";
pub const HISTORY_CANCELLED: &str = "cancelled";

/// The cancel reason recorded by the expiry sweep.
pub const CANCEL_REASON_EXPIRED: &str = "expired";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Order {0} has already been paid")]
    AlreadyPaid(String),
    #[error("Order {0} has been cancelled")]
    AlreadyCancelled(String),
    #[error("Transition from {0} to {1} is not allowed")]
    Forbidden(OrderStatusType, OrderStatusType),
}

impl OrderStatusType {
    /// Statuses from which an unpaid order may still be cancelled (by the sweeper or an operator).
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatusType::Pending | OrderStatusType::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Cancelled | OrderStatusType::Refunded | OrderStatusType::Returned)
    }

    pub fn can_transition_to(self, next: OrderStatusType) -> bool {
        use crate::db_types::OrderStatusType::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Processing | Cancelled) |
                (Confirmed, Processing | Cancelled) |
                (Processing, Shipped | Cancelled) |
                (Shipped, Delivered | Returned) |
                (Delivered, Refunded | Returned)
        )
    }
}

/// Checks that a status change is allowed by the transition table.
pub fn verify_transition(order: &Order, next: OrderStatusType) -> Result<(), TransitionError> {
    if order.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(TransitionError::Forbidden(order.status, next))
    }
}

/// Checks that a payment may still be applied to the order. This is the optimistic pre-check; the storage layer
/// repeats the same predicate inside its conditional update, so a concurrent writer can never double-settle.
pub fn verify_payment_applicable(order: &Order) -> Result<(), TransitionError> {
    if order.payment_status == PaymentStatusType::Paid {
        return Err(TransitionError::AlreadyPaid(order.order_number.to_string()));
    }
    if order.status == OrderStatusType::Cancelled {
        return Err(TransitionError::AlreadyCancelled(order.order_number.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use shop_common::Money;

    use super::*;
    use crate::db_types::{Order, OrderStatusType::*, PaymentMethod, ShippingAddress};

    fn sample_order(status: OrderStatusType, payment_status: PaymentStatusType) -> Order {
        Order {
            id: 1,
            order_number: "ORD-20260209-1234".parse().unwrap(),
            customer_id: "cust-1".to_string(),
            shipping_address: ShippingAddress {
                full_name: "Nguyen Van A".to_string(),
                phone: "0901234567".to_string(),
                street: "12 Ly Thuong Kiet".to_string(),
                ward: None,
                district: "Quan 3".to_string(),
                city: "Ho Chi Minh".to_string(),
                zip_code: None,
            },
            payment_method: PaymentMethod::BankTransfer,
            status,
            payment_status,
            subtotal: Money::from(530_000),
            shipping_fee: Money::from(0),
            tax: Money::from(0),
            discount: Money::from(0),
            total_amount: Money::from(530_000),
            transaction_id: None,
            paid_at: None,
            payment_gateway: None,
            cancel_reason: None,
            tracking_number: None,
            estimated_delivery: None,
            actual_delivery: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payment_guards_report_the_blocking_state() {
        let order = sample_order(Pending, PaymentStatusType::Pending);
        assert!(verify_payment_applicable(&order).is_ok());
        let order = sample_order(Pending, PaymentStatusType::Paid);
        assert!(matches!(verify_payment_applicable(&order), Err(TransitionError::AlreadyPaid(_))));
        let order = sample_order(Cancelled, PaymentStatusType::Failed);
        assert!(matches!(verify_payment_applicable(&order), Err(TransitionError::AlreadyCancelled(_))));
    }

    #[test]
    fn transitions_are_validated_against_the_table() {
        let order = sample_order(Pending, PaymentStatusType::Pending);
        assert!(verify_transition(&order, Confirmed).is_ok());
        let order = sample_order(Cancelled, PaymentStatusType::Failed);
        assert!(matches!(verify_transition(&order, Confirmed), Err(TransitionError::Forbidden(..))));
    }

    #[test]
    fn terminal_states_are_marked() {
        assert!(Cancelled.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(Returned.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Delivered.is_terminal());
    }

    #[test]
    fn unpaid_states_are_cancellable() {
        assert!(Pending.is_cancellable());
        assert!(Confirmed.is_cancellable());
        assert!(!Shipped.is_cancellable());
        assert!(!Cancelled.is_cancellable());
    }

    #[test]
    fn cancelled_is_a_dead_end() {
        for next in [Pending, Confirmed, Processing, Shipped, Delivered, Refunded, Returned] {
            assert!(!Cancelled.can_transition_to(next), "cancelled -> {next} must be forbidden");
        }
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for s in [Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded, Returned] {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn fulfilment_path_is_open() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }
}
