use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::Value;

use crate::{
    api::{CheckoutPolicy, OrderFlowError, PaymentMatch, PaymentMatchError},
    db_types::{IncomingPayment, NewOrderRequest, Order, OrderNumber, PaymentDetails, PaymentStatusType},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    helpers::extract_order_code,
    order_lifecycle::{verify_payment_applicable, TransitionError, CANCEL_REASON_EXPIRED},
    providers,
    traits::{StorefrontDatabase, SweepResult},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: turning a cart selection into a stock-committed order,
/// reconciling incoming bank notifications against pending orders, the operator's manual confirmation path, and
/// expiring orders that were never paid.
pub struct OrderFlowApi<B> {
    db: B,
    policy: CheckoutPolicy,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, policy: CheckoutPolicy, producers: EventProducers) -> Self {
        Self { db, policy, producers }
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Turns a cart selection into a persisted, stock-committed order.
    ///
    /// Validation and stock reservation are one atomic step in the backend: every item's conditional stock decrement
    /// either succeeds, or the whole order is rejected with nothing persisted and no stock touched. On success the
    /// ordered products are removed from the customer's cart, best-effort; an order never fails because cart
    /// cleanup failed.
    pub async fn place_order(&self, request: NewOrderRequest) -> Result<Order, OrderFlowError> {
        if request.items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        let pricing = self.policy.price_order(&request.items);
        let order = self.db.create_order(&request, pricing).await?;
        info!(
            "🛒️ Order {} created for customer {}: {} item line(s), total {}",
            order.order_number,
            order.customer_id,
            request.items.len(),
            order.total_amount
        );
        let mut product_ids: Vec<String> = request.items.iter().map(|i| i.product_id.clone()).collect();
        product_ids.dedup();
        if let Err(e) = self.db.clear_cart_items(&request.customer_id, &product_ids).await {
            warn!("🛒️ Cart cleanup for customer {} failed after order {}: {e}", request.customer_id, order.order_number);
        }
        Ok(order)
    }

    /// Reconciles a raw provider webhook payload against the pending orders.
    ///
    /// Every failure branch returns a typed [`PaymentMatchError`] rather than bubbling an error across the HTTP
    /// boundary; the webhook endpoint always acknowledges receipt, since a 5xx would make the provider redeliver and
    /// redelivery is exactly what the state-guarded lookup is protecting against.
    pub async fn handle_payment_notification(&self, payload: &Value) -> Result<PaymentMatch, PaymentMatchError> {
        let payment = providers::normalize_payment(payload).ok_or(PaymentMatchError::UnrecognizedPayload)?;
        self.apply_incoming_payment(payment).await
    }

    /// Applies an already-normalised payment. Split out of [`Self::handle_payment_notification`] so tests and manual
    /// tooling can inject payments without fabricating provider payloads.
    pub async fn apply_incoming_payment(&self, payment: IncomingPayment) -> Result<PaymentMatch, PaymentMatchError> {
        let code = extract_order_code(&payment.content)
            .ok_or_else(|| PaymentMatchError::OrderNumberNotFound(payment.content.clone()))?;
        trace!("💸️ Transfer {} carries order code {code}", payment.transaction_id);
        let order = match self.db.fetch_pending_transfer_order(&code).await? {
            Some(order) => order,
            None => return self.resolve_unmatched(&code, &payment).await,
        };
        let diff = order.total_amount.abs_diff(payment.amount);
        if diff > self.policy.amount_tolerance {
            warn!(
                "💸️ Transfer {} for order {} is off by {diff} (expected {}, received {}). The order stays pending \
                 for manual resolution.",
                payment.transaction_id, order.order_number, order.total_amount, payment.amount
            );
            return Err(PaymentMatchError::AmountMismatch {
                expected: order.total_amount,
                received: payment.amount,
                tolerance: self.policy.amount_tolerance,
            });
        }
        let details = PaymentDetails {
            transaction_id: payment.transaction_id.clone(),
            paid_at: payment.transfer_time.unwrap_or_else(Utc::now),
            payment_gateway: payment.bank_code.clone().unwrap_or_else(|| "bank_transfer".to_string()),
        };
        let note = format!("Payment {} confirmed", payment.transaction_id);
        match self.db.mark_order_paid(order.id, &details, &note, None).await? {
            Some(updated) => {
                info!("💸️ Order {} is paid ({} received)", updated.order_number, payment.amount);
                self.call_order_paid_hook(&updated).await;
                Ok(PaymentMatch { order: updated, already_applied: false })
            },
            // The pending lookup raced a concurrent settle or cancel. Resolve from the final state.
            None => self.resolve_unmatched(&code, &payment).await,
        }
    }

    /// Decides what an unmatched payment means: a replayed webhook for an order we already settled with this exact
    /// transaction is a no-op success; anything else is a typed miss, logged for the back office.
    async fn resolve_unmatched(&self, code: &str, payment: &IncomingPayment) -> Result<PaymentMatch, PaymentMatchError> {
        if let Some(order) = self.db.fetch_transfer_order_matching(code).await? {
            let same_txid = order.transaction_id.as_deref() == Some(payment.transaction_id.as_str());
            if order.payment_status == PaymentStatusType::Paid && same_txid {
                debug!(
                    "💸️ Replayed notification for order {}; already settled by {}. No-op.",
                    order.order_number, payment.transaction_id
                );
                return Ok(PaymentMatch { order, already_applied: true });
            }
        }
        warn!("💸️ Transfer {} (code {code}) matches no pending order. Queued for manual reconciliation.", payment.transaction_id);
        Err(PaymentMatchError::OrderNotFound(code.to_string()))
    }

    /// The operator path for out-of-band payments: wrong memo, cash over the counter, a transfer the bank feed never
    /// delivered. Same postconditions and the same conditional settle as the matcher, so racing it against a webhook
    /// or the sweep still produces exactly one outcome.
    pub async fn confirm_payment_manually(
        &self,
        number: &OrderNumber,
        transaction_id: Option<String>,
        note: Option<String>,
        operator: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(number.to_string()))?;
        verify_payment_applicable(&order)?;
        let txid = transaction_id.unwrap_or_else(|| format!("manual-{operator}-{}", Utc::now().timestamp()));
        let details =
            PaymentDetails { transaction_id: txid, paid_at: Utc::now(), payment_gateway: "manual".to_string() };
        let note = note.unwrap_or_else(|| format!("Payment confirmed manually by {operator}"));
        match self.db.mark_order_paid(order.id, &details, &note, Some(operator)).await? {
            Some(updated) => {
                info!("💸️ Order {} confirmed as paid by operator {operator}", updated.order_number);
                self.call_order_paid_hook(&updated).await;
                Ok(updated)
            },
            None => {
                // Beaten by a webhook or the sweep between the fetch and the settle. Report the state that won.
                let current = self
                    .db
                    .fetch_order_by_id(order.id)
                    .await?
                    .ok_or_else(|| OrderFlowError::OrderNotFound(number.to_string()))?;
                match verify_payment_applicable(&current) {
                    Err(e @ (TransitionError::AlreadyPaid(_) | TransitionError::AlreadyCancelled(_))) => Err(e.into()),
                    _ => Err(OrderFlowError::DatabaseError(format!(
                        "Order {number} could not be settled, but its state does not explain why"
                    ))),
                }
            },
        }
    }

    /// Cancels every bank-transfer order that has been waiting for its payment longer than the configured timeout,
    /// releasing the reserved stock. Each order is its own unit of work: one failure is logged and skipped, the rest
    /// of the sweep carries on.
    pub async fn expire_overdue_orders(&self) -> Result<SweepResult, OrderFlowError> {
        let cutoff = Utc::now() - self.policy.payment_timeout;
        let candidates = self.db.fetch_overdue_transfer_orders(cutoff).await?;
        trace!("🕰️ {} order(s) are past the payment cutoff {cutoff}", candidates.len());
        let mut result = SweepResult::default();
        for order in candidates {
            match self.db.cancel_unpaid_order(order.id, CANCEL_REASON_EXPIRED, "Unpaid order expired").await {
                Ok(Some(cancelled)) => {
                    self.call_order_annulled_hook(&cancelled).await;
                    result.cancelled.push(cancelled);
                },
                Ok(None) => {
                    debug!("🕰️ Order {} was settled or cancelled before the sweep reached it", order.order_number);
                },
                Err(e) => {
                    error!("🕰️ Could not expire order {}: {e}. Continuing with the rest.", order.order_number);
                },
            }
        }
        Ok(result)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
