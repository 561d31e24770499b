use checkout_engine::{db_types::Order, events::EventProducers, CheckoutPolicy, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The worker evaluates the cutoff fresh on every tick; there is no lease or state carried between ticks, so the
/// operator-triggered sweep endpoint can run concurrently without coordination.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    policy: CheckoutPolicy,
    producers: EventProducers,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db, policy, producers);
        info!("🕰️ Unpaid order expiry worker started (timeout: {} minutes)", policy.payment_timeout.num_minutes());
        loop {
            timer.tick().await;
            match api.expire_overdue_orders().await {
                Ok(result) => {
                    if result.cancelled_count() > 0 {
                        info!("🕰️ {} unpaid order(s) expired", result.cancelled_count());
                        debug!("🕰️ Expired orders: {}", order_list(&result.cancelled));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running the unpaid order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} cust: {}", o.id, o.order_number, o.customer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
