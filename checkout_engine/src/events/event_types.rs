use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Fired after a payment has been applied to an order (by the matcher or by manual confirmation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired after an order has been taken out of the running, currently only by the expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}
