use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderNumber};

/// The outcome of one expiry sweep. Orders that could not be cancelled (lost races, per-order failures) are simply
/// absent; the sweep never reports a partially-cancelled order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    pub cancelled: Vec<Order>,
}

impl SweepResult {
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    pub fn order_numbers(&self) -> Vec<OrderNumber> {
        self.cancelled.iter().map(|o| o.order_number.clone()).collect()
    }
}
