//! Checkout Engine
//!
//! The core of the storefront's order lifecycle: turning cart selections into stock-committed orders, reconciling
//! asynchronous bank and gateway notifications against pending orders, the operator's manual confirmation path, and
//! expiring orders whose payment never arrived. It is the only part of the storefront with real correctness hazards
//! (concurrent stock movement, at-least-once webhook delivery, timeouts racing confirmations), which is why it lives
//! behind one small API instead of being spread across request handlers.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly;
//!    use the public API instead. The exception is the data types, which are defined in [`mod@db_types`] and are
//!    public.
//! 2. The public API ([`OrderFlowApi`]), generic over any backend implementing [`StorefrontDatabase`].
//!
//! Two rules carry all of the concurrency reasoning, and every backend must honour them:
//! * stock only moves through single conditional statements (`decrement where stock >= n`), and
//! * `pending -> paid` and `pending -> cancelled` are single state-guarded updates, so for any order at most one of
//!   them ever becomes permanent.
//!
//! The engine also emits events (order paid, order annulled) through a small hook system; see [`mod@events`].
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_lifecycle;
pub mod providers;

mod api;
mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub mod test_utils;

pub use api::{CheckoutPolicy, OrderFlowApi, OrderFlowError, PaymentMatch, PaymentMatchError};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{StorefrontDatabase, StorefrontError, SweepResult};
