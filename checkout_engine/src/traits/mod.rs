//! Interface contracts for storage backends.
//!
//! The order flows never touch SQL directly; they are written against [`StorefrontDatabase`], and a backend promises
//! the atomicity documented on each method. Two guarantees carry the whole concurrency story:
//!
//! * stock is only ever changed by single conditional statements (`decrement where stock >= n`), and
//! * the `pending -> paid` and `pending -> cancelled` transitions are single conditional updates, so whichever
//!   writer observes the precondition first wins and the loser becomes a no-op.
mod data_objects;
mod storefront_database;

pub use data_objects::SweepResult;
pub use storefront_database::{StorefrontDatabase, StorefrontError};
