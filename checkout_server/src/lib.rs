//! # Checkout server
//! The HTTP surface of the order lifecycle engine. It is responsible for:
//! * taking checkout requests and turning them into stock-committed orders;
//! * listening for incoming payment webhooks from banks and gateways, and acknowledging every delivery;
//! * the operator endpoints: manual payment confirmation and the on-demand expiry sweep;
//! * serving the bank-transfer payment instructions (QR link, memo, countdown) for a pending order.
//!
//! ## Configuration
//! The server is configured via `SHOP_*` environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
