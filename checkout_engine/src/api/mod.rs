mod errors;
mod objects;
mod order_flow_api;

pub use errors::{OrderFlowError, PaymentMatchError};
pub use objects::{CheckoutPolicy, PaymentMatch};
pub use order_flow_api::OrderFlowApi;
