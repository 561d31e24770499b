mod order_codes;

pub use order_codes::{extract_order_code, generate_order_number};
