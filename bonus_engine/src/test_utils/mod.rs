//! Helpers for testing code that depends on the bonus engine.
//!
//! * [`prepare_env`] creates a scratch Postgres database for integration tests.
//! * [`memory`] is an in-memory backend that follows the same rules as the Postgres one.
//! * [`oracle`] is a scripted accrual oracle.
pub mod memory;
pub mod oracle;
pub mod prepare_env;

use bonus_common::OrderNumber;

/// Builds a valid order number from `seed` by appending the matching Luhn check digit.
pub fn valid_order_number(seed: u64) -> OrderNumber {
    let body = seed.to_string();
    (0..10)
        .find_map(|d| OrderNumber::parse(&format!("{body}{d}")).ok())
        .expect("exactly one check digit completes any number")
}
