mod helpers;
mod order_number;
mod points;

pub mod op;
mod secret;

pub use helpers::{parse_boolean_flag, parse_seconds_list};
pub use order_number::{OrderNumber, OrderNumberError};
pub use points::{Points, PointsConversionError, POINTS_SCALE};
pub use secret::Secret;
