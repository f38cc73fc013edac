//! Stream combinators used by connections.

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
