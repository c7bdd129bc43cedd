pub mod throttle;
pub mod validation;

pub use throttle::{authenticate_or_throttle, AnonThrottle};
pub use validation::ValidatedJson;
