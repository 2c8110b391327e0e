//! Stream combinators for telemetry consumers

mod throttle;

pub use throttle::{SampleThrottle, SampleThrottleExt};
