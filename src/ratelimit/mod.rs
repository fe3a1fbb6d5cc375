//! Rate limiting logic and state management.

mod backend;
mod clock;
mod counter;
mod key;
mod limiter;
mod policy;
mod routes;
mod sweeper;

pub use backend::AdmissionBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{ConsumptionRecord, Decision};
pub use key::ConsumptionKey;
pub use limiter::RateLimiter;
pub use policy::{LimitPolicy, PolicyLimits, PolicySet};
pub use routes::{RouteRule, RouteTable};
pub use sweeper::spawn_sweeper;
