//! Time sources
//!
//! Lease expiry and TTL checks read time through [`Clock`] so tests can move
//! time forward without sleeping.

mod clock;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
