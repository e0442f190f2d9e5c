//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Default movement/identity frames per second per connection.
/// Movement arrives at 60 Hz; the rest covers respawn and identity traffic.
pub const INPUT_RATE_LIMIT: u32 = 120;

/// Default shot and hit-report frames per second per connection
pub const EVENT_RATE_LIMIT: u32 = 120;

/// Per-connection rate limiter state.
/// Shots and hit reports draw from their own quota so a movement burst
/// never starves them.
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    input_limiter: Arc<Limiter>,
    event_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new(input_per_second: u32, event_per_second: u32) -> Self {
        Self {
            input_limiter: create_limiter(input_per_second),
            event_limiter: create_limiter(event_per_second),
        }
    }

    /// Check if a movement or control frame is allowed (returns true if allowed)
    pub fn check_input(&self) -> bool {
        self.input_limiter.check().is_ok()
    }

    /// Check if a shot or hit-report frame is allowed
    pub fn check_event(&self) -> bool {
        self.event_limiter.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new(INPUT_RATE_LIMIT, EVENT_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_refused() {
        let limiter = ConnectionRateLimiter::new(2, 2);
        assert!(limiter.check_input());
        assert!(limiter.check_input());
        assert!(!limiter.check_input());
    }

    #[test]
    fn movement_flood_leaves_event_quota_intact() {
        let limiter = ConnectionRateLimiter::new(3, 2);
        while limiter.check_input() {}
        assert!(limiter.check_event());
        assert!(limiter.check_event());
        assert!(!limiter.check_event());
    }
}
