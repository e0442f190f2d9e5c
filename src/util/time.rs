//! Time utilities for the simulation and the relay server

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default server drain rate (ticks per second)
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Largest client frame step; slower frames are integrated as if they took this long
pub const MAX_FRAME_DELTA: f32 = 1.0 / 30.0;

/// Minimum spacing between two movement updates on the wire (60 Hz)
pub const MOVEMENT_SEND_INTERVAL: Duration = Duration::from_micros(16_667);

/// Clamp a raw frame delta into the range the integrators accept
pub fn clamp_frame_delta(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(MAX_FRAME_DELTA)
}

/// Interval between server ticks for the given rate
pub fn tick_interval(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1) as u64)
}
