//! Shared utilities (clock, rate limiting)

pub mod rate_limit;
pub mod time;
