//! Shared helpers

pub mod csrf;
pub mod money;
pub mod rate_limit;
pub mod time;
