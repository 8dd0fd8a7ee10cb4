//! Tower middleware.

pub mod metrics;
