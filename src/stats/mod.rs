//! Listener and broadcast statistics

pub mod metrics;

pub use metrics::{BufferStats, ListenerStats};
