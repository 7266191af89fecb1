//! Async operations the UI layer calls in-process.

pub mod market;
pub mod plans;
pub mod settings;
pub mod soil;
