//! # Integration Tests
//!
//! Cross-crate flows between `shuttle-sender` and `shuttle-telemetry`.

pub mod flows;
