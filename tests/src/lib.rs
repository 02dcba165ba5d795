//! # Shuttle Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cross-crate flows
//!     ├── flows.rs      # Sender over the in-memory transport
//!     ├── deadlines.rs  # Bounded waits against hanging transports
//!     └── telemetry.rs  # Metrics exposition and trace propagation
//!
//! tests/benches/
//! └── sender_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p shuttle-tests
//!
//! # By category
//! cargo test -p shuttle-tests integration::deadlines
//!
//! # Benchmarks
//! cargo bench -p shuttle-tests
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
