//! PTG Test Kit - Shared test support for the PTG workspace
//!
//! - Tracing configuration for test output
//! - Fixtures: configurations and scripted arrival patterns
//! - Assertions that compare the service's population view against a full scan
//!
//! # Example
//!
//! ```rust,ignore
//! use ptg_testkit::{assert_population_consistent, fixtures};
//!
//! #[test]
//! fn warm_population() {
//!     ptg_testkit::init_test_tracing();
//!     let service = fixtures::service(fixtures::config::percentile());
//!     fixtures::warm_up(&service, "peer", 25, fixtures::QUALIFYING_STREAK);
//!     assert_population_consistent(&service);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod assertions;
pub mod fixtures;
mod tracing_config;

pub use assertions::*;
pub use tracing_config::*;
