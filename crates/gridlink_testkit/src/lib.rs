//! # Gridlink Testkit
//!
//! Test utilities for gridlink dialects.
//!
//! This crate provides:
//! - A conformance suite any [`GridDialect`](gridlink_core::GridDialect) can be run against
//! - Fixtures for handles, keys and rows
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//! - Key flattening vectors shared by every backend
//!
//! ## Usage
//!
//! ```rust
//! use gridlink_testkit::prelude::*;
//!
//! let mut suite = ConformanceSuite::new(map_dialect());
//! suite.run_all();
//! assert!(suite.all_passed(), "{}", suite.summary());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod conformance;
pub mod fixtures;
pub mod generators;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conformance::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use conformance::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
pub use vectors::*;
