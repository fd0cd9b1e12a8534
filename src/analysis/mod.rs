//! Analysis modules.
//!
//! Turns loaded coverage reports into the result published on the check run.

pub mod aggregator;

pub use aggregator::*;
