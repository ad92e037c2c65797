//! This crate provides test-utilities for the facilitator crates.
//!
//! These utilities are mostly used to generate arbitrary chain values for testing purposes.

pub mod chain;
pub mod prelude;
