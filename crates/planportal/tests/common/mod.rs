//! Shared test utilities for planportal API tests.
//!
//! This module provides:
//! - `TestHarness` for driving the router against a temporary data directory
//! - Builders for multipart bodies and job fixtures

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FixedLookup, TestHarness, TestResponse};
