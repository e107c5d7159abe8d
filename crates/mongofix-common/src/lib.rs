//! Common utilities for mongofix
//!
//! This crate provides the error type shared by every mongofix module.

pub mod error;

pub use error::{FixtureError, Result};
