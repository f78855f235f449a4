//! Core infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Error types
//! - [`time`] - Monotonic store time

pub mod config;
pub mod error;
pub mod time;
