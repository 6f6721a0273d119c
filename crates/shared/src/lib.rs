//! # SMS Search Shared
//!
//! Common types used across all SMS Search packages.

pub mod config;
pub mod error;

// Re-exports
pub use config::*;
pub use error::*;
