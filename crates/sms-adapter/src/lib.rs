//! # SMS Search Adapter Layer
//!
//! Implementations of the ports declared by `sms-dao` and `sms-business`.
//!
//! ## Structure
//!
//! - `repository/` - Store implementations and concrete DAOs
//! - `gateway/` - Query manager implementations

pub mod gateway;
pub mod repository;
