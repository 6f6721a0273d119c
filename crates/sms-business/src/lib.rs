//! # SMS Search Business Layer
//!
//! Routes an incoming SMS query to the handler that should answer it.
//! The handlers themselves are ports; implementations live in
//! `sms-adapter`.

pub mod manager;
pub mod query_handler;

pub use manager::{OnlineQueryManager, VerticalManager};
pub use query_handler::{QueryHandler, QueryHandlerService, QueryOutcome, QueryRoute};
