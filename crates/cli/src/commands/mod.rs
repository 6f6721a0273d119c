//! CLI Commands

pub mod init;
pub mod query;
pub mod verticals;

pub use init::InitCommand;
pub use query::QueryCommand;
pub use verticals::VerticalsCommand;
