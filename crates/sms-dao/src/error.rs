//! Errors raised by the data-access layer

use thiserror::Error;

/// Errors that can occur during DAO and session operations
#[derive(Debug, Error)]
pub enum DaoError {
    /// No row with this identifier
    #[error("{table} not found: {id}")]
    NotFound { table: String, id: String },

    /// Insert of an identifier that already exists
    #[error("{table} already exists: {id}")]
    DuplicateKey { table: String, id: String },

    /// Exactly one row was expected
    #[error("Query did not return a unique result: {count}")]
    NonUniqueResult { count: usize },

    #[error("Named query not registered: {name}")]
    UnknownNamedQuery { name: String },

    /// A select was executed as an update, or the reverse
    #[error("Named query '{name}' is a {actual} query, expected {expected}")]
    WrongQueryKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("No value bound for parameter {param}")]
    MissingParameter { param: String },

    #[error("Parameter '{param}' is not used by the query")]
    UnknownParameter { param: String },

    #[error("Parameter names and values differ in length: {names} names, {values} values")]
    ParameterMismatch { names: usize, values: usize },

    #[error("Invalid like pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Another session published changes since this one was opened
    #[error("Concurrent modification (session version {expected}, store version {actual})")]
    Conflict { expected: u64, actual: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, DaoError>;
