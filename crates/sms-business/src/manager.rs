//! Query managers - The collaborators a query handler routes between
//!
//! These are PORTS: the business layer says what it needs, adapters
//! decide how verticals are recognized and how the online search runs.

use shared::Result;
use std::sync::Arc;

/// Specialized handler for a narrow category of queries
pub trait VerticalManager {
    /// Whether some vertical recognizes this query
    fn has_vertical(&self, query: &str) -> Result<bool>;

    /// Answer a query previously recognized by `has_vertical`
    fn execute_query(&self, query: &str) -> Result<String>;
}

/// Fallback handler for anything no vertical recognizes
pub trait OnlineQueryManager {
    fn execute_query(&self, query: &str) -> Result<String>;
}

impl<T: VerticalManager + ?Sized> VerticalManager for &T {
    fn has_vertical(&self, query: &str) -> Result<bool> {
        (**self).has_vertical(query)
    }

    fn execute_query(&self, query: &str) -> Result<String> {
        (**self).execute_query(query)
    }
}

impl<T: VerticalManager + ?Sized> VerticalManager for Arc<T> {
    fn has_vertical(&self, query: &str) -> Result<bool> {
        (**self).has_vertical(query)
    }

    fn execute_query(&self, query: &str) -> Result<String> {
        (**self).execute_query(query)
    }
}

impl<T: OnlineQueryManager + ?Sized> OnlineQueryManager for &T {
    fn execute_query(&self, query: &str) -> Result<String> {
        (**self).execute_query(query)
    }
}

impl<T: OnlineQueryManager + ?Sized> OnlineQueryManager for Arc<T> {
    fn execute_query(&self, query: &str) -> Result<String> {
        (**self).execute_query(query)
    }
}
