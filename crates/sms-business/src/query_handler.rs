//! Query Handler - Routes a phone number's query to a vertical or online search
//!
//! 1. Ask the vertical manager whether it recognizes the query
//! 2. Recognized: the vertical answers. Otherwise: the online search does
//! 3. Return that answer
//!
//! Stateless: nothing survives between calls. Errors from either manager
//! are returned as-is.

use shared::Result;
use std::fmt;
use tracing::debug;

use crate::manager::{OnlineQueryManager, VerticalManager};

/// Which handler answered a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRoute {
    Vertical,
    Online,
}

impl fmt::Display for QueryRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryRoute::Vertical => write!(f, "vertical"),
            QueryRoute::Online => write!(f, "online"),
        }
    }
}

/// Answer plus the route that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub route: QueryRoute,
    pub result: String,
}

/// Entry point for answering an SMS query
pub trait QueryHandler {
    fn execute_query(&self, phone_number: &str, query: &str) -> Result<String>;
}

/// QueryHandler backed by a vertical manager and an online fallback
#[derive(Debug, Clone)]
pub struct QueryHandlerService<V, O> {
    vertical_manager: V,
    online_query_manager: O,
}

impl<V, O> QueryHandlerService<V, O>
where
    V: VerticalManager,
    O: OnlineQueryManager,
{
    pub fn new(vertical_manager: V, online_query_manager: O) -> Self {
        Self {
            vertical_manager,
            online_query_manager,
        }
    }

    /// Decide which handler should answer
    pub fn route(&self, query: &str) -> Result<QueryRoute> {
        if self.vertical_manager.has_vertical(query)? {
            Ok(QueryRoute::Vertical)
        } else {
            Ok(QueryRoute::Online)
        }
    }

    /// Answer a query and report which handler did
    pub fn execute_routed(&self, phone_number: &str, query: &str) -> Result<QueryOutcome> {
        let route = self.route(query)?;
        debug!(phone_number, %route, "dispatching query");

        let result = match route {
            QueryRoute::Vertical => self.vertical_manager.execute_query(query)?,
            QueryRoute::Online => self.online_query_manager.execute_query(query)?,
        };

        // TODO: persist the result keyed by phone number once the result
        // storage schema (key, retention, idempotence) is defined.
        Ok(QueryOutcome { route, result })
    }
}

impl<V, O> QueryHandler for QueryHandlerService<V, O>
where
    V: VerticalManager,
    O: OnlineQueryManager,
{
    fn execute_query(&self, phone_number: &str, query: &str) -> Result<String> {
        Ok(self.execute_routed(phone_number, query)?.result)
    }
}
