//! StoredVerticalManager - Verticals looked up in the store by keyword
//!
//! A query is recognized when its first word is the keyword of a stored
//! vertical (case-insensitive). Each call runs in its own read-only
//! session, so `has_vertical` and `execute_query` see the store at two
//! different moments. A vertical removed in between makes `execute_query`
//! fail with a vertical error rather than fall back to online search.

use tracing::debug;

use shared::{render_template, BusinessError, Result};
use sms_business::VerticalManager;
use sms_dao::Session;

use crate::repository::in_memory::InMemoryStore;
use crate::repository::vertical::{VerticalDao, VerticalRecord};

const HANDLER: &str = "stored-verticals";
const NOT_STORED: &str = "no stored vertical recognizes this query \
     (it may have been removed since it was recognized)";

#[derive(Debug, Clone)]
pub struct StoredVerticalManager {
    store: InMemoryStore,
    dao: VerticalDao,
}

impl StoredVerticalManager {
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            dao: VerticalDao::new(),
        }
    }

    /// Keyword a query would be matched on
    pub fn keyword_of(query: &str) -> Option<String> {
        query.split_whitespace().next().map(str::to_lowercase)
    }

    fn lookup(&self, query: &str) -> Result<Option<VerticalRecord>> {
        let Some(keyword) = Self::keyword_of(query) else {
            return Ok(None);
        };

        let session = self.store.open_session().map_err(persistence)?;
        let found = self.dao.find_by_keyword(&session, &keyword).map_err(persistence);
        session.rollback();

        let found = found?;
        debug!(keyword = %keyword, matched = found.is_some(), "vertical lookup");
        Ok(found)
    }
}

fn persistence(err: sms_dao::DaoError) -> BusinessError {
    BusinessError::Persistence(err.to_string())
}

impl VerticalManager for StoredVerticalManager {
    fn has_vertical(&self, query: &str) -> Result<bool> {
        Ok(self.lookup(query)?.is_some())
    }

    fn execute_query(&self, query: &str) -> Result<String> {
        match self.lookup(query)? {
            Some(vertical) => Ok(render_template(&vertical.response, query)),
            None => Err(BusinessError::vertical(HANDLER, query, NOT_STORED)),
        }
    }
}
