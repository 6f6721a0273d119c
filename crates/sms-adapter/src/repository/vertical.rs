//! Vertical records and their DAO

use serde::{Deserialize, Serialize};
use serde_json::json;

use shared::VerticalConfig;
use sms_dao::{
    Criterion, Entity, GenericDao, NamedQuery, Order, Param, Params, Result, Session, UNSET,
};

/// Named query: vertical by (lowercased) keyword
pub const FIND_BY_KEYWORD: &str = "vertical.findByKeyword";

/// A stored vertical, keyed by its lowercased keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalRecord {
    pub keyword: String,
    pub name: String,
    pub response: String,
}

impl Entity for VerticalRecord {
    type Id = String;
    const TABLE: &'static str = "verticals";

    fn id(&self) -> &String {
        &self.keyword
    }
}

impl From<&VerticalConfig> for VerticalRecord {
    fn from(config: &VerticalConfig) -> Self {
        Self {
            keyword: config.keyword.trim().to_lowercase(),
            name: config.name.clone(),
            response: config.response.clone(),
        }
    }
}

/// DAO for `VerticalRecord`
#[derive(Debug, Clone, Default)]
pub struct VerticalDao {
    dao: GenericDao<VerticalRecord>,
}

impl VerticalDao {
    pub fn new() -> Self {
        Self::default()
    }

    /// Named queries this DAO expects the store to know
    pub fn named_queries() -> Vec<(&'static str, NamedQuery)> {
        vec![(
            FIND_BY_KEYWORD,
            NamedQuery::select(VerticalRecord::TABLE)
                .filter(Criterion::eq("keyword", Param::named("keyword"))),
        )]
    }

    pub fn find_by_keyword<S: Session>(
        &self,
        session: &S,
        keyword: &str,
    ) -> Result<Option<VerticalRecord>> {
        let params = Params::named(&["keyword"], vec![json!(keyword.to_lowercase())])?;
        self.dao.find_unique_by_named_query(session, FIND_BY_KEYWORD, &params)
    }

    /// All verticals ordered by keyword
    pub fn list_ordered<S: Session>(&self, session: &S) -> Result<Vec<VerticalRecord>> {
        self.dao
            .find_by_criteria_limited(session, Order::asc("keyword"), UNSET, &[])
    }

    /// Upsert configured verticals; returns how many were written
    pub fn seed<S: Session>(&self, session: &mut S, verticals: &[VerticalConfig]) -> Result<usize> {
        for config in verticals {
            self.dao.make_persistent(session, VerticalRecord::from(config))?;
        }
        Ok(verticals.len())
    }

    pub fn generic(&self) -> &GenericDao<VerticalRecord> {
        &self.dao
    }
}
