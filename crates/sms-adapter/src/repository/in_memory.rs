//! In-Memory Store
//!
//! Tables live behind an `RwLock` shared by every session. A session works
//! on its own snapshot of the tables; `flush`/`commit` publish the
//! snapshot back, `clear`/`rollback` throw it away.
//!
//! Publishing is optimistic: if another session published since this one
//! last synchronized, the publish fails with `DaoError::Conflict`.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use sms_dao::{BoundUpdate, Criteria, DaoError, NamedQuery, Result, Session};

type Table = BTreeMap<String, Value>;
type Tables = BTreeMap<String, Table>;

#[derive(Debug, Default)]
struct StoreState {
    tables: Tables,
    version: u64,
    named_queries: HashMap<String, NamedQuery>,
}

/// Shared in-memory store
///
/// Cloning is cheap and yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| DaoError::Store("Failed to acquire read lock".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| DaoError::Store("Failed to acquire write lock".to_string()))
    }

    /// Register (or replace) a named query
    pub fn register_named_query(&self, name: impl Into<String>, query: NamedQuery) -> Result<()> {
        let name = name.into();
        debug!(query = %name, kind = query.kind(), table = query.table(), "registered named query");
        self.write()?.named_queries.insert(name, query);
        Ok(())
    }

    /// Start a unit of work on a snapshot of the current tables
    pub fn open_session(&self) -> Result<InMemorySession> {
        let state = self.read()?;
        Ok(InMemorySession {
            store: self.clone(),
            working: state.tables.clone(),
            base_version: state.version,
            dirty: false,
        })
    }

    /// Number of publishes so far
    pub fn version(&self) -> Result<u64> {
        Ok(self.read()?.version)
    }

    /// Published row count of a table
    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.read()?.tables.get(table).map_or(0, |t| t.len()))
    }
}

/// A unit of work against an `InMemoryStore`
#[derive(Debug)]
pub struct InMemorySession {
    store: InMemoryStore,
    working: Tables,
    base_version: u64,
    dirty: bool,
}

impl InMemorySession {
    /// Whether there are changes not yet published
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn table_mut(&mut self, table: &str) -> &mut Table {
        self.dirty = true;
        self.working.entry(table.to_string()).or_default()
    }

    fn publish(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let mut state = self.store.write()?;
        if state.version != self.base_version {
            return Err(DaoError::Conflict {
                expected: self.base_version,
                actual: state.version,
            });
        }

        state.tables = self.working.clone();
        state.version += 1;
        self.base_version = state.version;
        self.dirty = false;
        debug!(version = state.version, "session published");
        Ok(())
    }
}

impl Session for InMemorySession {
    fn get(&self, table: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.working.get(table).and_then(|t| t.get(key)).cloned())
    }

    fn load_all(&self, table: &str) -> Result<Vec<Value>> {
        Ok(self
            .working
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&mut self, table: &str, key: &str, row: Value) -> Result<()> {
        if self.get(table, key)?.is_some() {
            return Err(DaoError::DuplicateKey {
                table: table.to_string(),
                id: key.to_string(),
            });
        }
        self.table_mut(table).insert(key.to_string(), row);
        Ok(())
    }

    fn update(&mut self, table: &str, key: &str, row: Value) -> Result<()> {
        if self.get(table, key)?.is_none() {
            return Err(DaoError::NotFound {
                table: table.to_string(),
                id: key.to_string(),
            });
        }
        self.table_mut(table).insert(key.to_string(), row);
        Ok(())
    }

    fn upsert(&mut self, table: &str, key: &str, row: Value) -> Result<()> {
        self.table_mut(table).insert(key.to_string(), row);
        Ok(())
    }

    fn remove(&mut self, table: &str, key: &str) -> Result<bool> {
        if self.get(table, key)?.is_none() {
            return Ok(false);
        }
        Ok(self.table_mut(table).remove(key).is_some())
    }

    fn list(&self, criteria: &Criteria) -> Result<Vec<Value>> {
        criteria.apply(self.load_all(criteria.table())?)
    }

    fn named_query(&self, name: &str) -> Result<NamedQuery> {
        self.store
            .read()?
            .named_queries
            .get(name)
            .cloned()
            .ok_or_else(|| DaoError::UnknownNamedQuery {
                name: name.to_string(),
            })
    }

    fn execute_update(&mut self, update: &BoundUpdate) -> Result<usize> {
        let changes = match self.working.get(update.table()) {
            Some(rows) => update.plan(rows)?,
            None => return Ok(0),
        };
        if changes.is_empty() {
            return Ok(0);
        }

        let affected = changes.len();
        let rows = self.table_mut(update.table());
        for (key, next) in changes {
            match next {
                Some(row) => {
                    rows.insert(key, row);
                }
                None => {
                    rows.remove(&key);
                }
            }
        }
        Ok(affected)
    }

    fn flush(&mut self) -> Result<()> {
        self.publish()
    }

    fn clear(&mut self) -> Result<()> {
        let state = self.store.read()?;
        self.working = state.tables.clone();
        self.base_version = state.version;
        self.dirty = false;
        Ok(())
    }

    fn commit(mut self) -> Result<()> {
        self.publish()
    }

    fn rollback(mut self) {
        if self.dirty {
            debug!("session rolled back with unpublished changes");
        }
        self.dirty = false;
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        if self.dirty {
            warn!("session dropped without commit; discarding unpublished changes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sms_dao::{Criterion, Order, Param, Params};

    #[test]
    fn test_commit_publishes_to_new_sessions() {
        let store = InMemoryStore::new();

        let mut session = store.open_session().unwrap();
        session.insert("verticals", "\"weather\"", json!({ "keyword": "weather" })).unwrap();
        assert!(session.is_dirty());
        assert_eq!(store.row_count("verticals").unwrap(), 0);
        session.commit().unwrap();

        assert_eq!(store.row_count("verticals").unwrap(), 1);
        assert_eq!(store.version().unwrap(), 1);

        let reader = store.open_session().unwrap();
        assert!(reader.get("verticals", "\"weather\"").unwrap().is_some());
    }

    #[test]
    fn test_rollback_and_drop_discard_changes() {
        let store = InMemoryStore::new();

        let mut session = store.open_session().unwrap();
        session.upsert("verticals", "\"a\"", json!({})).unwrap();
        session.rollback();

        {
            let mut dropped = store.open_session().unwrap();
            dropped.upsert("verticals", "\"b\"", json!({})).unwrap();
        }

        assert_eq!(store.row_count("verticals").unwrap(), 0);
        assert_eq!(store.version().unwrap(), 0);
    }

    #[test]
    fn test_flush_keeps_session_open_and_clear_reloads() {
        let store = InMemoryStore::new();
        let mut session = store.open_session().unwrap();

        session.upsert("t", "1", json!({ "id": 1 })).unwrap();
        session.flush().unwrap();
        assert_eq!(store.row_count("t").unwrap(), 1);
        assert!(!session.is_dirty());

        session.upsert("t", "2", json!({ "id": 2 })).unwrap();
        session.clear().unwrap();
        assert!(session.get("t", "2").unwrap().is_none());
        assert!(session.get("t", "1").unwrap().is_some());
        session.commit().unwrap();
        assert_eq!(store.version().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_publish_conflicts() {
        let store = InMemoryStore::new();
        let mut first = store.open_session().unwrap();
        let mut second = store.open_session().unwrap();

        first.upsert("t", "1", json!({ "id": 1 })).unwrap();
        second.upsert("t", "2", json!({ "id": 2 })).unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, DaoError::Conflict { expected: 0, actual: 1 }));
        assert_eq!(store.row_count("t").unwrap(), 1);
    }

    #[test]
    fn test_read_only_session_never_conflicts() {
        let store = InMemoryStore::new();
        let reader = store.open_session().unwrap();

        let mut writer = store.open_session().unwrap();
        writer.upsert("t", "1", json!({})).unwrap();
        writer.commit().unwrap();

        reader.commit().unwrap();
    }

    #[test]
    fn test_insert_update_remove_contracts() {
        let store = InMemoryStore::new();
        let mut session = store.open_session().unwrap();

        session.insert("t", "1", json!({ "v": 1 })).unwrap();
        assert!(matches!(
            session.insert("t", "1", json!({ "v": 2 })).unwrap_err(),
            DaoError::DuplicateKey { .. }
        ));
        assert!(matches!(
            session.update("t", "9", json!({})).unwrap_err(),
            DaoError::NotFound { .. }
        ));

        session.update("t", "1", json!({ "v": 3 })).unwrap();
        assert_eq!(session.get("t", "1").unwrap(), Some(json!({ "v": 3 })));
        assert!(session.remove("t", "1").unwrap());
        assert!(!session.remove("t", "1").unwrap());
    }

    #[test]
    fn test_failed_update_leaves_session_untouched() {
        let store = InMemoryStore::new();
        let mut session = store.open_session().unwrap();
        session.insert("items", "1", json!({ "id": 1, "meta": {} })).unwrap();
        session.insert("items", "2", json!({ "id": 2, "meta": 5 })).unwrap();
        session.commit().unwrap();

        let mut session = store.open_session().unwrap();
        let update = NamedQuery::update("items")
            .set("meta.tag", true)
            .bind_update("items.tagAll", &Params::none())
            .unwrap();
        assert!(session.execute_update(&update).is_err());
        assert_eq!(session.get("items", "1").unwrap(), Some(json!({ "id": 1, "meta": {} })));
        assert!(!session.is_dirty());

        session.commit().unwrap();
        let reader = store.open_session().unwrap();
        assert_eq!(reader.get("items", "1").unwrap(), Some(json!({ "id": 1, "meta": {} })));
        assert_eq!(store.version().unwrap(), 1);
    }

    #[test]
    fn test_named_queries_through_session() {
        let store = InMemoryStore::new();
        store
            .register_named_query(
                "msg.byPhone",
                NamedQuery::select("msgs")
                    .filter(Criterion::eq("phone", Param::named("phone")))
                    .order_by(Order::asc("id")),
            )
            .unwrap();
        store
            .register_named_query(
                "msg.archive",
                NamedQuery::update("msgs")
                    .set("archived", true)
                    .filter(Criterion::eq("phone", Param::positional(0))),
            )
            .unwrap();

        let mut session = store.open_session().unwrap();
        session.insert("msgs", "1", json!({ "id": 1, "phone": "+1" })).unwrap();
        session.insert("msgs", "2", json!({ "id": 2, "phone": "+2" })).unwrap();
        session.insert("msgs", "3", json!({ "id": 3, "phone": "+1" })).unwrap();

        let params = Params::named(&["phone"], vec![json!("+1")]).unwrap();
        let criteria = session
            .named_query("msg.byPhone")
            .unwrap()
            .to_criteria("msg.byPhone", &params)
            .unwrap();
        assert_eq!(session.list(&criteria).unwrap().len(), 2);

        let update = session
            .named_query("msg.archive")
            .unwrap()
            .bind_update("msg.archive", &Params::positional(["+1"]))
            .unwrap();
        assert_eq!(session.execute_update(&update).unwrap(), 2);
        assert_eq!(session.get("msgs", "3").unwrap().unwrap()["archived"], json!(true));
        assert!(session.get("msgs", "2").unwrap().unwrap().get("archived").is_none());

        assert!(matches!(
            session.named_query("msg.nope").unwrap_err(),
            DaoError::UnknownNamedQuery { .. }
        ));
    }
}
