//! Generic DAO - Entity-agnostic CRUD, criteria and named-query access
//!
//! `GenericDao<T>` holds no state of its own. Every call takes the session
//! it should run in, so the caller decides where the unit of work starts
//! and ends. Concrete DAOs wrap a `GenericDao` and add their own finders
//! on top of the criteria helpers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::debug;

use crate::criteria::{Criteria, Criterion, Order, Paging};
use crate::entity::{key_of, Entity};
use crate::error::{DaoError, Result};
use crate::named_query::Params;
use crate::session::Session;

/// Collapse a result list that should hold at most one row
///
/// Empty yields `None`, a single row yields it, anything longer is
/// `DaoError::NonUniqueResult`.
pub fn unique_result<V>(rows: Vec<V>) -> Result<Option<V>> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (None, _) => Ok(None),
        (Some(row), 1) => Ok(Some(row)),
        (Some(_), count) => Err(DaoError::NonUniqueResult { count }),
    }
}

/// Data access for one entity type
pub struct GenericDao<T: Entity> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for GenericDao<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for GenericDao<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Entity> std::fmt::Debug for GenericDao<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericDao").field("table", &T::TABLE).finish()
    }
}

impl<T: Entity> GenericDao<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Empty criteria for this entity's table
    pub fn criteria(&self) -> Criteria {
        Criteria::for_table(T::TABLE)
    }

    // ========== CRUD ==========

    pub fn find_by_id<S: Session>(&self, session: &S, id: &T::Id) -> Result<Option<T>> {
        session
            .get(T::TABLE, &key_of(id)?)?
            .map(from_row)
            .transpose()
    }

    pub fn find_all<S: Session>(&self, session: &S) -> Result<Vec<T>> {
        from_rows(session.load_all(T::TABLE)?)
    }

    /// `find_all` with repeated rows removed, keeping first occurrences
    pub fn find_all_distinct<S: Session>(&self, session: &S) -> Result<Vec<T>> {
        let mut seen: Vec<Value> = Vec::new();
        for row in session.load_all(T::TABLE)? {
            if !seen.contains(&row) {
                seen.push(row);
            }
        }
        from_rows(seen)
    }

    pub fn exists<S: Session>(&self, session: &S, id: &T::Id) -> Result<bool> {
        Ok(session.get(T::TABLE, &key_of(id)?)?.is_some())
    }

    /// Insert a new entity and return its identifier
    pub fn save<S: Session>(&self, session: &mut S, entity: &T) -> Result<T::Id> {
        let key = key_of(entity.id())?;
        session.insert(T::TABLE, &key, serde_json::to_value(entity)?)?;
        debug!(table = T::TABLE, key = %key, "saved");
        Ok(entity.id().clone())
    }

    /// Replace an existing entity
    pub fn update<S: Session>(&self, session: &mut S, entity: &T) -> Result<()> {
        let key = key_of(entity.id())?;
        session.update(T::TABLE, &key, serde_json::to_value(entity)?)?;
        debug!(table = T::TABLE, key = %key, "updated");
        Ok(())
    }

    /// Save or update
    pub fn make_persistent<S: Session>(&self, session: &mut S, entity: T) -> Result<T> {
        let key = key_of(entity.id())?;
        session.upsert(T::TABLE, &key, serde_json::to_value(&entity)?)?;
        Ok(entity)
    }

    pub fn make_transient<S: Session>(&self, session: &mut S, entity: &T) -> Result<()> {
        self.delete(session, entity)
    }

    pub fn delete<S: Session>(&self, session: &mut S, entity: &T) -> Result<()> {
        self.delete_by_id(session, entity.id())
    }

    pub fn delete_by_id<S: Session>(&self, session: &mut S, id: &T::Id) -> Result<()> {
        let key = key_of(id)?;
        if !session.remove(T::TABLE, &key)? {
            return Err(DaoError::NotFound {
                table: T::TABLE.to_string(),
                id: key,
            });
        }
        debug!(table = T::TABLE, key = %key, "deleted");
        Ok(())
    }

    pub fn flush<S: Session>(&self, session: &mut S) -> Result<()> {
        session.flush()
    }

    pub fn clear<S: Session>(&self, session: &mut S) -> Result<()> {
        session.clear()
    }

    // ========== Criteria ==========

    pub fn find_by_criteria<S: Session>(
        &self,
        session: &S,
        criterion: &[Criterion],
    ) -> Result<Vec<T>> {
        self.list(session, self.criteria().add_all(criterion.iter().cloned()))
    }

    pub fn find_unique_by_criteria<S: Session>(
        &self,
        session: &S,
        criterion: &[Criterion],
    ) -> Result<Option<T>> {
        unique_result(self.find_by_criteria(session, criterion)?)
    }

    pub fn find_unique_by_criteria_ordered<S: Session>(
        &self,
        session: &S,
        order: Order,
        criterion: &[Criterion],
    ) -> Result<Option<T>> {
        let criteria = self
            .criteria()
            .add_all(criterion.iter().cloned())
            .add_order(order);
        unique_result(self.list(session, criteria)?)
    }

    /// Ordered find; `max_records` of `-1` or `0` means no limit
    pub fn find_by_criteria_limited<S: Session>(
        &self,
        session: &S,
        order: Order,
        max_records: i64,
        criterion: &[Criterion],
    ) -> Result<Vec<T>> {
        self.find_paged(session, order, Paging::limit(max_records), criterion)
    }

    /// Ordered page; `start` of `-1` means no offset, `max_records` of
    /// `-1` or `0` means no limit
    pub fn find_by_criteria_page<S: Session>(
        &self,
        session: &S,
        order: Order,
        start: i64,
        max_records: i64,
        criterion: &[Criterion],
    ) -> Result<Vec<T>> {
        self.find_paged(session, order, Paging::from_sentinels(start, max_records), criterion)
    }

    fn find_paged<S: Session>(
        &self,
        session: &S,
        order: Order,
        paging: Paging,
        criterion: &[Criterion],
    ) -> Result<Vec<T>> {
        let criteria = self
            .criteria()
            .add_all(criterion.iter().cloned())
            .add_order(order)
            .with_paging(paging);
        self.list(session, criteria)
    }

    fn list<S: Session>(&self, session: &S, criteria: Criteria) -> Result<Vec<T>> {
        from_rows(session.list(&criteria)?)
    }

    // ========== Named Queries ==========

    pub fn find_by_named_query<S: Session>(
        &self,
        session: &S,
        query_name: &str,
        params: &Params,
    ) -> Result<Vec<T>> {
        self.find_by_named_query_as(session, query_name, params)
    }

    /// Named select with rows read as a projection type
    pub fn find_by_named_query_as<V: DeserializeOwned, S: Session>(
        &self,
        session: &S,
        query_name: &str,
        params: &Params,
    ) -> Result<Vec<V>> {
        let criteria = session
            .named_query(query_name)?
            .to_criteria(query_name, params)?;
        debug!(query = query_name, table = criteria.table(), "executing named select");
        from_rows(session.list(&criteria)?)
    }

    /// Named select using name/value pairs; lengths must match
    pub fn find_by_named_query_and_named_param<S: Session>(
        &self,
        session: &S,
        query_name: &str,
        param_names: &[&str],
        values: Vec<Value>,
    ) -> Result<Vec<T>> {
        let params = Params::named(param_names, values)?;
        self.find_by_named_query(session, query_name, &params)
    }

    pub fn find_unique_by_named_query<S: Session>(
        &self,
        session: &S,
        query_name: &str,
        params: &Params,
    ) -> Result<Option<T>> {
        unique_result(self.find_by_named_query(session, query_name, params)?)
    }

    pub fn find_unique_by_named_query_as<V: DeserializeOwned, S: Session>(
        &self,
        session: &S,
        query_name: &str,
        params: &Params,
    ) -> Result<Option<V>> {
        unique_result(self.find_by_named_query_as(session, query_name, params)?)
    }

    /// Named update/delete with positional values; returns affected rows
    pub fn update_by_named_query<S: Session>(
        &self,
        session: &mut S,
        query_name: &str,
        values: Vec<Value>,
    ) -> Result<usize> {
        self.execute_named_update(session, query_name, &Params::Positional(values))
    }

    /// Named update/delete with named values; returns affected rows
    pub fn update_by_named_query_and_named_param<S: Session>(
        &self,
        session: &mut S,
        query_name: &str,
        param_names: &[&str],
        values: Vec<Value>,
    ) -> Result<usize> {
        let params = Params::named(param_names, values)?;
        self.execute_named_update(session, query_name, &params)
    }

    fn execute_named_update<S: Session>(
        &self,
        session: &mut S,
        query_name: &str,
        params: &Params,
    ) -> Result<usize> {
        let bound = session
            .named_query(query_name)?
            .bind_update(query_name, params)?;
        let affected = session.execute_update(&bound)?;
        debug!(query = query_name, affected, "executed named update");
        Ok(affected)
    }
}

fn from_row<V: DeserializeOwned>(row: Value) -> Result<V> {
    Ok(serde_json::from_value(row)?)
}

fn from_rows<V: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<V>> {
    rows.into_iter().map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Param;
    use crate::named_query::{BoundUpdate, NamedQuery};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SmsQuery {
        id: u64,
        phone: String,
        query: String,
        status: String,
    }

    impl Entity for SmsQuery {
        type Id = u64;
        const TABLE: &'static str = "sms_queries";

        fn id(&self) -> &u64 {
            &self.id
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct QueryText {
        query: String,
    }

    fn sms(id: u64, phone: &str, query: &str) -> SmsQuery {
        SmsQuery {
            id,
            phone: phone.to_string(),
            query: query.to_string(),
            status: "new".to_string(),
        }
    }

    /// Session backed by plain maps, for testing
    #[derive(Default)]
    struct MapSession {
        tables: BTreeMap<String, BTreeMap<String, Value>>,
        named: HashMap<String, NamedQuery>,
    }

    impl Session for MapSession {
        fn get(&self, table: &str, key: &str) -> Result<Option<Value>> {
            Ok(self.tables.get(table).and_then(|t| t.get(key)).cloned())
        }

        fn load_all(&self, table: &str) -> Result<Vec<Value>> {
            Ok(self
                .tables
                .get(table)
                .map(|t| t.values().cloned().collect())
                .unwrap_or_default())
        }

        fn insert(&mut self, table: &str, key: &str, row: Value) -> Result<()> {
            let rows = self.tables.entry(table.to_string()).or_default();
            if rows.contains_key(key) {
                return Err(DaoError::DuplicateKey {
                    table: table.to_string(),
                    id: key.to_string(),
                });
            }
            rows.insert(key.to_string(), row);
            Ok(())
        }

        fn update(&mut self, table: &str, key: &str, row: Value) -> Result<()> {
            match self.tables.get_mut(table).and_then(|t| t.get_mut(key)) {
                Some(existing) => {
                    *existing = row;
                    Ok(())
                }
                None => Err(DaoError::NotFound {
                    table: table.to_string(),
                    id: key.to_string(),
                }),
            }
        }

        fn upsert(&mut self, table: &str, key: &str, row: Value) -> Result<()> {
            self.tables
                .entry(table.to_string())
                .or_default()
                .insert(key.to_string(), row);
            Ok(())
        }

        fn remove(&mut self, table: &str, key: &str) -> Result<bool> {
            Ok(self
                .tables
                .get_mut(table)
                .and_then(|t| t.remove(key))
                .is_some())
        }

        fn list(&self, criteria: &Criteria) -> Result<Vec<Value>> {
            criteria.apply(self.load_all(criteria.table())?)
        }

        fn named_query(&self, name: &str) -> Result<NamedQuery> {
            self.named
                .get(name)
                .cloned()
                .ok_or_else(|| DaoError::UnknownNamedQuery {
                    name: name.to_string(),
                })
        }

        fn execute_update(&mut self, update: &BoundUpdate) -> Result<usize> {
            let Some(rows) = self.tables.get_mut(update.table()) else {
                return Ok(0);
            };
            let changes = update.plan(rows.iter())?;
            let affected = changes.len();
            for (key, next) in changes {
                match next {
                    Some(row) => rows.insert(key, row),
                    None => rows.remove(&key),
                };
            }
            Ok(affected)
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            Ok(())
        }

        fn commit(self) -> Result<()> {
            Ok(())
        }

        fn rollback(self) {}
    }

    fn seeded() -> (GenericDao<SmsQuery>, MapSession) {
        let dao = GenericDao::<SmsQuery>::new();
        let mut session = MapSession::default();
        dao.save(&mut session, &sms(1, "+15551234", "weather oslo")).unwrap();
        dao.save(&mut session, &sms(2, "+15559999", "stocks AAPL")).unwrap();
        dao.save(&mut session, &sms(3, "+15551234", "weather paris")).unwrap();
        dao.save(&mut session, &sms(4, "+15551234", "news")).unwrap();
        (dao, session)
    }

    fn ids(rows: &[SmsQuery]) -> Vec<u64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_unique_result() {
        assert_eq!(unique_result(Vec::<u8>::new()).unwrap(), None);
        assert_eq!(unique_result(vec![7]).unwrap(), Some(7));
        let err = unique_result(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DaoError::NonUniqueResult { count: 3 }));
        assert_eq!(err.to_string(), "Query did not return a unique result: 3");
    }

    #[test]
    fn test_crud_round() {
        let (dao, mut session) = seeded();

        assert!(dao.exists(&session, &2).unwrap());
        assert_eq!(dao.find_by_id(&session, &2).unwrap().unwrap().query, "stocks AAPL");
        assert_eq!(dao.find_all(&session).unwrap().len(), 4);

        let mut changed = sms(2, "+15559999", "stocks MSFT");
        changed.status = "answered".to_string();
        dao.update(&mut session, &changed).unwrap();
        assert_eq!(dao.find_by_id(&session, &2).unwrap(), Some(changed.clone()));

        dao.delete(&mut session, &changed).unwrap();
        assert!(!dao.exists(&session, &2).unwrap());
        assert_eq!(dao.find_by_id(&session, &2).unwrap(), None);
    }

    #[test]
    fn test_save_duplicate_and_update_missing() {
        let (dao, mut session) = seeded();

        let err = dao.save(&mut session, &sms(1, "+1", "dup")).unwrap_err();
        assert!(matches!(err, DaoError::DuplicateKey { .. }));

        let err = dao.update(&mut session, &sms(99, "+1", "ghost")).unwrap_err();
        assert!(matches!(err, DaoError::NotFound { .. }));

        let err = dao.delete_by_id(&mut session, &99).unwrap_err();
        assert!(matches!(
            err,
            DaoError::NotFound { table, id } if table == "sms_queries" && id == "99"
        ));
    }

    #[test]
    fn test_make_persistent_upserts() {
        let (dao, mut session) = seeded();

        dao.make_persistent(&mut session, sms(5, "+1", "new row")).unwrap();
        dao.make_persistent(&mut session, sms(1, "+1", "replaced")).unwrap();

        assert_eq!(dao.find_all(&session).unwrap().len(), 5);
        assert_eq!(dao.find_by_id(&session, &1).unwrap().unwrap().query, "replaced");

        dao.make_transient(&mut session, &sms(5, "+1", "new row")).unwrap();
        assert!(!dao.exists(&session, &5).unwrap());
    }

    #[test]
    fn test_find_all_distinct_keeps_first_occurrence() {
        let (dao, mut session) = seeded();
        // Same content under a different key
        let duplicate = serde_json::to_value(sms(1, "+15551234", "weather oslo")).unwrap();
        session.upsert("sms_queries", "\"dup\"", duplicate).unwrap();

        assert_eq!(dao.find_all(&session).unwrap().len(), 5);
        assert_eq!(ids(&dao.find_all_distinct(&session).unwrap()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_find_by_criteria() {
        let (dao, session) = seeded();

        let rows = dao
            .find_by_criteria(
                &session,
                &[Criterion::eq("phone", "+15551234"), Criterion::like("query", "weather%")],
            )
            .unwrap();
        assert_eq!(ids(&rows), vec![1, 3]);

        let unique = dao
            .find_unique_by_criteria(&session, &[Criterion::eq("query", "news")])
            .unwrap();
        assert_eq!(unique.map(|q| q.id), Some(4));

        let err = dao
            .find_unique_by_criteria(&session, &[Criterion::eq("phone", "+15551234")])
            .unwrap_err();
        assert!(matches!(err, DaoError::NonUniqueResult { count: 3 }));

        let none = dao
            .find_unique_by_criteria_ordered(
                &session,
                Order::asc("id"),
                &[Criterion::eq("phone", "+0")],
            )
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_find_by_criteria_limited_sentinels() {
        let (dao, session) = seeded();

        let all = dao.find_by_criteria_limited(&session, Order::desc("id"), -1, &[]).unwrap();
        assert_eq!(ids(&all), vec![4, 3, 2, 1]);

        let zero = dao.find_by_criteria_limited(&session, Order::desc("id"), 0, &[]).unwrap();
        assert_eq!(ids(&zero), vec![4, 3, 2, 1]);

        let two = dao.find_by_criteria_limited(&session, Order::desc("id"), 2, &[]).unwrap();
        assert_eq!(ids(&two), vec![4, 3]);
    }

    #[test]
    fn test_find_by_criteria_page_sentinels() {
        let (dao, session) = seeded();
        let by_phone = [Criterion::eq("phone", "+15551234")];

        let unpaged = dao
            .find_by_criteria_page(&session, Order::asc("id"), -1, -1, &by_phone)
            .unwrap();
        assert_eq!(ids(&unpaged), vec![1, 3, 4]);

        let offset_only = dao
            .find_by_criteria_page(&session, Order::asc("id"), 1, 0, &by_phone)
            .unwrap();
        assert_eq!(ids(&offset_only), vec![3, 4]);

        let page = dao.find_by_criteria_page(&session, Order::asc("id"), 1, 1, &by_phone).unwrap();
        assert_eq!(ids(&page), vec![3]);

        let past_end = dao
            .find_by_criteria_page(&session, Order::asc("id"), 10, 5, &by_phone)
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_named_queries() {
        let (dao, mut session) = seeded();
        session.named.insert(
            "smsQuery.byPhone".to_string(),
            NamedQuery::select("sms_queries")
                .filter(Criterion::eq("phone", Param::named("phone")))
                .order_by(Order::desc("id")),
        );
        session.named.insert(
            "smsQuery.markAnswered".to_string(),
            NamedQuery::update("sms_queries")
                .set("status", Param::positional(0))
                .filter(Criterion::eq("phone", Param::positional(1))),
        );
        session.named.insert(
            "smsQuery.purgePhone".to_string(),
            NamedQuery::delete("sms_queries").filter(Criterion::eq("phone", Param::named("phone"))),
        );

        let rows = dao
            .find_by_named_query_and_named_param(
                &session,
                "smsQuery.byPhone",
                &["phone"],
                vec![json!("+15551234")],
            )
            .unwrap();
        assert_eq!(ids(&rows), vec![4, 3, 1]);

        let us_phone = Params::named(&["phone"], vec![json!("+15559999")]).unwrap();
        let texts: Vec<QueryText> = dao
            .find_by_named_query_as(&session, "smsQuery.byPhone", &us_phone)
            .unwrap();
        assert_eq!(texts, vec![QueryText { query: "stocks AAPL".to_string() }]);

        let unique = dao
            .find_unique_by_named_query(&session, "smsQuery.byPhone", &us_phone)
            .unwrap();
        assert_eq!(unique.map(|q| q.id), Some(2));

        let affected = dao
            .update_by_named_query(
                &mut session,
                "smsQuery.markAnswered",
                vec![json!("answered"), json!("+15551234")],
            )
            .unwrap();
        assert_eq!(affected, 3);
        assert_eq!(dao.find_by_id(&session, &3).unwrap().unwrap().status, "answered");
        assert_eq!(dao.find_by_id(&session, &2).unwrap().unwrap().status, "new");

        let purged = dao
            .update_by_named_query_and_named_param(
                &mut session,
                "smsQuery.purgePhone",
                &["phone"],
                vec![json!("+15551234")],
            )
            .unwrap();
        assert_eq!(purged, 3);
        assert_eq!(ids(&dao.find_all(&session).unwrap()), vec![2]);
    }

    #[test]
    fn test_failed_named_update_changes_no_rows() {
        let (dao, mut session) = seeded();
        session.named.insert(
            "smsQuery.flagAll".to_string(),
            NamedQuery::update("sms_queries").set("meta.flag", true),
        );
        let mut first = serde_json::to_value(sms(1, "+15551234", "weather oslo")).unwrap();
        first["meta"] = json!({});
        session.upsert("sms_queries", "1", first).unwrap();
        let mut second = serde_json::to_value(sms(2, "+15559999", "stocks AAPL")).unwrap();
        second["meta"] = json!(5);
        session.upsert("sms_queries", "2", second).unwrap();

        let err = dao
            .update_by_named_query(&mut session, "smsQuery.flagAll", vec![])
            .unwrap_err();
        assert!(matches!(err, DaoError::Store(_)));
        assert_eq!(session.get("sms_queries", "1").unwrap().unwrap()["meta"], json!({}));
        assert!(session.get("sms_queries", "3").unwrap().unwrap().get("meta").is_none());
    }

    #[test]
    fn test_named_query_errors() {
        let (dao, mut session) = seeded();
        session.named.insert(
            "smsQuery.byPhone".to_string(),
            NamedQuery::select("sms_queries").filter(Criterion::eq("phone", Param::named("phone"))),
        );

        let err = dao
            .find_by_named_query(&session, "smsQuery.missing", &Params::none())
            .unwrap_err();
        assert!(matches!(err, DaoError::UnknownNamedQuery { .. }));

        let err = dao
            .update_by_named_query_and_named_param(
                &mut session,
                "smsQuery.byPhone",
                &["phone", "x"],
                vec![json!("+1")],
            )
            .unwrap_err();
        assert!(matches!(err, DaoError::ParameterMismatch { names: 2, values: 1 }));

        let err = dao
            .update_by_named_query(&mut session, "smsQuery.byPhone", vec![])
            .unwrap_err();
        assert!(matches!(err, DaoError::WrongQueryKind { .. }));
    }
}
