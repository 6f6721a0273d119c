//! Session - The store port used by the generic DAO
//!
//! A session is an explicit unit-of-work handle. It is opened by a store
//! adapter, passed by reference into every DAO call, and ended with
//! `commit` or `rollback`. Dropping it without committing discards its
//! unpublished changes.
//!
//! ```text
//! DAO Layer             │  Adapter Layer
//! ──────────────────────┼────────────────────────
//! trait Session         │  InMemorySession
//!   fn get()            │  (SqlSession, ...)
//!   fn list()           │
//! ```
//!
//! Rows cross this boundary as JSON values keyed by `entity::key_of`.

use serde_json::Value;

use crate::criteria::Criteria;
use crate::error::Result;
use crate::named_query::{BoundUpdate, NamedQuery};

pub trait Session {
    /// Row by key
    fn get(&self, table: &str, key: &str) -> Result<Option<Value>>;

    /// Every row of a table, in key order
    fn load_all(&self, table: &str) -> Result<Vec<Value>>;

    /// Insert a new row; `DuplicateKey` if the key exists
    fn insert(&mut self, table: &str, key: &str, row: Value) -> Result<()>;

    /// Replace an existing row; `NotFound` if the key is absent
    fn update(&mut self, table: &str, key: &str, row: Value) -> Result<()>;

    /// Insert or replace
    fn upsert(&mut self, table: &str, key: &str, row: Value) -> Result<()>;

    /// Remove a row; returns whether it existed
    fn remove(&mut self, table: &str, key: &str) -> Result<bool>;

    /// Rows matching the criteria, ordered and paged
    fn list(&self, criteria: &Criteria) -> Result<Vec<Value>>;

    /// Registered named query
    fn named_query(&self, name: &str) -> Result<NamedQuery>;

    /// Run a bound update or delete; returns the number of affected rows
    fn execute_update(&mut self, update: &BoundUpdate) -> Result<usize>;

    /// Publish pending changes without ending the session
    fn flush(&mut self) -> Result<()>;

    /// Discard pending changes
    fn clear(&mut self) -> Result<()>;

    /// Publish pending changes and end the session
    fn commit(self) -> Result<()>
    where
        Self: Sized;

    /// End the session, discarding pending changes
    fn rollback(self)
    where
        Self: Sized;
}
