//! Entity - A persistent record handled by the generic DAO
//!
//! The entity type is a plain type parameter. What the store needs to
//! know about it (table name, identifier) is declared explicitly here.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::error::Result;

/// A record the store can persist
///
/// Rows are stored as their serde JSON form, so criteria can address any
/// serialized property by name.
pub trait Entity: Serialize + DeserializeOwned {
    /// Identifier type; must serialize to a stable key
    type Id: Serialize + DeserializeOwned + Clone + Debug + PartialEq;

    /// Table holding rows of this entity
    const TABLE: &'static str;

    /// Identity of this record
    fn id(&self) -> &Self::Id;
}

/// Canonical store key for an identifier
///
/// The JSON encoding keeps `1` and `"1"` distinct.
pub fn key_of<I: Serialize>(id: &I) -> Result<String> {
    Ok(serde_json::to_string(id)?)
}
