//! # SMS Search DAO
//!
//! Generic data access for any serde entity, over a pluggable store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    DAO Layer (This Crate)                        │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │  generic_dao  - GenericDao<T>: CRUD, criteria, named queries ││
//! │  │  criteria     - Criterion / Order / Paging / Criteria        ││
//! │  │  named_query  - NamedQuery + positional/named Params         ││
//! │  │  session      - Session trait (the store port)               ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store implementations live in `sms-adapter`.

pub mod criteria;
pub mod entity;
pub mod error;
pub mod generic_dao;
pub mod named_query;
pub mod session;

// Re-export commonly used types
pub use criteria::{CompareOp, Criteria, Criterion, Operand, Order, Paging, Param, UNSET};
pub use entity::{key_of, Entity};
pub use error::{DaoError, Result};
pub use generic_dao::{unique_result, GenericDao};
pub use named_query::{BoundUpdate, NamedQuery, Params, RowChange, UpdateAction};
pub use session::Session;
