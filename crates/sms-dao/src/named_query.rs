//! Named Queries - Parameterized queries registered under a symbolic name
//!
//! A named query is declared once (usually at startup) and executed many
//! times with different bound values. Values are bound either by position
//! or by name; every parameter the query references must be bound, and a
//! value the query never references is rejected.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::criteria::{Criteria, Criterion, Operand, Order, Param};
use crate::error::{DaoError, Result};

/// Values bound to a named query's parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn none() -> Self {
        Params::None
    }

    pub fn positional<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Pair up names and values; both lists must have the same length
    pub fn named(names: &[&str], values: Vec<Value>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(DaoError::ParameterMismatch {
                names: names.len(),
                values: values.len(),
            });
        }
        Ok(Params::Named(
            names
                .iter()
                .map(|n| n.to_string())
                .zip(values)
                .collect(),
        ))
    }

    /// Value bound to a parameter
    pub fn resolve(&self, param: &Param) -> Result<&Value> {
        let found = match (self, param) {
            (Params::Positional(values), Param::Positional(index)) => values.get(*index),
            (Params::Named(pairs), Param::Named(name)) => {
                pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        };
        found.ok_or_else(|| DaoError::MissingParameter {
            param: param.to_string(),
        })
    }

    /// Reject bound values that the query never references
    fn check_all_used(&self, referenced: &BTreeSet<Param>) -> Result<()> {
        let unused = match self {
            Params::None => None,
            Params::Positional(values) => (0..values.len())
                .map(Param::Positional)
                .find(|p| !referenced.contains(p)),
            Params::Named(pairs) => pairs
                .iter()
                .map(|(name, _)| Param::Named(name.clone()))
                .find(|p| !referenced.contains(p)),
        };
        match unused {
            Some(param) => Err(DaoError::UnknownParameter {
                param: param.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A query declared once and executed by name
#[derive(Debug, Clone, PartialEq)]
pub enum NamedQuery {
    Select {
        table: String,
        restrictions: Vec<Criterion>,
        orders: Vec<Order>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Operand)>,
        restrictions: Vec<Criterion>,
    },
    Delete {
        table: String,
        restrictions: Vec<Criterion>,
    },
}

impl NamedQuery {
    pub fn select(table: impl Into<String>) -> Self {
        NamedQuery::Select {
            table: table.into(),
            restrictions: Vec::new(),
            orders: Vec::new(),
        }
    }

    pub fn update(table: impl Into<String>) -> Self {
        NamedQuery::Update {
            table: table.into(),
            assignments: Vec::new(),
            restrictions: Vec::new(),
        }
    }

    pub fn delete(table: impl Into<String>) -> Self {
        NamedQuery::Delete {
            table: table.into(),
            restrictions: Vec::new(),
        }
    }

    /// Builder: add a restriction
    pub fn filter(mut self, criterion: Criterion) -> Self {
        match &mut self {
            NamedQuery::Select { restrictions, .. }
            | NamedQuery::Update { restrictions, .. }
            | NamedQuery::Delete { restrictions, .. } => restrictions.push(criterion),
        }
        self
    }

    /// Builder: add a sort key (select queries only)
    pub fn order_by(mut self, order: Order) -> Self {
        if let NamedQuery::Select { orders, .. } = &mut self {
            orders.push(order);
        }
        self
    }

    /// Builder: assign a property (update queries only)
    pub fn set(mut self, property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        if let NamedQuery::Update { assignments, .. } = &mut self {
            assignments.push((property.into(), operand.into()));
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NamedQuery::Select { .. } => "select",
            NamedQuery::Update { .. } => "update",
            NamedQuery::Delete { .. } => "delete",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            NamedQuery::Select { table, .. }
            | NamedQuery::Update { table, .. }
            | NamedQuery::Delete { table, .. } => table,
        }
    }

    fn restrictions(&self) -> &[Criterion] {
        match self {
            NamedQuery::Select { restrictions, .. }
            | NamedQuery::Update { restrictions, .. }
            | NamedQuery::Delete { restrictions, .. } => restrictions,
        }
    }

    /// Every parameter referenced by the query
    pub fn params(&self) -> BTreeSet<Param> {
        let mut out = BTreeSet::new();
        for criterion in self.restrictions() {
            criterion.collect_params(&mut out);
        }
        if let NamedQuery::Update { assignments, .. } = self {
            for (_, operand) in assignments {
                if let Operand::Param(param) = operand {
                    out.insert(param.clone());
                }
            }
        }
        out
    }

    fn bind_restrictions(&self, params: &Params) -> Result<Criteria> {
        params.check_all_used(&self.params())?;
        let restrictions = self
            .restrictions()
            .iter()
            .map(|c| c.bind(params))
            .collect::<Result<Vec<_>>>()?;
        Ok(Criteria::for_table(self.table()).add_all(restrictions))
    }

    /// Bind a select query into executable criteria
    pub fn to_criteria(&self, name: &str, params: &Params) -> Result<Criteria> {
        let NamedQuery::Select { orders, .. } = self else {
            return Err(self.wrong_kind(name, "select"));
        };
        let criteria = self.bind_restrictions(params)?;
        Ok(orders.iter().cloned().fold(criteria, Criteria::add_order))
    }

    /// Bind an update or delete query
    pub fn bind_update(&self, name: &str, params: &Params) -> Result<BoundUpdate> {
        let action = match self {
            NamedQuery::Select { .. } => return Err(self.wrong_kind(name, "update")),
            NamedQuery::Update { assignments, .. } => UpdateAction::Assign(
                assignments
                    .iter()
                    .map(|(property, operand)| {
                        Ok((property.clone(), operand.bind(params)?.value()?.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            NamedQuery::Delete { .. } => UpdateAction::Delete,
        };
        Ok(BoundUpdate {
            criteria: self.bind_restrictions(params)?,
            action,
        })
    }

    fn wrong_kind(&self, name: &str, expected: &'static str) -> DaoError {
        DaoError::WrongQueryKind {
            name: name.to_string(),
            expected,
            actual: self.kind(),
        }
    }
}

/// What a bound update does to each matching row
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    Assign(Vec<(String, Value)>),
    Delete,
}

/// An update or delete with all parameters resolved
#[derive(Debug, Clone, PartialEq)]
pub struct BoundUpdate {
    pub criteria: Criteria,
    pub action: UpdateAction,
}

/// New content of one row touched by a bound update; `None` removes it
pub type RowChange = (String, Option<Value>);

impl BoundUpdate {
    pub fn table(&self) -> &str {
        self.criteria.table()
    }

    /// Compute the change to every matching row without touching the rows
    ///
    /// Fails as a whole if any assignment fails, so callers can apply the
    /// returned changes knowing the update succeeded for every row.
    pub fn plan<'a>(
        &self,
        rows: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> Result<Vec<RowChange>> {
        let mut changes = Vec::new();
        for (key, row) in rows {
            if !self.criteria.matches(row)? {
                continue;
            }
            let next = match &self.action {
                UpdateAction::Delete => None,
                UpdateAction::Assign(assignments) => {
                    let mut row = row.clone();
                    for (property, value) in assignments {
                        set_property(&mut row, property, value.clone())?;
                    }
                    Some(row)
                }
            };
            changes.push((key.clone(), next));
        }
        Ok(changes)
    }
}

/// Write a value at a dotted property path, creating intermediate objects
pub fn set_property(row: &mut Value, path: &str, value: Value) -> Result<()> {
    let mut segments = path.split('.').peekable();
    let mut current = row;

    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return Err(DaoError::Store(format!(
                "cannot assign '{}': parent of '{}' is not an object",
                path, segment
            )));
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    Ok(())
}
