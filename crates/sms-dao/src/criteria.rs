//! Criteria - Composable query filters evaluated against stored rows
//!
//! A `Criteria` names a table, a conjunction of `Criterion` restrictions,
//! an ordering and an optional page window. Stores evaluate it against the
//! JSON form of their rows, so the same filter works for any entity.

use regex::RegexBuilder;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{DaoError, Result};
use crate::named_query::Params;

/// Sentinel accepted by the paging helpers meaning "not set"
pub const UNSET: i64 = -1;

/// Placeholder for a value supplied when a named query is executed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    /// Zero-based position in the bound value list
    Positional(usize),
    /// Bound by name
    Named(String),
}

impl Param {
    pub fn positional(index: usize) -> Self {
        Param::Positional(index)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Param::Named(name.into())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Positional(index) => write!(f, "?{}", index),
            Param::Named(name) => write!(f, ":{}", name),
        }
    }
}

/// Right-hand side of a restriction: a literal or a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Param(Param),
}

impl Operand {
    /// Replace a parameter with its bound value
    pub fn bind(&self, params: &Params) -> Result<Operand> {
        match self {
            Operand::Value(value) => Ok(Operand::Value(value.clone())),
            Operand::Param(param) => Ok(Operand::Value(params.resolve(param)?.clone())),
        }
    }

    /// The literal value; fails for a parameter that was never bound
    pub fn value(&self) -> Result<&Value> {
        match self {
            Operand::Value(value) => Ok(value),
            Operand::Param(param) => Err(DaoError::MissingParameter {
                param: param.to_string(),
            }),
        }
    }

    fn collect_param(&self, out: &mut BTreeSet<Param>) {
        if let Operand::Param(param) = self {
            out.insert(param.clone());
        }
    }
}

impl From<Param> for Operand {
    fn from(param: Param) -> Self {
        Operand::Param(param)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

macro_rules! operand_from_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(Value::from(value))
                }
            }
        )*
    };
}

operand_from_literal!(&str, String, bool, i32, i64, u32, u64, f64);

/// Comparison operator of a `Criterion::Compare`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }

    fn accepts_opt(self, ordering: Option<Ordering>) -> bool {
        ordering.is_some_and(|o| self.accepts(o))
    }
}

/// A single restriction on a row
///
/// Properties are dotted paths into the row (`"sender.country"`).
/// A missing or null property never satisfies a comparison; only
/// `IsNull` matches it.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Compare {
        property: String,
        op: CompareOp,
        operand: Operand,
    },
    Like {
        property: String,
        pattern: Operand,
        case_insensitive: bool,
    },
    In {
        property: String,
        operands: Vec<Operand>,
    },
    Between {
        property: String,
        low: Operand,
        high: Operand,
    },
    IsNull(String),
    IsNotNull(String),
    And(Vec<Criterion>),
    Or(Vec<Criterion>),
    Not(Box<Criterion>),
}

impl Criterion {
    fn compare(property: impl Into<String>, op: CompareOp, operand: impl Into<Operand>) -> Self {
        Criterion::Compare {
            property: property.into(),
            op,
            operand: operand.into(),
        }
    }

    pub fn eq(property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(property, CompareOp::Eq, operand)
    }

    pub fn ne(property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(property, CompareOp::Ne, operand)
    }

    pub fn gt(property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(property, CompareOp::Gt, operand)
    }

    pub fn ge(property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(property, CompareOp::Ge, operand)
    }

    pub fn lt(property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(property, CompareOp::Lt, operand)
    }

    pub fn le(property: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::compare(property, CompareOp::Le, operand)
    }

    /// SQL-style pattern: `%` matches any run, `_` a single character
    pub fn like(property: impl Into<String>, pattern: impl Into<Operand>) -> Self {
        Criterion::Like {
            property: property.into(),
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    pub fn ilike(property: impl Into<String>, pattern: impl Into<Operand>) -> Self {
        Criterion::Like {
            property: property.into(),
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn in_list<O: Into<Operand>>(
        property: impl Into<String>,
        operands: impl IntoIterator<Item = O>,
    ) -> Self {
        Criterion::In {
            property: property.into(),
            operands: operands.into_iter().map(Into::into).collect(),
        }
    }

    /// Inclusive on both ends
    pub fn between(
        property: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        Criterion::Between {
            property: property.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Criterion::IsNull(property.into())
    }

    pub fn is_not_null(property: impl Into<String>) -> Self {
        Criterion::IsNotNull(property.into())
    }

    pub fn and(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::And(criteria.into_iter().collect())
    }

    pub fn or(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::Or(criteria.into_iter().collect())
    }

    pub fn not(criterion: Criterion) -> Self {
        Criterion::Not(Box::new(criterion))
    }

    /// Copy of this restriction with every parameter replaced by its value
    pub fn bind(&self, params: &Params) -> Result<Criterion> {
        Ok(match self {
            Criterion::Compare {
                property,
                op,
                operand,
            } => Criterion::Compare {
                property: property.clone(),
                op: *op,
                operand: operand.bind(params)?,
            },
            Criterion::Like {
                property,
                pattern,
                case_insensitive,
            } => Criterion::Like {
                property: property.clone(),
                pattern: pattern.bind(params)?,
                case_insensitive: *case_insensitive,
            },
            Criterion::In { property, operands } => Criterion::In {
                property: property.clone(),
                operands: operands
                    .iter()
                    .map(|o| o.bind(params))
                    .collect::<Result<Vec<_>>>()?,
            },
            Criterion::Between {
                property,
                low,
                high,
            } => Criterion::Between {
                property: property.clone(),
                low: low.bind(params)?,
                high: high.bind(params)?,
            },
            Criterion::IsNull(property) => Criterion::IsNull(property.clone()),
            Criterion::IsNotNull(property) => Criterion::IsNotNull(property.clone()),
            Criterion::And(inner) => Criterion::And(
                inner
                    .iter()
                    .map(|c| c.bind(params))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Criterion::Or(inner) => Criterion::Or(
                inner
                    .iter()
                    .map(|c| c.bind(params))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Criterion::Not(inner) => Criterion::Not(Box::new(inner.bind(params)?)),
        })
    }

    /// Parameters referenced anywhere in this restriction
    pub fn collect_params(&self, out: &mut BTreeSet<Param>) {
        match self {
            Criterion::Compare { operand, .. } => operand.collect_param(out),
            Criterion::Like { pattern, .. } => pattern.collect_param(out),
            Criterion::In { operands, .. } => {
                operands.iter().for_each(|o| o.collect_param(out));
            }
            Criterion::Between { low, high, .. } => {
                low.collect_param(out);
                high.collect_param(out);
            }
            Criterion::IsNull(_) | Criterion::IsNotNull(_) => {}
            Criterion::And(inner) | Criterion::Or(inner) => {
                inner.iter().for_each(|c| c.collect_params(out));
            }
            Criterion::Not(inner) => inner.collect_params(out),
        }
    }

    /// Evaluate against a row; fails on unbound parameters
    pub fn matches(&self, row: &Value) -> Result<bool> {
        match self {
            Criterion::Compare {
                property,
                op,
                operand,
            } => {
                let expected = operand.value()?;
                Ok(present(row, property)
                    .and_then(|actual| compare_values(actual, expected))
                    .is_some_and(|ordering| op.accepts(ordering)))
            }
            Criterion::Like {
                property,
                pattern,
                case_insensitive,
            } => {
                let pattern = match pattern.value()? {
                    Value::String(p) => p,
                    other => {
                        return Err(DaoError::InvalidPattern {
                            pattern: other.to_string(),
                            reason: "pattern must be a string".to_string(),
                        })
                    }
                };
                match present(row, property) {
                    Some(Value::String(actual)) => {
                        Ok(like_matches(pattern, actual, *case_insensitive)?)
                    }
                    _ => Ok(false),
                }
            }
            Criterion::In { property, operands } => {
                let Some(actual) = present(row, property) else {
                    return Ok(false);
                };
                for operand in operands {
                    if compare_values(actual, operand.value()?) == Some(Ordering::Equal) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Criterion::Between {
                property,
                low,
                high,
            } => {
                let (low, high) = (low.value()?, high.value()?);
                Ok(present(row, property).is_some_and(|actual| {
                    CompareOp::Ge.accepts_opt(compare_values(actual, low))
                        && CompareOp::Le.accepts_opt(compare_values(actual, high))
                }))
            }
            Criterion::IsNull(property) => Ok(present(row, property).is_none()),
            Criterion::IsNotNull(property) => Ok(present(row, property).is_some()),
            Criterion::And(inner) => {
                for criterion in inner {
                    if !criterion.matches(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Criterion::Or(inner) => {
                for criterion in inner {
                    if criterion.matches(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Criterion::Not(inner) => Ok(!inner.matches(row)?),
        }
    }
}

/// Look up a dotted property path in a row
///
/// Numeric segments index into arrays.
pub fn property<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Property value, treating JSON null as absent
fn present<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    property(row, path).filter(|v| !v.is_null())
}

/// Compare two values of the same kind; `None` when they are not comparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

fn like_matches(pattern: &str, text: &str, case_insensitive: bool) -> Result<bool> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("^(?s)");
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    expr.push('$');

    let regex = RegexBuilder::new(&expr)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| DaoError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
    Ok(regex.is_match(text))
}

/// Sort key of a row on one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    property: String,
    ascending: bool,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }

    /// Total order over rows; absent values sort first when ascending
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = total_cmp(present(a, &self.property), present(b, &self.property));
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn total_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y)
            .unwrap_or_else(|| kind_rank(x).cmp(&kind_rank(y))),
    }
}

/// Offset/limit window over a result list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub first_result: Option<usize>,
    pub max_results: Option<usize>,
}

impl Paging {
    pub fn unpaged() -> Self {
        Self::default()
    }

    /// Build from the integer conventions used by callers
    ///
    /// `start > -1` sets the offset. `max_records > 0` sets the limit;
    /// `-1` and `0` both mean "no limit".
    pub fn from_sentinels(start: i64, max_records: i64) -> Self {
        Self {
            first_result: (start > UNSET).then(|| start as usize),
            max_results: (max_records > 0).then(|| max_records as usize),
        }
    }

    /// Limit only; same sentinel rules as `from_sentinels`
    pub fn limit(max_records: i64) -> Self {
        Self::from_sentinels(UNSET, max_records)
    }

    pub fn is_unpaged(&self) -> bool {
        self.first_result.is_none() && self.max_results.is_none()
    }

    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        if self.is_unpaged() {
            return rows;
        }
        rows.into_iter()
            .skip(self.first_result.unwrap_or(0))
            .take(self.max_results.unwrap_or(usize::MAX))
            .collect()
    }
}

/// A complete query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    table: String,
    restrictions: Vec<Criterion>,
    orders: Vec<Order>,
    paging: Paging,
}

impl Criteria {
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            restrictions: Vec::new(),
            orders: Vec::new(),
            paging: Paging::unpaged(),
        }
    }

    /// Builder: add a restriction (all restrictions must hold)
    pub fn add(mut self, criterion: Criterion) -> Self {
        self.restrictions.push(criterion);
        self
    }

    /// Builder: add several restrictions
    pub fn add_all(mut self, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        self.restrictions.extend(criteria);
        self
    }

    /// Builder: add a sort key; earlier keys take precedence
    pub fn add_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    // ========== Getters ==========

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    // ========== Evaluation ==========

    pub fn matches(&self, row: &Value) -> Result<bool> {
        for criterion in &self.restrictions {
            if !criterion.matches(row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Filter, sort and page a table's rows
    pub fn apply(&self, rows: impl IntoIterator<Item = Value>) -> Result<Vec<Value>> {
        let mut selected = Vec::new();
        for row in rows {
            if self.matches(&row)? {
                selected.push(row);
            }
        }

        if !self.orders.is_empty() {
            selected.sort_by(|a, b| {
                self.orders
                    .iter()
                    .map(|order| order.compare(a, b))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ok(self.paging.apply(selected))
    }
}
