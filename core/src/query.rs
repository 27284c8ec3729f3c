//! Backend-agnostic query language.
//!
//! A [`Query`] is an intermediate representation, not an evaluator: an
//! ordered list of conjunctive [`Clause`]s plus optional sort keys and
//! pagination. Each concrete repository translates it into its native
//! mechanism; [`Query::to_filter_document`] covers the common case of a
//! document store that takes `{"field": {"$op": value}}` filters.
//!
//! All clauses must hold. Clause order never changes the result set; a
//! backend may still use it as an index hint.
//!
//! # Example
//!
//! ```
//! use railyard_core::entity::{Entity, EntityHeader};
//! use railyard_core::query::{Operator, Query, QueryError};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! # #[derive(Clone, Debug, Serialize, Deserialize)]
//! # struct Account { #[serde(flatten)] header: EntityHeader, active: bool }
//! # impl Entity for Account {
//! #     const TAG: &'static str = "urn:railyard:account";
//! #     const ATTRIBUTES: &'static [&'static str] = &["active"];
//! #     fn header(&self) -> &EntityHeader { &self.header }
//! #     fn with_header(self, header: EntityHeader) -> Self { Self { header, ..self } }
//! # }
//! # fn main() -> Result<(), QueryError> {
//! let query = Query::<Account>::new()
//!     .filter("id", Operator::In, json!(["1", "2", "3"]))?
//!     .filter("active", Operator::Eq, true)?;
//!
//! assert_eq!(query.clauses().len(), 2);
//! assert_eq!(
//!     query.to_filter_document(),
//!     json!({"id": {"$in": ["1", "2", "3"]}, "active": {"$eq": true}})
//! );
//!
//! // Only declared attributes are accepted.
//! assert!(Query::<Account>::new().filter("password", Operator::Eq, "x").is_err());
//! # Ok(())
//! # }
//! ```

use crate::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors raised while building a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The property is not a declared attribute of the entity.
    #[error("Property '{property}' is not declared by {tag}")]
    UndeclaredProperty {
        /// The rejected property.
        property: String,
        /// Resource tag of the target entity.
        tag: &'static str,
    },

    /// The value does not fit the operator.
    #[error("Operator '{operator}' expects {expected}")]
    InvalidValue {
        /// The operator.
        operator: String,
        /// What the operator needs.
        expected: &'static str,
    },
}

/// Comparison operator of a clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Member of a set of candidate values.
    In,
    /// Not a member of a set of candidate values.
    NotIn,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Array attribute contains the value, or string attribute contains the substring.
    Contains,
    /// Store-specific extension, passed through by name.
    Other(String),
}

impl Operator {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::Other(name) => name,
        }
    }

    fn expects_array(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        match name {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "in" => Self::In,
            "not_in" | "nin" => Self::NotIn,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "contains" => Self::Contains,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate: `property operator value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// Attribute name.
    pub property: String,
    /// Comparison.
    pub operator: Operator,
    /// Operand (an array for `in` / `not_in`).
    pub value: Value,
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Attribute name.
    pub property: String,
    /// Direction.
    pub direction: Direction,
}

/// Conjunctive query over entities of type `E`.
pub struct Query<E> {
    clauses: Vec<Clause>,
    sort: Vec<SortKey>,
    limit: Option<usize>,
    offset: Option<usize>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<E> {
    /// A query matching every entity.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    fn check_declared(property: &str) -> Result<(), QueryError> {
        if E::declares(property) {
            Ok(())
        } else {
            Err(QueryError::UndeclaredProperty {
                property: property.to_string(),
                tag: E::TAG,
            })
        }
    }

    /// Add a clause (the DSL's `where`).
    ///
    /// # Errors
    ///
    /// [`QueryError::UndeclaredProperty`] when `property` is not an attribute
    /// of `E`; [`QueryError::InvalidValue`] when `in` / `not_in` is given a
    /// non-array operand.
    pub fn filter(
        mut self,
        property: &str,
        operator: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        Self::check_declared(property)?;
        let operator = operator.into();
        let value = value.into();
        if operator.expects_array() && !value.is_array() {
            return Err(QueryError::InvalidValue {
                operator: operator.to_string(),
                expected: "an array of candidate values",
            });
        }
        self.clauses.push(Clause {
            property: property.to_string(),
            operator,
            value,
        });
        Ok(self)
    }

    /// Add a sort key. Earlier keys take precedence.
    ///
    /// # Errors
    ///
    /// [`QueryError::UndeclaredProperty`] when `property` is not an attribute of `E`.
    pub fn order_by(mut self, property: &str, direction: Direction) -> Result<Self, QueryError> {
        Self::check_declared(property)?;
        self.sort.push(SortKey {
            property: property.to_string(),
            direction,
        });
        Ok(self)
    }

    /// Return at most `limit` entities.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` matching entities.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl<E> Query<E> {
    /// Clauses in declaration order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Sort keys in precedence order.
    #[must_use]
    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    /// Page size, if any.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Page offset, if any.
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Whether the query has no clauses.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the clauses as a document-store filter.
    ///
    /// Clauses on distinct `(property, operator)` pairs merge into one
    /// object per property. When two clauses collide the whole filter is
    /// emitted as `{"$and": [...]}` so no clause is lost.
    #[must_use]
    pub fn to_filter_document(&self) -> Value {
        let mut merged = Map::new();
        let mut collided = false;
        for clause in &self.clauses {
            let field = merged
                .entry(clause.property.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = field {
                let key = format!("${}", clause.operator.as_str());
                if ops.insert(key, clause.value.clone()).is_some() {
                    collided = true;
                }
            }
        }
        if !collided {
            return Value::Object(merged);
        }
        let parts = self
            .clauses
            .iter()
            .map(|clause| {
                let mut op = Map::new();
                op.insert(format!("${}", clause.operator.as_str()), clause.value.clone());
                let mut doc = Map::new();
                doc.insert(clause.property.clone(), Value::Object(op));
                Value::Object(doc)
            })
            .collect();
        let mut and = Map::new();
        and.insert("$and".to_string(), Value::Array(parts));
        Value::Object(and)
    }
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            clauses: self.clauses.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("clauses", &self.clauses)
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<E> PartialEq for Query<E> {
    fn eq(&self, other: &Self) -> bool {
        self.clauses == other.clauses
            && self.sort == other.sort
            && self.limit == other.limit
            && self.offset == other.offset
    }
}
