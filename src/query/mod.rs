//! Declarative media queries.
//!
//! A [`Query`] is a boolean tree of field predicates and compound groups. A
//! compound group may re-base its children onto a related entity (album, tag
//! or person), optionally expanded over the album/tag hierarchy. Queries are
//! persisted as JSON in saved searches and shared links, so the serialized
//! field names below are a stable contract.

pub mod compile;
pub mod fields;
pub mod predicate;
pub mod sql;
pub mod validate;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub use compile::{compile, Scope};
pub use fields::{EntityField, FieldType, MetadataField, ValueType};
pub use predicate::Predicate;
pub use validate::{check_query, check_query_with_depth, ValidationError, DEFAULT_MAX_DEPTH};

/// How the children of a compound query are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Join {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

/// A transform applied to a field before its operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Length,
    Year,
    Month,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Length => "length",
            Modifier::Year => "year",
            Modifier::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startswith")]
    StartsWith,
    #[serde(rename = "endswith")]
    EndsWith,
    #[serde(rename = "matches")]
    Matches,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Empty => "empty",
            Operator::Equal => "=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Matches => "matches",
        }
    }

    /// Pattern operators are not NULL-safe: their inversion needs an
    /// explicit `IS NULL` escape.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Matches
        )
    }
}

/// The related entity kinds a compound query can scope into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Album,
    Tag,
    Person,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Album => "album",
            RelationKind::Tag => "tag",
            RelationKind::Person => "person",
        }
    }
}

/// A literal query value as it appears on the wire.
///
/// Dates travel as RFC 3339 strings; whether a string is acceptable as a date
/// is decided by [`Value::as_date`], not by its JSON shape. Arrays and
/// objects parse as [`Value::Other`] so the validator can reject them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Other(serde_json::Value),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&serde_json::Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<FixedOffset>> {
        self.as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    /// Name of the runtime type, used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) if self.as_date().is_some() => "date",
            Value::String(_) => "string",
            Value::Other(serde_json::Value::Array(_)) => "array",
            Value::Other(serde_json::Value::Object(_)) => "object",
            Value::Other(_) => "null",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::String(dt.to_rfc3339())
    }
}

/// A predicate on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldQuery {
    pub field: String,
    #[serde(default)]
    pub modifier: Option<Modifier>,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub invert: bool,
}

impl FieldQuery {
    pub fn new(field: &str, operator: Operator, value: Option<Value>) -> Self {
        Self {
            field: field.to_string(),
            modifier: None,
            operator,
            value,
            invert: false,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }
}

/// A group of queries joined with AND/OR, optionally scoped into a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundQuery {
    pub join: Join,
    #[serde(default)]
    pub invert: bool,
    pub queries: Vec<Query>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationKind>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
}

impl CompoundQuery {
    pub fn new(join: Join, queries: Vec<Query>) -> Self {
        Self {
            join,
            invert: false,
            queries,
            relation: None,
            recursive: false,
        }
    }

    pub fn related(relation: RelationKind, recursive: bool, queries: Vec<Query>) -> Self {
        Self {
            join: Join::And,
            invert: false,
            queries,
            relation: Some(relation),
            recursive,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Query {
    Field(FieldQuery),
    Compound(CompoundQuery),
}

impl Query {
    /// The query that matches every media item.
    pub fn all() -> Self {
        Query::Compound(CompoundQuery::new(Join::And, Vec::new()))
    }

    pub fn is_inverted(&self) -> bool {
        match self {
            Query::Field(f) => f.invert,
            Query::Compound(c) => c.invert,
        }
    }

    /// Flip the node's own invert flag.
    pub fn inverted(self) -> Self {
        match self {
            Query::Field(f) => Query::Field(f.inverted()),
            Query::Compound(c) => Query::Compound(c.inverted()),
        }
    }
}

impl From<FieldQuery> for Query {
    fn from(q: FieldQuery) -> Self {
        Query::Field(q)
    }
}

impl From<CompoundQuery> for Query {
    fn from(q: CompoundQuery) -> Self {
        Query::Compound(q)
    }
}

/// A query bound to the catalog it searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Search {
    pub catalog: String,
    #[serde(flatten)]
    pub query: Query,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_query_wire_format() {
        let json = r#"{"type":"field","field":"rating","modifier":null,"operator":"=","value":5,"invert":false}"#;
        let query: Query = serde_json::from_str(json).unwrap();
        assert_eq!(
            query,
            Query::Field(FieldQuery::new("rating", Operator::Equal, Some(Value::from(5))))
        );
        assert_eq!(serde_json::to_string(&query).unwrap(), json);
    }

    #[test]
    fn test_compound_query_wire_format() {
        let json = r#"{
            "type": "compound",
            "join": "||",
            "invert": true,
            "relation": "album",
            "recursive": true,
            "queries": [
                {"type":"field","field":"name","modifier":null,"operator":"startswith","value":"Hol","invert":false}
            ]
        }"#;
        let query: Query = serde_json::from_str(json).unwrap();
        let Query::Compound(compound) = &query else {
            panic!("expected a compound query");
        };
        assert_eq!(compound.join, Join::Or);
        assert!(compound.invert);
        assert!(compound.recursive);
        assert_eq!(compound.relation, Some(RelationKind::Album));
        assert_eq!(compound.queries.len(), 1);
    }

    #[test]
    fn test_missing_value_and_invert_default() {
        let json = r#"{"type":"field","field":"title","operator":"empty"}"#;
        let query: Query = serde_json::from_str(json).unwrap();
        assert_eq!(query, Query::Field(FieldQuery::new("title", Operator::Empty, None)));
    }

    #[test]
    fn test_search_flattens_query() {
        let json = r#"{"catalog":"C:1","type":"compound","join":"&&","invert":false,"queries":[]}"#;
        let search: Search = serde_json::from_str(json).unwrap();
        assert_eq!(search.catalog, "C:1");
        assert_eq!(search.query, Query::all());
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::from("hello").type_name(), "string");
        assert_eq!(Value::from("2020-01-02T03:04:05Z").type_name(), "date");
        assert_eq!(Value::from(3).type_name(), "number");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
    }

    #[test]
    fn test_structured_value_parses_as_other() {
        let json = r#"{"type":"field","field":"title","operator":"=","value":["a","b"]}"#;
        let Query::Field(field) = serde_json::from_str(json).unwrap() else {
            panic!("expected a field query");
        };
        assert_eq!(field.value.as_ref().map(Value::type_name), Some("array"));

        let json = r#"{"type":"field","field":"title","operator":"=","value":{"a":1}}"#;
        let Query::Field(field) = serde_json::from_str(json).unwrap() else {
            panic!("expected a field query");
        };
        assert_eq!(field.value.as_ref().map(Value::type_name), Some("object"));
    }
}
