//! Structural and type validation of queries.
//!
//! Every query that comes from outside the process, including ones reloaded
//! from saved searches, goes through [`check_query`] before compilation.

use thiserror::Error;

use super::fields::{
    allowed_modifiers, modifier_result, operator_value, EntityField, FieldType, MetadataField,
    ValueType,
};
use super::{FieldQuery, Operator, Query, RelationKind, Value};

/// Nesting depth accepted when no explicit limit is configured.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot query a related table while already inside a related table")]
    NestedRelation,

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("modifier '{modifier}' is not valid for field '{field}'")]
    InvalidModifier { field: String, modifier: &'static str },

    #[error("operator '{operator}' is not valid for field '{field}'")]
    InvalidOperator { field: String, operator: &'static str },

    #[error("operator '{operator}' on field '{field}' does not take a value")]
    UnexpectedValue { field: String, operator: &'static str },

    #[error("field '{field}' expects a {expected} value but got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("relation '{relation}' is not hierarchical and cannot be searched recursively")]
    NotHierarchical { relation: &'static str },

    #[error("query is nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// A query field resolved against the table it is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedField {
    Metadata(MetadataField),
    Entity(EntityField),
}

impl ResolvedField {
    pub(crate) fn field_type(&self) -> FieldType {
        match self {
            ResolvedField::Metadata(f) => f.field_type(),
            ResolvedField::Entity(f) => f.field_type(),
        }
    }
}

pub(crate) fn resolve_field(field: &str, in_related: bool) -> Result<ResolvedField, ValidationError> {
    let resolved = if in_related {
        EntityField::from_name(field).map(ResolvedField::Entity)
    } else {
        MetadataField::from_name(field).map(ResolvedField::Metadata)
    };

    resolved.ok_or_else(|| ValidationError::UnknownField {
        field: field.to_string(),
    })
}

/// Type of the field after its modifier has been applied.
pub(crate) fn effective_type(
    query: &FieldQuery,
    field: ResolvedField,
) -> Result<FieldType, ValidationError> {
    let base = field.field_type();
    match query.modifier {
        Some(modifier) => {
            if !allowed_modifiers(base).contains(&modifier) {
                return Err(ValidationError::InvalidModifier {
                    field: query.field.clone(),
                    modifier: modifier.as_str(),
                });
            }
            Ok(modifier_result(modifier))
        }
        None => Ok(base),
    }
}

/// Validate a query tree. `in_related` is true when the query is evaluated
/// inside a relation scope.
pub fn check_query(query: &Query, in_related: bool) -> Result<(), ValidationError> {
    check_query_with_depth(query, in_related, DEFAULT_MAX_DEPTH)
}

pub fn check_query_with_depth(
    query: &Query,
    in_related: bool,
    max_depth: usize,
) -> Result<(), ValidationError> {
    check_node(query, in_related, 1, max_depth)
}

fn check_node(
    query: &Query,
    in_related: bool,
    depth: usize,
    max_depth: usize,
) -> Result<(), ValidationError> {
    if depth > max_depth {
        return Err(ValidationError::TooDeep { limit: max_depth });
    }

    match query {
        Query::Compound(compound) => {
            if let Some(relation) = compound.relation {
                if in_related {
                    return Err(ValidationError::NestedRelation);
                }
                if compound.recursive && relation == RelationKind::Person {
                    return Err(ValidationError::NotHierarchical {
                        relation: relation.as_str(),
                    });
                }
            }

            let child_related = in_related || compound.relation.is_some();
            for child in &compound.queries {
                check_node(child, child_related, depth + 1, max_depth)?;
            }
            Ok(())
        }
        Query::Field(field) => check_field(field, in_related),
    }
}

fn check_field(query: &FieldQuery, in_related: bool) -> Result<(), ValidationError> {
    let field = resolve_field(&query.field, in_related)?;
    let field_type = effective_type(query, field)?;

    let expected = operator_value(field_type, query.operator).ok_or_else(|| {
        ValidationError::InvalidOperator {
            field: query.field.clone(),
            operator: query.operator.as_str(),
        }
    })?;

    match (expected, &query.value) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(ValidationError::UnexpectedValue {
            field: query.field.clone(),
            operator: query.operator.as_str(),
        }),
        (Some(expected), value) => check_value(query, expected, value.as_ref()),
    }
}

fn check_value(
    query: &FieldQuery,
    expected: ValueType,
    value: Option<&Value>,
) -> Result<(), ValidationError> {
    let matches = match (expected, value) {
        (_, None) => false,
        (ValueType::String, Some(v)) => v.as_str().is_some(),
        (ValueType::Number, Some(v)) => v.as_number().is_some(),
        (ValueType::Date, Some(v)) => v.as_date().is_some(),
    };

    if !matches {
        return Err(ValidationError::TypeMismatch {
            field: query.field.clone(),
            expected: expected.as_str(),
            found: value.map_or("null", Value::type_name),
        });
    }

    if query.operator == Operator::Matches {
        if let Some(pattern) = value.and_then(Value::as_str) {
            regex::Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern {
                field: query.field.clone(),
                source,
            })?;
        }
    }

    Ok(())
}
