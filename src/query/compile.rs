//! Lowering of validated queries into the predicate IR.

use chrono::Utc;

use crate::db::format_timestamp;
use crate::query::fields::MetadataField;
use crate::query::predicate::{ColumnRef, Comparison, MediaColumn, Membership, Operand, Predicate};
use crate::query::validate::{effective_type, resolve_field, ResolvedField, ValidationError};
use crate::query::{CompoundQuery, FieldQuery, Join, Query, RelationKind, Value};

/// The table a query node is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The media view of one catalog.
    Media,
    /// The source table of a related entity.
    Related(RelationKind),
}

impl Scope {
    fn in_related(&self) -> bool {
        matches!(self, Scope::Related(_))
    }
}

/// Compile a query into a predicate over `scope`, restricted to `catalog`.
///
/// The query should already have passed [`check_query`](super::check_query);
/// anything that would have failed validation is still reported as an error
/// rather than compiled.
pub fn compile(query: &Query, catalog: &str, scope: Scope) -> Result<Predicate, ValidationError> {
    match query {
        Query::Field(field) => compile_field(field, scope),
        Query::Compound(compound) => match compound.relation {
            Some(relation) => compile_relation(compound, relation, catalog, scope),
            None => compile_group(compound, catalog, scope),
        },
    }
}

fn join(join: Join, children: Vec<Predicate>) -> Predicate {
    match join {
        Join::And => Predicate::And(children),
        Join::Or => Predicate::Or(children),
    }
}

fn compile_children(
    compound: &CompoundQuery,
    catalog: &str,
    scope: Scope,
) -> Result<Predicate, ValidationError> {
    let children = compound
        .queries
        .iter()
        .map(|q| compile(q, catalog, scope))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(join(compound.join, children))
}

fn compile_group(
    compound: &CompoundQuery,
    catalog: &str,
    scope: Scope,
) -> Result<Predicate, ValidationError> {
    let group = compile_children(compound, catalog, scope)?;
    Ok(if compound.invert { group.not() } else { group })
}

fn compile_relation(
    compound: &CompoundQuery,
    relation: RelationKind,
    catalog: &str,
    scope: Scope,
) -> Result<Predicate, ValidationError> {
    if scope.in_related() {
        return Err(ValidationError::NestedRelation);
    }

    let filter = compile_children(compound, catalog, Scope::Related(relation))?;
    Ok(Predicate::Member(Membership {
        relation,
        catalog: catalog.to_string(),
        filter: Box::new(filter),
        recursive: compound.recursive,
        negated: compound.invert,
    }))
}

fn compile_field(query: &FieldQuery, scope: Scope) -> Result<Predicate, ValidationError> {
    let field = resolve_field(&query.field, scope.in_related())?;
    effective_type(query, field)?;

    let column = match (field, scope) {
        (ResolvedField::Metadata(f), _) => ColumnRef::Media(MediaColumn::Metadata(f)),
        (ResolvedField::Entity(f), Scope::Related(relation)) => ColumnRef::Entity(relation, f),
        (ResolvedField::Entity(_), Scope::Media) => {
            return Err(ValidationError::UnknownField {
                field: query.field.clone(),
            })
        }
    };

    let operand = match &query.value {
        Some(value) => Some(operand(query, column, value)?),
        None => None,
    };

    Ok(Predicate::Compare(Comparison {
        column,
        modifier: query.modifier,
        operator: query.operator,
        operand,
        inverted: query.invert,
    }))
}

fn operand(query: &FieldQuery, column: ColumnRef, value: &Value) -> Result<Operand, ValidationError> {
    let mismatch = |expected| ValidationError::TypeMismatch {
        field: query.field.clone(),
        expected,
        found: value.type_name(),
    };

    let is_taken = column == ColumnRef::Media(MediaColumn::Metadata(MetadataField::Taken));
    match value {
        // Dates compare as instants: the query's own offset is dropped.
        Value::String(_) if is_taken && query.modifier.is_none() => value
            .as_date()
            .map(|dt| Operand::Text(format_timestamp(&dt.with_timezone(&Utc))))
            .ok_or_else(|| mismatch("date")),
        Value::String(s) => Ok(Operand::Text(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(Operand::Integer)
            .or_else(|| n.as_f64().map(Operand::Real))
            .ok_or_else(|| mismatch("number")),
        Value::Bool(_) | Value::Other(_) => Err(mismatch("string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fields::EntityField;
    use crate::query::{Modifier, Operator};
    use pretty_assertions::assert_eq;

    fn field(name: &str, operator: Operator, value: Option<Value>) -> Query {
        Query::Field(FieldQuery::new(name, operator, value))
    }

    fn rating_equal(n: i64, inverted: bool) -> Predicate {
        Predicate::Compare(Comparison {
            column: ColumnRef::Media(MediaColumn::Metadata(MetadataField::Rating)),
            modifier: None,
            operator: Operator::Equal,
            operand: Some(Operand::Integer(n)),
            inverted,
        })
    }

    #[test]
    fn test_field_compiles_to_comparison() {
        let query = field("rating", Operator::Equal, Some(5.into())).inverted();
        assert_eq!(compile(&query, "C:1", Scope::Media).unwrap(), rating_equal(5, true));
    }

    #[test]
    fn test_taken_is_normalized_to_utc() {
        let query = field("taken", Operator::LessThan, Some("2020-06-01T12:00:00+02:00".into()));
        let Predicate::Compare(c) = compile(&query, "C:1", Scope::Media).unwrap() else {
            panic!("expected a comparison");
        };
        assert_eq!(c.operand, Some(Operand::Text("2020-06-01T10:00:00.000Z".into())));
    }

    #[test]
    fn test_modified_taken_keeps_number() {
        let query = Query::Field(
            FieldQuery::new("taken", Operator::Equal, Some(6.into())).with_modifier(Modifier::Month),
        );
        let Predicate::Compare(c) = compile(&query, "C:1", Scope::Media).unwrap() else {
            panic!("expected a comparison");
        };
        assert_eq!(c.modifier, Some(Modifier::Month));
        assert_eq!(c.operand, Some(Operand::Integer(6)));
    }

    #[test]
    fn test_inverted_group_wraps_not() {
        let query: Query = CompoundQuery::new(
            Join::Or,
            vec![
                field("rating", Operator::Equal, Some(1.into())),
                field("rating", Operator::Equal, Some(2.into())),
            ],
        )
        .inverted()
        .into();

        assert_eq!(
            compile(&query, "C:1", Scope::Media).unwrap(),
            Predicate::Or(vec![rating_equal(1, false), rating_equal(2, false)]).not()
        );
    }

    #[test]
    fn test_empty_groups() {
        let and: Query = CompoundQuery::new(Join::And, vec![]).into();
        let or: Query = CompoundQuery::new(Join::Or, vec![]).into();
        assert_eq!(compile(&and, "C:1", Scope::Media).unwrap(), Predicate::And(vec![]));
        assert_eq!(compile(&or, "C:1", Scope::Media).unwrap(), Predicate::Or(vec![]));
    }

    #[test]
    fn test_relation_compiles_to_membership() {
        let query: Query = CompoundQuery::related(
            RelationKind::Album,
            true,
            vec![field("name", Operator::Equal, Some("Album 1".into()))],
        )
        .inverted()
        .into();

        let compiled = compile(&query, "C:1", Scope::Media).unwrap();
        assert_eq!(
            compiled,
            Predicate::Member(Membership {
                relation: RelationKind::Album,
                catalog: "C:1".into(),
                filter: Box::new(Predicate::And(vec![Predicate::Compare(Comparison {
                    column: ColumnRef::Entity(RelationKind::Album, EntityField::Name),
                    modifier: None,
                    operator: Operator::Equal,
                    operand: Some(Operand::Text("Album 1".into())),
                    inverted: false,
                })])),
                recursive: true,
                negated: true,
            })
        );
    }

    #[test]
    fn test_nested_relation_is_rejected() {
        let inner: Query = CompoundQuery::related(RelationKind::Tag, false, vec![]).into();
        let outer: Query = CompoundQuery::related(RelationKind::Album, false, vec![inner]).into();
        assert!(matches!(
            compile(&outer, "C:1", Scope::Media),
            Err(ValidationError::NestedRelation)
        ));
    }
}
