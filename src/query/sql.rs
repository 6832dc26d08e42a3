//! SQLite lowering of the predicate IR.
//!
//! Statements are assembled in a [`SqlBuilder`] which numbers every bound
//! parameter (`?1`, `?2`, ...) in the order it is written, so fragments can be
//! composed freely without tracking offsets.

use std::fmt::Write;

use rusqlite::types::Value as SqlValue;

use crate::db::relations::{hierarchy_closure, relation_tables, Direction, Hierarchy};
use crate::query::fields::MetadataField;
use crate::query::predicate::{ColumnRef, Comparison, MediaColumn, Membership, Operand, Predicate};
use crate::query::{Modifier, Operator};

/// Name of the media view in generated statements.
pub const MEDIA_VIEW: &str = "media_view";

#[derive(Debug, Default, Clone)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a numbered placeholder bound to `value`.
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.params.push(value.into());
        let _ = write!(self.sql, "?{}", self.params.len());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }

    /// Append the SQL form of a predicate.
    pub fn predicate(&mut self, predicate: &Predicate) -> &mut Self {
        match predicate {
            Predicate::True => self.push("TRUE"),
            Predicate::False => self.push("FALSE"),
            Predicate::And(children) if children.is_empty() => self.push("TRUE"),
            Predicate::Or(children) if children.is_empty() => self.push("FALSE"),
            Predicate::And(children) => self.group(children, " AND "),
            Predicate::Or(children) => self.group(children, " OR "),
            Predicate::Not(inner) => {
                self.push("NOT (");
                self.predicate(inner);
                self.push(")")
            }
            Predicate::Compare(comparison) => self.comparison(comparison),
            Predicate::Member(membership) => self.membership(membership),
        }
    }

    fn group(&mut self, children: &[Predicate], separator: &str) -> &mut Self {
        self.push("(");
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            self.predicate(child);
        }
        self.push(")")
    }

    fn comparison(&mut self, comparison: &Comparison) -> &mut Self {
        let left = column_expr(comparison.column, comparison.modifier);
        let inverted = comparison.inverted;

        match comparison.operator {
            Operator::Empty => {
                let op = if inverted { "IS NOT NULL" } else { "IS NULL" };
                self.push(&format!("{left} {op}"))
            }
            Operator::Equal => {
                let op = if inverted { "IS DISTINCT FROM" } else { "IS NOT DISTINCT FROM" };
                self.compare(&left, op, comparison.operand.as_ref())
            }
            Operator::LessThan => {
                let op = if inverted { ">=" } else { "<" };
                self.compare(&left, op, comparison.operand.as_ref())
            }
            Operator::LessThanOrEqual => {
                let op = if inverted { ">" } else { "<=" };
                self.compare(&left, op, comparison.operand.as_ref())
            }
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                let text = operand_text(comparison.operand.as_ref());
                let pattern = like_pattern(comparison.operator, &text);
                if inverted {
                    self.push(&format!("({left} NOT LIKE "));
                    self.bind(pattern);
                    self.push(&format!(" ESCAPE '\\' OR {left} IS NULL)"))
                } else {
                    self.push(&format!("{left} LIKE "));
                    self.bind(pattern);
                    self.push(" ESCAPE '\\'")
                }
            }
            Operator::Matches => {
                let pattern = operand_text(comparison.operand.as_ref());
                if inverted {
                    self.push(&format!("({left} NOT REGEXP "));
                    self.bind(pattern);
                    self.push(&format!(" OR {left} IS NULL)"))
                } else {
                    self.push(&format!("{left} REGEXP "));
                    self.bind(pattern)
                }
            }
        }
    }

    fn compare(&mut self, left: &str, op: &str, operand: Option<&Operand>) -> &mut Self {
        self.push(&format!("{left} {op} "));
        self.bind(operand.map_or(SqlValue::Null, operand_value))
    }

    fn membership(&mut self, membership: &Membership) -> &mut Self {
        let tables = relation_tables(membership.relation);
        let source = tables.source_table;
        let keyword = if membership.negated { "NOT IN" } else { "IN" };

        self.push(&format!(
            "{MEDIA_VIEW}.id {keyword} (SELECT {join}.media FROM {join} WHERE {join}.{link} IN (",
            join = tables.join_table,
            link = tables.link_column,
        ));

        let seed = |b: &mut SqlBuilder| {
            b.push(&format!("SELECT {source}.id FROM {source} WHERE {source}.catalog = "));
            b.bind(membership.catalog.clone());
            b.push(" AND ");
            b.predicate(&membership.filter);
        };

        match Hierarchy::from_relation(membership.relation) {
            Some(hierarchy) if membership.recursive => {
                hierarchy_closure(self, hierarchy, Direction::Descendants, seed)
            }
            _ => seed(self),
        }

        self.push("))")
    }
}

fn column_expr(column: ColumnRef, modifier: Option<Modifier>) -> String {
    // Calendar parts of `taken` are read in the zone it was recorded in.
    if column == ColumnRef::Media(MediaColumn::Metadata(MetadataField::Taken))
        && matches!(modifier, Some(Modifier::Year | Modifier::Month))
    {
        let local = format!("local_time({MEDIA_VIEW}.taken, {MEDIA_VIEW}.taken_zone)");
        let part = if modifier == Some(Modifier::Year) { "%Y" } else { "%m" };
        return format!("CAST(strftime('{part}', {local}) AS INTEGER)");
    }

    let column = match column {
        ColumnRef::Media(MediaColumn::Id) => format!("{MEDIA_VIEW}.id"),
        ColumnRef::Media(MediaColumn::Metadata(field)) => {
            format!("{MEDIA_VIEW}.{}", field.column())
        }
        ColumnRef::Entity(relation, field) => {
            format!("{}.{}", relation_tables(relation).source_table, field.column())
        }
    };

    match modifier {
        None => column,
        Some(Modifier::Length) => format!("length({column})"),
        Some(Modifier::Year) => format!("CAST(strftime('%Y', {column}) AS INTEGER)"),
        Some(Modifier::Month) => format!("CAST(strftime('%m', {column}) AS INTEGER)"),
    }
}

fn operand_value(operand: &Operand) -> SqlValue {
    match operand {
        Operand::Text(s) => SqlValue::Text(s.clone()),
        Operand::Integer(n) => SqlValue::Integer(*n),
        Operand::Real(n) => SqlValue::Real(*n),
    }
}

fn operand_text(operand: Option<&Operand>) -> String {
    match operand {
        Some(Operand::Text(s)) => s.clone(),
        Some(Operand::Integer(n)) => n.to_string(),
        Some(Operand::Real(n)) => n.to_string(),
        None => String::new(),
    }
}

/// LIKE pattern matching `text` literally at the position the operator needs.
fn like_pattern(operator: Operator, text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    match operator {
        Operator::StartsWith => format!("{escaped}%"),
        Operator::EndsWith => format!("%{escaped}"),
        _ => format!("%{escaped}%"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fields::EntityField;
    use crate::query::RelationKind;
    use pretty_assertions::assert_eq;

    fn compare(field: MetadataField, operator: Operator, operand: Option<Operand>, inverted: bool) -> Predicate {
        Predicate::Compare(Comparison {
            column: ColumnRef::Media(MediaColumn::Metadata(field)),
            modifier: None,
            operator,
            operand,
            inverted,
        })
    }

    fn lower(predicate: &Predicate) -> (String, Vec<SqlValue>) {
        let mut builder = SqlBuilder::new();
        builder.predicate(predicate);
        builder.into_parts()
    }

    #[test]
    fn test_comparison_operators() {
        let cases = [
            (Operator::Empty, false, "media_view.rating IS NULL"),
            (Operator::Empty, true, "media_view.rating IS NOT NULL"),
            (Operator::Equal, false, "media_view.rating IS NOT DISTINCT FROM ?1"),
            (Operator::Equal, true, "media_view.rating IS DISTINCT FROM ?1"),
            (Operator::LessThan, false, "media_view.rating < ?1"),
            (Operator::LessThan, true, "media_view.rating >= ?1"),
            (Operator::LessThanOrEqual, false, "media_view.rating <= ?1"),
            (Operator::LessThanOrEqual, true, "media_view.rating > ?1"),
        ];

        for (operator, inverted, expected) in cases {
            let operand = (operator != Operator::Empty).then_some(Operand::Integer(3));
            let (sql, _) = lower(&compare(MetadataField::Rating, operator, operand, inverted));
            assert_eq!(sql, expected);
        }
    }

    #[test]
    fn test_pattern_operators() {
        let text = Some(Operand::Text("50%_off".into()));
        let (sql, params) = lower(&compare(MetadataField::Title, Operator::Contains, text.clone(), false));
        assert_eq!(sql, "media_view.title LIKE ?1 ESCAPE '\\'");
        assert_eq!(params, vec![SqlValue::Text("%50\\%\\_off%".into())]);

        let (sql, params) = lower(&compare(MetadataField::Title, Operator::StartsWith, text, true));
        assert_eq!(
            sql,
            "(media_view.title NOT LIKE ?1 ESCAPE '\\' OR media_view.title IS NULL)"
        );
        assert_eq!(params, vec![SqlValue::Text("50\\%\\_off%".into())]);

        let regex = Some(Operand::Text("^a+$".into()));
        let (sql, _) = lower(&compare(MetadataField::Title, Operator::Matches, regex, true));
        assert_eq!(sql, "(media_view.title NOT REGEXP ?1 OR media_view.title IS NULL)");
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(
            column_expr(ColumnRef::Media(MediaColumn::Metadata(MetadataField::Taken)), Some(Modifier::Year)),
            "CAST(strftime('%Y', local_time(media_view.taken, media_view.taken_zone)) AS INTEGER)"
        );
        assert_eq!(
            column_expr(ColumnRef::Media(MediaColumn::Metadata(MetadataField::Taken)), Some(Modifier::Month)),
            "CAST(strftime('%m', local_time(media_view.taken, media_view.taken_zone)) AS INTEGER)"
        );
        assert_eq!(
            column_expr(ColumnRef::Entity(RelationKind::Tag, EntityField::Name), Some(Modifier::Length)),
            "length(tag.name)"
        );
    }

    #[test]
    fn test_groups_and_constants() {
        let a = compare(MetadataField::Rating, Operator::Empty, None, false);
        let b = compare(MetadataField::Iso, Operator::LessThan, Some(Operand::Integer(100)), false);
        let (sql, params) = lower(&Predicate::Or(vec![a.clone(), Predicate::And(vec![a, b]).not()]));
        assert_eq!(
            sql,
            "(media_view.rating IS NULL OR NOT ((media_view.rating IS NULL AND media_view.iso < ?1)))"
        );
        assert_eq!(params, vec![SqlValue::Integer(100)]);

        assert_eq!(lower(&Predicate::And(vec![])).0, "TRUE");
        assert_eq!(lower(&Predicate::Or(vec![])).0, "FALSE");
    }

    #[test]
    fn test_membership() {
        let filter = Predicate::Compare(Comparison {
            column: ColumnRef::Entity(RelationKind::Album, EntityField::Name),
            modifier: None,
            operator: Operator::Equal,
            operand: Some(Operand::Text("Album 1".into())),
            inverted: false,
        });
        let membership = Membership {
            relation: RelationKind::Album,
            catalog: "C:1".into(),
            filter: Box::new(filter),
            recursive: false,
            negated: true,
        };

        let (sql, params) = lower(&Predicate::Member(membership.clone()));
        assert_eq!(
            sql,
            "media_view.id NOT IN (SELECT media_album.media FROM media_album WHERE media_album.album IN (\
             SELECT album.id FROM album WHERE album.catalog = ?1 AND album.name IS NOT DISTINCT FROM ?2))"
        );
        assert_eq!(
            params,
            vec![SqlValue::Text("C:1".into()), SqlValue::Text("Album 1".into())]
        );

        let (sql, _) = lower(&Predicate::Member(Membership {
            recursive: true,
            negated: false,
            ..membership
        }));
        assert!(sql.starts_with(
            "media_view.id IN (SELECT media_album.media FROM media_album WHERE media_album.album IN (\
             WITH RECURSIVE closure(id) AS (SELECT album.id FROM album WHERE album.catalog = ?1"
        ));
        assert!(sql.ends_with("SELECT closure.id FROM closure))"));
    }
}
