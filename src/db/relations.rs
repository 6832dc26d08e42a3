//! Relations between media and albums, tags and people.
//!
//! The same static table drives the search compiler (read path) and the
//! link mutations below (write path).

use rusqlite::{params, params_from_iter, OptionalExtension, Result};

use super::albums::Location;
use super::Database;
use crate::query::sql::SqlBuilder;
use crate::query::RelationKind;

/// Where a relation kind is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationTables {
    /// Link table between media and the entity.
    pub join_table: &'static str,
    /// Table holding the entities themselves.
    pub source_table: &'static str,
    /// Column of `join_table` referencing `source_table`.
    pub link_column: &'static str,
}

pub fn relation_tables(kind: RelationKind) -> RelationTables {
    match kind {
        RelationKind::Album => RelationTables {
            join_table: "media_album",
            source_table: "album",
            link_column: "album",
        },
        RelationKind::Tag => RelationTables {
            join_table: "media_tag",
            source_table: "tag",
            link_column: "tag",
        },
        RelationKind::Person => RelationTables {
            join_table: "media_person",
            source_table: "person",
            link_column: "person",
        },
    }
}

/// Entity kinds whose rows form a parent/child hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hierarchy {
    Album,
    Tag,
}

impl Hierarchy {
    pub fn from_relation(kind: RelationKind) -> Option<Self> {
        match kind {
            RelationKind::Album => Some(Hierarchy::Album),
            RelationKind::Tag => Some(Hierarchy::Tag),
            RelationKind::Person => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Hierarchy::Album => "album",
            Hierarchy::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The seed rows and everything below them.
    Descendants,
    /// The seed rows and everything above them.
    Ancestors,
}

/// Write a statement selecting the ids in the transitive closure of the seed
/// rows. `seed` must write a `SELECT` of a single id column.
///
/// `UNION` (not `UNION ALL`) keeps the recursion finite even if the parent
/// links ever form a cycle.
pub fn hierarchy_closure(
    builder: &mut SqlBuilder,
    hierarchy: Hierarchy,
    direction: Direction,
    seed: impl FnOnce(&mut SqlBuilder),
) {
    let table = hierarchy.table();

    builder.push("WITH RECURSIVE closure(id) AS (");
    seed(builder);
    builder.push(" UNION ");
    match direction {
        Direction::Descendants => builder.push(&format!(
            "SELECT child.id FROM {table} AS child JOIN closure ON child.parent = closure.id"
        )),
        Direction::Ancestors => builder.push(&format!(
            "SELECT node.parent FROM {table} AS node JOIN closure ON node.id = closure.id \
             WHERE node.parent IS NOT NULL"
        )),
    };
    builder.push(") SELECT closure.id FROM closure");
}

impl Database {
    /// Ids of `id` and all its ancestors or descendants.
    pub fn hierarchy_ids(
        &self,
        hierarchy: Hierarchy,
        id: &str,
        direction: Direction,
    ) -> Result<Vec<String>> {
        let mut builder = SqlBuilder::new();
        hierarchy_closure(&mut builder, hierarchy, direction, |b| {
            b.push(&format!("SELECT id FROM {} WHERE id = ", hierarchy.table()));
            b.bind(id.to_string());
        });

        let (sql, values) = builder.into_parts();
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Link every media item to every entity. Existing links are kept.
    pub fn add_relations(
        &self,
        kind: RelationKind,
        catalog: &str,
        media: &[&str],
        entities: &[&str],
    ) -> Result<()> {
        let tables = relation_tables(kind);
        let sql = format!(
            "INSERT OR IGNORE INTO {} (catalog, media, {}) VALUES (?, ?, ?)",
            tables.join_table, tables.link_column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for media_id in media {
            for entity in entities {
                stmt.execute(params![catalog, media_id, entity])?;
            }
        }
        Ok(())
    }

    pub fn remove_relations(&self, kind: RelationKind, media: &[&str], entities: &[&str]) -> Result<()> {
        let tables = relation_tables(kind);
        let sql = format!(
            "DELETE FROM {} WHERE media = ? AND {} = ?",
            tables.join_table, tables.link_column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for media_id in media {
            for entity in entities {
                stmt.execute(params![media_id, entity])?;
            }
        }
        Ok(())
    }

    /// Replace the entities a single media item is linked to.
    pub fn set_relations(
        &self,
        kind: RelationKind,
        catalog: &str,
        media: &str,
        entities: &[&str],
    ) -> Result<()> {
        let tables = relation_tables(kind);
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM {} WHERE media = ?", tables.join_table),
            [media],
        )?;
        self.add_relations(kind, catalog, &[media], entities)?;
        tx.commit()
    }

    /// Record where a person appears in a media item.
    pub fn set_person_location(
        &self,
        media: &str,
        person: &str,
        location: Option<&Location>,
    ) -> Result<bool> {
        let location = location
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let updated = self.conn.execute(
            "UPDATE media_person SET location = ? WHERE media = ? AND person = ?",
            params![location, media, person],
        )?;
        Ok(updated > 0)
    }

    /// Entity ids a media item is linked to.
    pub fn related_ids(&self, kind: RelationKind, media: &str) -> Result<Vec<String>> {
        let tables = relation_tables(kind);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {link} FROM {join} WHERE media = ? ORDER BY {link}",
            link = tables.link_column,
            join = tables.join_table,
        ))?;
        let ids = stmt
            .query_map([media], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(ids)
    }

    pub fn entity_catalog(&self, kind: RelationKind, id: &str) -> Result<Option<String>> {
        let tables = relation_tables(kind);
        self.conn
            .query_row(
                &format!("SELECT catalog FROM {} WHERE id = ?", tables.source_table),
                [id],
                |row| row.get(0),
            )
            .optional()
    }
}
