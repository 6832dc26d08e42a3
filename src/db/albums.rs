//! Albums, tags and people: the entities media can be related to.

use rusqlite::{params, OptionalExtension, Result};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use super::relations::{Direction, Hierarchy};
use super::{new_id, Database};
use crate::query::RelationKind;

/// An album (hierarchical collection of media)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub catalog: String,
    pub parent: Option<String>,
    pub name: String,
}

/// A tag (hierarchical label)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub catalog: String,
    pub parent: Option<String>,
    pub name: String,
}

/// A named person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub catalog: String,
    pub name: String,
}

/// Rectangle within a media item, as fractions of its width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// A person appearing in a media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonLocation {
    #[serde(flatten)]
    pub person: Person,
    pub location: Option<Location>,
}

impl Database {
    pub fn create_album(&self, catalog: &str, name: &str, parent: Option<&str>) -> Result<Album> {
        let id = new_id("A");
        self.conn.execute(
            "INSERT INTO album (id, catalog, parent, name) VALUES (?, ?, ?, ?)",
            params![id, catalog, parent, name],
        )?;
        Ok(Album {
            id,
            catalog: catalog.to_string(),
            parent: parent.map(str::to_string),
            name: name.to_string(),
        })
    }

    pub fn get_album(&self, id: &str) -> Result<Option<Album>> {
        self.conn
            .query_row(
                "SELECT id, catalog, parent, name FROM album WHERE id = ?",
                [id],
                |row| {
                    Ok(Album {
                        id: row.get(0)?,
                        catalog: row.get(1)?,
                        parent: row.get(2)?,
                        name: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    pub fn album_catalog(&self, id: &str) -> Result<Option<String>> {
        self.entity_catalog(RelationKind::Album, id)
    }

    /// Path from the root of the hierarchy down to `id` (inclusive).
    /// Empty if `id` doesn't exist.
    pub fn ancestors(&self, hierarchy: Hierarchy, id: &str) -> Result<Vec<String>> {
        let ids = self.hierarchy_ids(hierarchy, id, Direction::Ancestors)?;

        let mut parents: HashMap<String, Option<String>> = HashMap::new();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, parent FROM {} WHERE id = ?",
            hierarchy.table()
        ))?;
        for node in &ids {
            let parent = stmt.query_row([node], |row| row.get::<_, Option<String>>(1))?;
            parents.insert(node.clone(), parent);
        }

        let mut path = Vec::new();
        let mut current = parents.contains_key(id).then(|| id.to_string());
        while let Some(node) = current {
            // Guard against parent cycles.
            if path.contains(&node) {
                break;
            }
            current = parents.get(&node).cloned().flatten();
            path.push(node);
        }
        path.reverse();
        Ok(path)
    }

    pub fn create_tag(&self, catalog: &str, name: &str, parent: Option<&str>) -> Result<Tag> {
        let id = new_id("T");
        self.conn.execute(
            "INSERT INTO tag (id, catalog, parent, name) VALUES (?, ?, ?, ?)",
            params![id, catalog, parent, name],
        )?;
        Ok(Tag {
            id,
            catalog: catalog.to_string(),
            parent: parent.map(str::to_string),
            name: name.to_string(),
        })
    }

    pub fn create_person(&self, catalog: &str, name: &str) -> Result<Person> {
        let id = new_id("P");
        self.conn.execute(
            "INSERT INTO person (id, catalog, name) VALUES (?, ?, ?)",
            params![id, catalog, name],
        )?;
        Ok(Person {
            id,
            catalog: catalog.to_string(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[test]
    fn test_get_album() {
        let f = Fixture::new();
        let album = f.db.get_album(&f.album2).unwrap().unwrap();
        assert_eq!(album.name, "Album 2");
        assert_eq!(album.parent.as_deref(), Some(f.album1.as_str()));
        assert!(f.db.get_album("A:missing").unwrap().is_none());
    }

    #[test]
    fn test_ancestors_are_ordered_from_root() {
        let f = Fixture::new();
        assert_eq!(
            f.db.ancestors(Hierarchy::Album, &f.album3).unwrap(),
            vec![f.album1.clone(), f.album2.clone(), f.album3.clone()]
        );
        assert_eq!(f.db.ancestors(Hierarchy::Tag, &f.tag2).unwrap(), vec![f.tag1.clone(), f.tag2.clone()]);
        assert!(f.db.ancestors(Hierarchy::Album, "A:missing").unwrap().is_empty());
        assert_eq!(f.db.album_catalog(&f.album4).unwrap(), Some(f.catalog.clone()));
    }

    #[test]
    fn test_person_location_json() {
        let json = r#"{"id":"P:1","catalog":"C:1","name":"Dave","location":{"left":0.1,"right":0.4,"top":0.2,"bottom":0.6}}"#;
        let parsed: PersonLocation = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.person.name, "Dave");
        assert_eq!(parsed.location.map(|l| l.right), Some(0.4));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }
}
