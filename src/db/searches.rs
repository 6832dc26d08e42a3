//! Saved searches.
//!
//! A saved search stores its query as JSON. Stored queries may predate the
//! current field set, so they are parsed and validated again whenever they
//! are loaded for execution.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{new_id, Database};
use crate::error::{Result, SearchError};
use crate::query::Query;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSearch {
    pub id: String,
    pub catalog: String,
    pub name: String,
    pub shared: bool,
    pub query: Query,
}

struct StoredSearch {
    id: String,
    catalog: String,
    name: String,
    shared: bool,
    query: String,
}

impl StoredSearch {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(StoredSearch {
            id: row.get(0)?,
            catalog: row.get(1)?,
            name: row.get(2)?,
            shared: row.get(3)?,
            query: row.get(4)?,
        })
    }

    fn parse(self) -> Result<SavedSearch> {
        let query = serde_json::from_str(&self.query)?;
        Ok(SavedSearch {
            id: self.id,
            catalog: self.catalog,
            name: self.name,
            shared: self.shared,
            query,
        })
    }
}

impl Database {
    pub fn create_saved_search(
        &self,
        catalog: &str,
        name: &str,
        query: &Query,
        shared: bool,
    ) -> Result<SavedSearch> {
        let id = new_id("S");
        self.conn.execute(
            "INSERT INTO saved_search (id, catalog, name, shared, query) VALUES (?, ?, ?, ?, ?)",
            params![id, catalog, name, shared, serde_json::to_string(query)?],
        )?;

        Ok(SavedSearch {
            id,
            catalog: catalog.to_string(),
            name: name.to_string(),
            shared,
            query: query.clone(),
        })
    }

    /// Returns false if the search doesn't exist.
    pub fn update_saved_search(&self, id: &str, name: &str, query: &Query, shared: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE saved_search SET name = ?, shared = ?, query = ? WHERE id = ?",
            params![name, shared, serde_json::to_string(query)?, id],
        )?;
        Ok(updated > 0)
    }

    pub fn delete_saved_search(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM saved_search WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    pub fn get_saved_search(&self, id: &str) -> Result<Option<SavedSearch>> {
        self.conn
            .query_row(
                "SELECT id, catalog, name, shared, query FROM saved_search WHERE id = ?",
                [id],
                StoredSearch::from_row,
            )
            .optional()?
            .map(StoredSearch::parse)
            .transpose()
    }

    pub fn list_saved_searches(&self, catalog: &str) -> Result<Vec<SavedSearch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, catalog, name, shared, query FROM saved_search WHERE catalog = ? ORDER BY name, id",
        )?;
        let stored = stmt
            .query_map([catalog], StoredSearch::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        stored.into_iter().map(StoredSearch::parse).collect()
    }

    /// Load a shared search. Unshared searches are reported as not found.
    ///
    /// Callers that go on to execute the search should do both inside
    /// [`Database::in_transaction`].
    pub fn shared_search_definition(&self, id: &str) -> Result<SavedSearch> {
        let stored = self
            .conn
            .query_row(
                "SELECT id, catalog, name, shared, query FROM saved_search WHERE id = ? AND shared = 1",
                [id],
                StoredSearch::from_row,
            )
            .optional()?
            .ok_or_else(|| SearchError::not_found("search", id))?;
        stored.parse()
    }
}
