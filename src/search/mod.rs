//! Search execution: authorization, validation, compilation and execution of
//! queries against a catalog's media view.

use serde::Serialize;

use crate::db::{Authorizer, Database, MediaViewRow};
use crate::error::{Result, SearchError};
use crate::query::predicate::Predicate;
use crate::query::{
    check_query_with_depth, compile, CompoundQuery, FieldQuery, Operator, Query, RelationKind, Scope,
    Search, DEFAULT_MAX_DEPTH,
};

/// Results of a shared search.
#[derive(Debug, Clone, Serialize)]
pub struct SharedResults {
    pub name: String,
    pub media: Vec<MediaViewRow>,
}

pub struct SearchService<'a> {
    db: &'a Database,
    authorizer: &'a dyn Authorizer,
    max_depth: usize,
}

impl<'a> SearchService<'a> {
    /// A service that authorizes callers against the database's own grants.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            authorizer: db,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_authorizer(mut self, authorizer: &'a dyn Authorizer) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn require_read(&self, caller: &str, catalog: &str) -> Result<()> {
        let access = self.authorizer.authorize(caller, catalog)?;
        if !access.can_read() {
            tracing::warn!(caller, catalog, "Catalog access denied");
            return Err(SearchError::NotAuthorized {
                catalog: catalog.to_string(),
            });
        }
        Ok(())
    }

    /// Validate a query and compile it into a normalized predicate over the
    /// catalog's media view.
    pub fn prepare(&self, query: &Query, catalog: &str) -> Result<Predicate> {
        check_query_with_depth(query, false, self.max_depth)?;
        let predicate = compile(query, catalog, Scope::Media)?;
        Ok(predicate.normalize())
    }

    fn execute(&self, db: &Database, catalog: &str, query: &Query) -> Result<Vec<MediaViewRow>> {
        let predicate = self.prepare(query, catalog)?;
        let media = db.query_media(catalog, &predicate)?;
        tracing::info!(catalog, results = media.len(), "Search complete");
        Ok(media)
    }

    /// Ad-hoc search of one catalog.
    pub fn search(&self, caller: &str, catalog: &str, query: &Query) -> Result<Vec<MediaViewRow>> {
        self.require_read(caller, catalog)?;
        self.execute(self.db, catalog, query)
    }

    pub fn run(&self, caller: &str, search: &Search) -> Result<Vec<MediaViewRow>> {
        self.search(caller, &search.catalog, &search.query)
    }

    /// Results of a shared saved search. Loading the definition and running
    /// it happen in one transaction.
    pub fn shared_search(&self, id: &str) -> Result<SharedResults> {
        self.db.in_transaction(|db| {
            let search = db.shared_search_definition(id)?;
            let media = self
                .execute(db, &search.catalog, &search.query)
                .inspect_err(|e| {
                    if let SearchError::Validation(error) = e {
                        tracing::warn!(search = id, %error, "Stored search is no longer valid");
                    }
                })?;
            Ok(SharedResults {
                name: search.name,
                media,
            })
        })
    }

    /// Media in an album, optionally including its sub-albums.
    pub fn list_album(&self, caller: &str, album: &str, recursive: bool) -> Result<Vec<MediaViewRow>> {
        let catalog = self
            .db
            .album_catalog(album)?
            .ok_or_else(|| SearchError::not_found("album", album))?;
        self.require_read(caller, &catalog)?;

        let query: Query = CompoundQuery::related(
            RelationKind::Album,
            recursive,
            vec![FieldQuery::new("id", Operator::Equal, Some(album.into())).into()],
        )
        .into();
        self.execute(self.db, &catalog, &query)
    }

    pub fn list_catalog(&self, caller: &str, catalog: &str) -> Result<Vec<MediaViewRow>> {
        self.require_read(caller, catalog)?;
        self.execute(self.db, catalog, &Query::all())
    }
}
