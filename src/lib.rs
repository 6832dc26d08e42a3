//! Media catalog search.
//!
//! Queries are JSON trees of field predicates and compound groups, optionally
//! scoped into related albums, tags or people. They are validated, compiled
//! into a [`query::Predicate`] and lowered to SQL over the media view, which
//! merges each media item's overrides with its current processed file.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::Database;
pub use error::SearchError;
pub use search::{SearchService, SharedResults};
