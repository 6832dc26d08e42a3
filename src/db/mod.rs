mod schema;
pub mod albums;
pub mod media;
pub mod relations;
pub mod searches;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Result};

pub use albums::{Album, Location, Person, PersonLocation, Tag};
pub use media::{FileInfo, MediaViewRow, Metadata, NewFile};
pub use relations::{Direction, Hierarchy};
pub use schema::SCHEMA;
pub use searches::SavedSearch;

/// Level of access a caller has to a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Denied,
    Read,
    Write,
}

impl Access {
    pub fn can_read(&self) -> bool {
        matches!(self, Access::Read | Access::Write)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Access::Write)
    }
}

/// Per-call authorization check used by the search service.
pub trait Authorizer {
    fn authorize(&self, caller: &str, catalog: &str) -> Result<Access>;
}

/// Format a timestamp the way it is stored: UTC, millisecond precision, so
/// that text order is chronological order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Generate a new id with a short type prefix, e.g. `M:...` for media.
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}:{}", prefix, uuid::Uuid::new_v4().simple())
}

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self::configure(conn)?)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // Pattern operators are case sensitive.
        conn.pragma_update(None, "case_sensitive_like", "ON")?;
        register_regexp(&conn)?;
        register_local_time(&conn)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` inside one transaction, committing only if it succeeds.
    pub fn in_transaction<T, E>(&self, f: impl FnOnce(&Database) -> std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // ========================================================================
    // Users and catalogs
    // ========================================================================

    pub fn create_user(&self, email: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user (email, name, created) VALUES (?, ?, ?)",
            params![email, name, format_timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    pub fn create_catalog(&self, name: &str) -> Result<String> {
        let id = new_id("C");
        self.conn.execute(
            "INSERT INTO catalog (id, name) VALUES (?, ?)",
            params![id, name],
        )?;
        Ok(id)
    }

    /// Give a user access to a catalog, replacing any previous grant.
    pub fn grant(&self, user: &str, catalog: &str, writable: bool) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO user_catalog (user, catalog, writable) VALUES (?, ?, ?)",
            params![user, catalog, writable],
        )?;
        Ok(())
    }

    pub fn catalog_exists(&self, catalog: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM catalog WHERE id = ?", [catalog], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

impl Authorizer for Database {
    fn authorize(&self, caller: &str, catalog: &str) -> Result<Access> {
        let writable: Option<bool> = self
            .conn
            .query_row(
                "SELECT writable FROM user_catalog WHERE user = ? AND catalog = ?",
                params![caller, catalog],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match writable {
            Some(true) => Access::Write,
            Some(false) => Access::Read,
            None => Access::Denied,
        })
    }
}

/// Install `regexp(pattern, text)`, which backs the `REGEXP` operator.
///
/// A NULL text yields NULL so that `REGEXP` follows the same three-valued
/// logic as `LIKE`.
fn register_regexp(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;

            let text = ctx.get_raw(1);
            if matches!(text, ValueRef::Null) {
                return Ok(None);
            }
            let text = text
                .as_str()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(Some(regex.is_match(text)))
        },
    )
}

/// Install `local_time(taken, zone)`: a stored UTC instant as wall-clock
/// time in the zone it was recorded in, in a form `strftime` accepts.
/// Calendar modifiers on `taken` extract from this value.
fn register_local_time(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "local_time",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let taken: Option<String> = ctx.get(0)?;
            let zone: Option<String> = ctx.get(1)?;
            Ok(taken
                .as_deref()
                .and_then(parse_timestamp)
                .map(|t| media::localize(t, zone.as_deref()).format("%Y-%m-%d %H:%M:%S").to_string()))
        },
    )
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
