//! Tag lookup against a prebuilt search index.
//!
//! The search index is a SQLite database produced by a separate indexing
//! job. This crate only reads it: one point query per photo, keyed by the
//! photo's path as the build sees it (`public/data/albums/kanto/a.jpg`).
//!
//! ```sql
//! SELECT * FROM images WHERE path = ?1 LIMIT 1
//! ```
//!
//! The matching row becomes the photo's [`TagRecord`], column name → value.
//! The `colors` column is stored as a tuple literal (`[(12, 34, 56), ...]`)
//! and is decoded into nested JSON arrays.
//!
//! Tags are enrichment: every failure (missing index, locked database,
//! path not indexed, malformed row) is a `None` plus a log line, never an
//! error.

use crate::config::TagsConfig;
use crate::types::TagRecord;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Point lookup of a photo's tags.
pub trait TagLookup: Sync {
    fn lookup(&self, path: &Path) -> Option<TagRecord>;
}

/// Used when no index is configured or it can't be opened.
pub struct NoTags;

impl TagLookup for NoTags {
    fn lookup(&self, _path: &Path) -> Option<TagRecord> {
        None
    }
}

/// Read-only handle on the search index.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so the handle wraps it
/// in a mutex to be shared by rayon workers.
pub struct SqliteTagIndex {
    conn: Mutex<Connection>,
}

impl SqliteTagIndex {
    /// Open the index read-only. Lookups waiting on a locked database give
    /// up after `timeout`.
    pub fn open(path: &Path, timeout: Duration) -> rusqlite::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(timeout)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query(&self, key: &str) -> rusqlite::Result<Option<TagRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| rusqlite::Error::InvalidQuery)?;
        let mut stmt = conn.prepare_cached("SELECT * FROM images WHERE path = ?1 LIMIT 1")?;
        stmt.query_row([key], |row| {
            let mut record = TagRecord::new();
            for (i, name) in row.as_ref().column_names().into_iter().enumerate() {
                record.insert(name.to_string(), column_value(name, row.get_ref(i)?));
            }
            Ok(record)
        })
        .optional()
    }
}

impl TagLookup for SqliteTagIndex {
    fn lookup(&self, path: &Path) -> Option<TagRecord> {
        let key = path.to_string_lossy();
        match self.query(&key) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!(path = %key, "not in search index");
                None
            }
            Err(e) => {
                info!(path = %key, error = %e, "tag lookup failed, skipping");
                None
            }
        }
    }
}

/// Open the configured index, falling back to [`NoTags`].
pub fn open_tag_lookup(config: &TagsConfig) -> Box<dyn TagLookup> {
    let Some(index) = &config.index else {
        return Box::new(NoTags);
    };
    if !index.is_file() {
        warn!(path = %index.display(), "search index not found, building without tags");
        return Box::new(NoTags);
    }
    match SqliteTagIndex::open(index, config.timeout()) {
        Ok(db) => Box::new(db),
        Err(e) => {
            warn!(
                path = %index.display(),
                error = %e,
                "cannot open search index, building without tags"
            );
            Box::new(NoTags)
        }
    }
}

fn column_value(name: &str, value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if name == "colors" {
                parse_colors(&text)
            } else {
                Value::String(text.into_owned())
            }
        }
    }
}

/// `[(1, 2, 3), (4, 5, 6)]` → `[[1, 2, 3], [4, 5, 6]]`.
///
/// Malformed input is kept as the original string.
fn parse_colors(text: &str) -> Value {
    let jsonified = text.replace('(', "[").replace(')', "]");
    serde_json::from_str(&jsonified).unwrap_or_else(|_| Value::String(text.to_string()))
}
