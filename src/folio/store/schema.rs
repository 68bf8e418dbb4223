//! On-disk layout of one store.
//!
//! ```text
//! meta       key/value store metadata (name, title, version, ...)
//! contents   index rows, one per document, ordered by (name, slot)
//! pages      body rows keyed by rowno, alternate key on document id
//! pages_fts  FTS5 mirror of pages, kept in sync by triggers
//! revisions  reverse patches keyed by (rowno, generation)
//! ```

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contents (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  slot INTEGER NOT NULL DEFAULT 1,
  tags TEXT NOT NULL DEFAULT '',
  content_type TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  erased INTEGER NOT NULL DEFAULT 0,
  seq INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contents_name_slot
  ON contents(name COLLATE NOCASE, slot);

CREATE TABLE IF NOT EXISTS pages (
  rowno INTEGER PRIMARY KEY AUTOINCREMENT,
  id TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  tags TEXT NOT NULL DEFAULT '',
  body TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
  id UNINDEXED,
  name,
  tags,
  body,
  content='pages',
  content_rowid='rowno'
);

CREATE TRIGGER IF NOT EXISTS pages_ai AFTER INSERT ON pages BEGIN
  INSERT INTO pages_fts(rowid, id, name, tags, body)
    VALUES (new.rowno, new.id, new.name, new.tags, new.body);
END;

CREATE TRIGGER IF NOT EXISTS pages_ad AFTER DELETE ON pages BEGIN
  INSERT INTO pages_fts(pages_fts, rowid, id, name, tags, body)
    VALUES ('delete', old.rowno, old.id, old.name, old.tags, old.body);
END;

CREATE TRIGGER IF NOT EXISTS pages_au AFTER UPDATE ON pages BEGIN
  INSERT INTO pages_fts(pages_fts, rowid, id, name, tags, body)
    VALUES ('delete', old.rowno, old.id, old.name, old.tags, old.body);
  INSERT INTO pages_fts(rowid, id, name, tags, body)
    VALUES (new.rowno, new.id, new.name, new.tags, new.body);
END;

CREATE TABLE IF NOT EXISTS revisions (
  rowno INTEGER NOT NULL,
  generation INTEGER NOT NULL,
  title_patch TEXT NOT NULL,
  body_patch TEXT NOT NULL,
  tags_patch TEXT NOT NULL,
  title_hash INTEGER NOT NULL,
  body_hash INTEGER NOT NULL,
  tags_hash INTEGER NOT NULL,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  saved_at INTEGER NOT NULL,
  PRIMARY KEY (rowno, generation)
);
"#;

/// Brings a store up to the current schema. Safe to run on every open.
pub fn migrate(conn: &Connection) -> Result<()> {
    let has_meta: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'meta')",
        [],
        |row| row.get(0),
    )?;
    let found: Option<String> = if has_meta {
        conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?
    } else {
        None
    };

    if found.as_deref() == Some(SCHEMA_VERSION.to_string().as_str()) {
        return Ok(());
    }

    debug!(
        "Migrating store schema from {:?} to {}",
        found, SCHEMA_VERSION
    );
    conn.execute_batch(SCHEMA)?;
    conn.execute(
        "INSERT INTO meta(key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
