//! # Storage Layer
//!
//! A [`NoteStore`] is one independent, file-backed document repository: a
//! single SQLite file holding an index table, a body table, an FTS5 index
//! and the revision chain of every document (see [`schema`]).
//!
//! ## Records
//!
//! Every document lives twice inside a store:
//! - a [`Content`] row in `contents`, cheap to list and search
//! - a body row in `pages`, mirrored into the full-text index
//!
//! Writes touch both inside one transaction, so a committed write never
//! leaves them disagreeing about name or tags.
//!
//! ## Identity
//!
//! The store file path is the durable identity. `NoteStore` is cheap to
//! clone and re-create; every operation opens its own connection, which
//! is what lets async variants hop onto blocking threads freely.
//!
//! ## Concurrency
//!
//! Callers serialize access to a store themselves. SQLite's own locking
//! keeps single-writer durability; nothing here adds more.

use crate::error::{FolioError, Result};
use crate::model::{parse_tags, Content, DocId, NoteInfo, Page, StoreRef};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;

pub mod schema;
pub mod search;
pub mod tasks;
pub mod write;

pub use search::{SearchMethod, SearchPage};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const CONTENT_COLUMNS: &str =
    "c.id, c.name, c.slot, c.tags, c.content_type, c.created_at, c.updated_at, c.erased";

#[derive(Debug, Clone)]
pub struct NoteStore {
    path: PathBuf,
    owner: StoreRef,
    info: OnceLock<NoteInfo>,
}

impl NoteStore {
    /// Creates a new store file. Fails if the file already exists.
    pub fn init(path: impl AsRef<Path>, info: NoteInfo) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(FolioError::AlreadyExists(path.display().to_string()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        schema::migrate(&conn)?;
        write_info(&conn, &info)?;
        info!("Created store {} at {}", info.name, path.display());

        Ok(Self::at(path))
    }

    /// Opens an existing store file, migrating its schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::at(path.as_ref().to_path_buf());
        store.migrate()?;
        Ok(store)
    }

    fn at(path: PathBuf) -> Self {
        Self {
            owner: StoreRef::new(path.clone()),
            path,
            info: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Back-reference stamped onto every row this store returns.
    pub fn owner(&self) -> StoreRef {
        self.owner.clone()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.connect()?;
        schema::migrate(&conn)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(FolioError::NotFound(self.path.clone()));
        }
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Store metadata, read once and cached until this instance writes it.
    pub fn info(&self) -> Result<NoteInfo> {
        if let Some(info) = self.info.get() {
            return Ok(info.clone());
        }
        let conn = self.connect()?;
        let mut info = read_info(&conn)?;
        info.location = self.path.clone();
        let _ = self.info.set(info.clone());
        Ok(info)
    }

    pub fn set_info(&mut self, info: NoteInfo) -> Result<()> {
        let conn = self.connect()?;
        write_info(&conn, &info)?;
        self.info = OnceLock::new();
        Ok(())
    }

    pub fn is_read_only(&self) -> Result<bool> {
        Ok(self.info()?.read_only)
    }

    /// Reads a document by identity. Erased documents are returned too.
    pub fn read(&self, id: DocId) -> Result<Page> {
        let conn = self.connect()?;
        read_page(&conn, id, &self.owner)?.ok_or(FolioError::DocumentNotFound(id))
    }

    /// Reads the live document holding `slot` among those named `name`.
    pub fn read_slot(&self, name: &str, slot: i64) -> Result<Option<Page>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {CONTENT_COLUMNS}, p.body FROM contents c JOIN pages p ON p.id = c.id \
             WHERE c.name = ?1 AND c.slot = ?2 AND c.erased = 0"
        );
        let page = conn
            .query_row(&sql, params![name, slot], |row| page_from_row(row, &self.owner))
            .optional()?;
        Ok(page)
    }

    /// Every live document named `name`, newest first.
    pub fn read_all_with_name(&self, name: &str) -> Result<Vec<Page>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {CONTENT_COLUMNS}, p.body FROM contents c JOIN pages p ON p.id = c.id \
             WHERE c.name = ?1 AND c.erased = 0 ORDER BY c.slot"
        );
        let mut stmt = conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![name], |row| page_from_row(row, &self.owner))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    /// Number of revisions recorded for a document.
    pub fn revision_count(&self, id: DocId) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM revisions r JOIN pages p ON p.rowno = r.rowno WHERE p.id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

pub(crate) fn read_page(conn: &Connection, id: DocId, owner: &StoreRef) -> Result<Option<Page>> {
    let sql = format!(
        "SELECT {CONTENT_COLUMNS}, p.body FROM contents c JOIN pages p ON p.id = c.id \
         WHERE c.id = ?1"
    );
    let page = conn
        .query_row(&sql, params![id.to_string()], |row| page_from_row(row, owner))
        .optional()?;
    Ok(page)
}

pub(crate) fn rowno_of(conn: &Connection, id: DocId) -> Result<i64> {
    conn.query_row(
        "SELECT rowno FROM pages WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(FolioError::DocumentNotFound(id))
}

pub(crate) fn content_from_row(row: &Row<'_>, owner: &StoreRef) -> rusqlite::Result<Content> {
    let id: String = row.get(0)?;
    let tags: String = row.get(3)?;
    Ok(Content {
        id: id
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        name: row.get(1)?,
        slot: row.get(2)?,
        tags: parse_tags(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        content_type: row.get(4)?,
        created_at: from_micros(row.get(5)?, 5)?,
        updated_at: from_micros(row.get(6)?, 6)?,
        erased: row.get(7)?,
        owner: Some(owner.clone()),
    })
}

pub(crate) fn page_from_row(row: &Row<'_>, owner: &StoreRef) -> rusqlite::Result<Page> {
    Ok(Page {
        meta: content_from_row(row, owner)?,
        body: row.get(8)?,
    })
}

pub(crate) fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        column, micros,
    ))
}

const INFO_KEYS: [&str; 8] = [
    "name",
    "title",
    "version",
    "description",
    "author",
    "read_only",
    "tag",
    "created_at",
];

fn write_info(conn: &Connection, info: &NoteInfo) -> Result<()> {
    let values = [
        info.name.clone(),
        info.title.clone(),
        info.version.clone(),
        info.description.clone(),
        info.author.clone(),
        info.read_only.to_string(),
        info.tag.clone(),
        to_micros(info.created_at).to_string(),
    ];
    let mut stmt = conn.prepare(
        "INSERT INTO meta(key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )?;
    for (key, value) in INFO_KEYS.iter().zip(values.iter()) {
        stmt.execute(params![key, value])?;
    }
    Ok(())
}

fn read_info(conn: &Connection) -> Result<NoteInfo> {
    let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = ?1")?;
    let mut get = |key: &str| -> Result<String> {
        Ok(stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?
            .unwrap_or_default())
    };

    let created_micros = get("created_at")?
        .parse::<i64>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    Ok(NoteInfo {
        name: get("name")?,
        title: get("title")?,
        version: get("version")?,
        description: get("description")?,
        author: get("author")?,
        read_only: get("read_only")? == "true",
        tag: get("tag")?,
        created_at: from_micros(created_micros, 0)?,
        location: PathBuf::new(),
    })
}
