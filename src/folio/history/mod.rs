//! # Revision History
//!
//! Every save that changes a document's name, body or tags appends one
//! [`Revision`] holding *reverse* patches: applied to the newer values they
//! give back the older ones. Only patches are stored, never full copies.
//!
//! Each patch travels with a hash of the value it should produce, so a
//! restore can prove it rebuilt the old value exactly. A mismatch means the
//! chain is corrupt and is reported as
//! [`FolioError::IntegrityViolation`], never papered over.
//!
//! Generations count up from 0 per document. [`NoteStore::history_of`]
//! walks them newest to oldest, rebuilding one snapshot per step.

use crate::error::{FolioError, Result};
use crate::model::{now, parse_tags, DocId, Page, StoreRef};
use crate::store::{from_micros, read_page, rowno_of, to_micros, NoteStore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub mod patch;

pub use patch::{content_hash, Edit, Patch};

#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub rowno: i64,
    pub generation: i64,
    pub title: Patch,
    pub body: Patch,
    pub tags: Patch,
    pub title_hash: u64,
    pub body_hash: u64,
    pub tags_hash: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl Revision {
    /// Records how to get from `new` back to `old`.
    pub fn create(rowno: i64, generation: i64, old: &Page, new: &Page) -> Result<Self> {
        if old.id() != new.id() {
            return Err(FolioError::ValidationFailed(vec![format!(
                "cannot diff {} against {}: different documents",
                old.id(),
                new.id()
            )]));
        }

        let (old_tags, new_tags) = (old.tag_string(), new.tag_string());
        Ok(Self {
            rowno,
            generation,
            title: Patch::between(&new.meta.name, &old.meta.name),
            body: Patch::between(&new.body, &old.body),
            tags: Patch::between(&new_tags, &old_tags),
            title_hash: content_hash(&old.meta.name),
            body_hash: content_hash(&old.body),
            tags_hash: content_hash(&old_tags),
            created_at: old.meta.created_at,
            updated_at: old.meta.updated_at,
            saved_at: now(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty() && self.tags.is_empty()
    }

    /// Rebuilds the page as it was before this revision was saved.
    pub fn restore(&self, newer: &Page) -> Result<Page> {
        let id = newer.id();
        let title = self.rebuild(&self.title, &newer.meta.name, self.title_hash, id, "title")?;
        let body = self.rebuild(&self.body, &newer.body, self.body_hash, id, "body")?;
        let tags = self.rebuild(&self.tags, &newer.tag_string(), self.tags_hash, id, "tags")?;

        let mut older = newer.clone();
        older.meta.name = title;
        older.body = body;
        older.meta.tags = parse_tags(&tags).map_err(|_| self.violation(id, "tags"))?;
        older.meta.created_at = self.created_at;
        older.meta.updated_at = self.updated_at;
        Ok(older)
    }

    fn rebuild(
        &self,
        patch: &Patch,
        newer: &str,
        expected: u64,
        id: DocId,
        field: &'static str,
    ) -> Result<String> {
        let older = patch.apply(newer).ok_or_else(|| self.violation(id, field))?;
        if content_hash(&older) != expected {
            return Err(self.violation(id, field));
        }
        Ok(older)
    }

    fn violation(&self, id: DocId, field: &'static str) -> FolioError {
        FolioError::IntegrityViolation {
            id,
            generation: self.generation,
            field,
        }
    }
}

/// Generation the next revision of `rowno` gets: highest so far + 1, or 0.
pub(crate) fn next_generation(conn: &Connection, rowno: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(generation) + 1, 0) FROM revisions WHERE rowno = ?1",
        params![rowno],
        |row| row.get(0),
    )?)
}

/// Appends a revision. Revisions with nothing to undo are skipped.
pub(crate) fn insert(conn: &Connection, revision: &Revision) -> Result<bool> {
    if revision.is_empty() {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO revisions(rowno, generation, title_patch, body_patch, tags_patch,
                               title_hash, body_hash, tags_hash, created_at, updated_at, saved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            revision.rowno,
            revision.generation,
            revision.title.to_json()?,
            revision.body.to_json()?,
            revision.tags.to_json()?,
            revision.title_hash as i64,
            revision.body_hash as i64,
            revision.tags_hash as i64,
            to_micros(revision.created_at),
            to_micros(revision.updated_at),
            to_micros(revision.saved_at),
        ],
    )?;
    Ok(true)
}

pub(crate) fn load(conn: &Connection, rowno: i64, generation: i64) -> Result<Option<Revision>> {
    let raw = conn
        .query_row(
            "SELECT title_patch, body_patch, tags_patch, title_hash, body_hash, tags_hash,
                    created_at, updated_at, saved_at
             FROM revisions WHERE rowno = ?1 AND generation = ?2",
            params![rowno, generation],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    from_micros(row.get(6)?, 6)?,
                    from_micros(row.get(7)?, 7)?,
                    from_micros(row.get(8)?, 8)?,
                ))
            },
        )
        .optional()?;

    let Some((title, body, tags, title_hash, body_hash, tags_hash, created, updated, saved)) = raw
    else {
        return Ok(None);
    };

    Ok(Some(Revision {
        rowno,
        generation,
        title: Patch::from_json(&title)?,
        body: Patch::from_json(&body)?,
        tags: Patch::from_json(&tags)?,
        title_hash: title_hash as u64,
        body_hash: body_hash as u64,
        tags_hash: tags_hash as u64,
        created_at: created,
        updated_at: updated,
        saved_at: saved,
    }))
}

/// Lazy walk from the current page back through every stored revision.
///
/// Yields the current page first, then one reconstruction per generation,
/// newest to oldest. Stops after the oldest generation or the first error.
pub struct History {
    conn: Connection,
    rowno: i64,
    current: Option<Page>,
    next_generation: i64,
    started: bool,
}

impl History {
    fn step(&mut self) -> Option<Result<Page>> {
        if !self.started {
            self.started = true;
            return self.current.clone().map(Ok);
        }
        if self.next_generation < 0 {
            return None;
        }
        let newer = self.current.take()?;
        let generation = self.next_generation;
        self.next_generation -= 1;

        let older = load(&self.conn, self.rowno, generation).and_then(|revision| {
            revision
                .ok_or(FolioError::IntegrityViolation {
                    id: newer.id(),
                    generation,
                    field: "revision",
                })?
                .restore(&newer)
        });

        match older {
            Ok(page) => {
                self.current = Some(page.clone());
                Some(Ok(page))
            }
            Err(err) => {
                self.next_generation = -1;
                Some(Err(err))
            }
        }
    }
}

impl Iterator for History {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

impl NoteStore {
    /// Current page followed by progressively older snapshots.
    ///
    /// Each call starts a fresh walk; a `History` cannot be rewound.
    pub fn history_of(&self, id: DocId) -> Result<History> {
        let conn = self.connect()?;
        let owner: StoreRef = self.owner();
        let current = read_page(&conn, id, &owner)?.ok_or(FolioError::DocumentNotFound(id))?;
        let rowno = rowno_of(&conn, id)?;
        let next_generation = next_generation(&conn, rowno)? - 1;

        Ok(History {
            conn,
            rowno,
            current: Some(current),
            next_generation,
            started: false,
        })
    }
}
