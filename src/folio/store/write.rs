use super::{read_page, rowno_of, to_micros, NoteStore};
use crate::error::{FolioError, Result};
use crate::history::{self, Revision};
use crate::model::{now, DocId, Page, Tags};
use rusqlite::{params, Transaction};
use tracing::debug;

impl NoteStore {
    /// Creates a document at slot 1 and renumbers its same-name siblings.
    pub fn create(&self, name: &str, body: &str, tags: Option<Tags>) -> Result<Page> {
        let page = Page::new(name.to_string(), body.to_string(), tags);
        self.insert(&page)
    }

    /// Persists a fully formed page as a new document.
    ///
    /// Fails with `AlreadyExists` if the identifier is already in use.
    pub fn insert(&self, page: &Page) -> Result<Page> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM contents WHERE id = ?1)",
            params![page.id().to_string()],
            |row| row.get(0),
        )?;
        if taken {
            return Err(FolioError::AlreadyExists(format!("document {}", page.id())));
        }

        let seq = next_seq(&tx)?;
        let meta = &page.meta;
        let tags = meta.tag_string();
        tx.execute(
            "INSERT INTO contents(id, name, slot, tags, content_type, created_at, updated_at, erased, seq)
             VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                meta.id.to_string(),
                meta.name,
                tags,
                meta.content_type,
                to_micros(meta.created_at),
                to_micros(meta.updated_at),
                meta.erased,
                seq,
            ],
        )?;
        tx.execute(
            "INSERT INTO pages(id, name, tags, body) VALUES (?1, ?2, ?3, ?4)",
            params![meta.id.to_string(), meta.name, tags, page.body],
        )?;
        renumber(&tx, &meta.name)?;

        let stored = read_page(&tx, meta.id, &self.owner)?.ok_or(FolioError::DocumentNotFound(meta.id))?;
        tx.commit()?;
        debug!("Created {} ({}) in {}", stored.meta.name, stored.id(), self.owner);
        Ok(stored)
    }

    /// Saves `page` over the stored version of the same document.
    ///
    /// Returns `false` without writing anything when nothing changed. A change
    /// of content type alone is stored in place: it is not versioned, so it
    /// neither appends a revision nor moves the document's slot. Otherwise a
    /// revision holding the previous values is appended first, then the new
    /// values land and both the old and the new name get their slots
    /// renumbered.
    pub fn update(&self, page: &Page) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let id = page.id();
        let old = read_page(&tx, id, &self.owner)?.ok_or(FolioError::DocumentNotFound(id))?;
        if old.meta.name == page.meta.name
            && old.body == page.body
            && old.tag_string() == page.tag_string()
        {
            if old.meta.content_type == page.meta.content_type {
                return Ok(false);
            }
            tx.execute(
                "UPDATE contents SET content_type = ?2 WHERE id = ?1",
                params![id.to_string(), page.meta.content_type],
            )?;
            tx.commit()?;
            debug!("Retyped {} ({}) in {}", old.meta.name, id, self.owner);
            return Ok(true);
        }

        let mut new = page.clone();
        new.meta.updated_at = now();

        let rowno = rowno_of(&tx, id)?;
        let generation = history::next_generation(&tx, rowno)?;
        let revision = Revision::create(rowno, generation, &old, &new)?;
        history::insert(&tx, &revision)?;

        let seq = next_seq(&tx)?;
        let tags = new.tag_string();
        tx.execute(
            "UPDATE contents SET name = ?2, tags = ?3, content_type = ?4, updated_at = ?5, seq = ?6
             WHERE id = ?1",
            params![
                id.to_string(),
                new.meta.name,
                tags,
                new.meta.content_type,
                to_micros(new.meta.updated_at),
                seq,
            ],
        )?;
        tx.execute(
            "UPDATE pages SET name = ?2, tags = ?3, body = ?4 WHERE id = ?1",
            params![id.to_string(), new.meta.name, tags, new.body],
        )?;

        renumber(&tx, &old.meta.name)?;
        if old.meta.name != new.meta.name {
            renumber(&tx, &new.meta.name)?;
        }
        tx.commit()?;

        debug!(
            "Saved {} ({}) as generation {} in {}",
            new.meta.name, id, generation, self.owner
        );
        Ok(true)
    }

    /// Marks a document erased. Its rows and revision chain stay on disk.
    pub fn delete(&self, id: DocId) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let old = read_page(&tx, id, &self.owner)?.ok_or(FolioError::DocumentNotFound(id))?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "UPDATE contents SET erased = 1, updated_at = ?2, seq = ?3 WHERE id = ?1",
            params![id.to_string(), to_micros(now()), seq],
        )?;
        renumber(&tx, &old.meta.name)?;
        tx.commit()?;

        debug!("Erased {} ({}) in {}", old.meta.name, id, self.owner);
        Ok(())
    }
}

fn next_seq(tx: &Transaction<'_>) -> Result<i64> {
    Ok(tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM contents", [], |row| {
        row.get(0)
    })?)
}

/// Re-assigns slots among live documents named `name`: 1 is the most
/// recently updated, counting up through older siblings.
fn renumber(tx: &Transaction<'_>, name: &str) -> Result<()> {
    let siblings: Vec<(String, i64)> = {
        let mut stmt = tx.prepare(
            "SELECT id, slot FROM contents WHERE name = ?1 AND erased = 0
             ORDER BY updated_at DESC, seq DESC",
        )?;
        let rows = stmt.query_map(params![name], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut stmt = tx.prepare("UPDATE contents SET slot = ?2 WHERE id = ?1")?;
    for (position, (id, slot)) in siblings.iter().enumerate() {
        let wanted = position as i64 + 1;
        if *slot != wanted {
            stmt.execute(params![id, wanted])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::FolioError;
    use crate::model::{NoteInfo, Page, Tags};
    use crate::store::NoteStore;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, NoteStore) {
        let dir = tempdir().unwrap();
        let store = NoteStore::init(dir.path().join("n.db"), NoteInfo::new("n")).unwrap();
        (dir, store)
    }

    fn slots(store: &NoteStore, name: &str) -> Vec<(String, i64)> {
        store
            .read_all_with_name(name)
            .unwrap()
            .into_iter()
            .map(|p| (p.body, p.meta.slot))
            .collect()
    }

    #[test]
    fn newest_sibling_takes_slot_one() {
        let (_dir, store) = store();
        store.create("X", "first", None).unwrap();
        store.create("X", "second", None).unwrap();
        store.create("X", "third", None).unwrap();

        assert_eq!(
            slots(&store, "X"),
            vec![("third".into(), 1), ("second".into(), 2), ("first".into(), 3)]
        );
        let page = store.read_slot("X", 2).unwrap().unwrap();
        assert_eq!(page.body, "second");
    }

    #[test]
    fn update_moves_document_to_slot_one() {
        let (_dir, store) = store();
        let first = store.create("X", "first", None).unwrap();
        store.create("X", "second", None).unwrap();

        let mut page = store.read(first.id()).unwrap();
        page.body = "first, edited".into();
        assert!(store.update(&page).unwrap());

        assert_eq!(
            slots(&store, "X"),
            vec![("first, edited".into(), 1), ("second".into(), 2)]
        );
    }

    #[test]
    fn unchanged_update_is_a_no_op() {
        let (_dir, store) = store();
        let page = store.create("X", "body", None).unwrap();
        let before = store.read(page.id()).unwrap();

        assert!(!store.update(&before).unwrap());
        assert_eq!(store.revision_count(page.id()).unwrap(), 0);
        assert_eq!(store.read(page.id()).unwrap(), before);
    }

    #[test]
    fn tag_change_alone_records_a_revision() {
        let (_dir, store) = store();
        let mut page = store.create("X", "body", None).unwrap();
        let mut tags = Tags::new();
        tags.insert("kind".into(), "memo".into());
        page.meta.tags = Some(tags.clone());

        assert!(store.update(&page).unwrap());
        assert_eq!(store.revision_count(page.id()).unwrap(), 1);
        assert_eq!(store.read(page.id()).unwrap().meta.tags, Some(tags));
    }

    #[test]
    fn content_type_change_is_stored_without_a_revision() {
        let (_dir, store) = store();
        let older = store.create("X", "older", None).unwrap();
        let newer = store.create("X", "newer", None).unwrap();

        let mut page = store.read(older.id()).unwrap();
        page.meta.content_type = "text/markdown".into();
        assert!(store.update(&page).unwrap());

        let stored = store.read(older.id()).unwrap();
        assert_eq!(stored.meta.content_type, "text/markdown");
        assert_eq!(stored.meta.updated_at, older.meta.updated_at);
        assert_eq!(stored.meta.slot, 2);
        assert_eq!(store.read(newer.id()).unwrap().meta.slot, 1);
        assert_eq!(store.revision_count(older.id()).unwrap(), 0);
        assert!(!store.update(&stored).unwrap());
    }

    #[test]
    fn rename_renumbers_both_names() {
        let (_dir, store) = store();
        store.create("X", "x-old", None).unwrap();
        let a = store.create("X", "a", None).unwrap();
        store.create("Y", "y-old", None).unwrap();
        assert_eq!(a.meta.slot, 1);

        let mut renamed = store.read(a.id()).unwrap();
        renamed.meta.name = "Y".into();
        assert!(store.update(&renamed).unwrap());

        assert_eq!(slots(&store, "X"), vec![("x-old".into(), 1)]);
        assert_eq!(
            slots(&store, "Y"),
            vec![("a".into(), 1), ("y-old".into(), 2)]
        );
    }

    #[test]
    fn delete_erases_and_closes_the_gap() {
        let (_dir, store) = store();
        let oldest = store.create("X", "oldest", None).unwrap();
        let middle = store.create("X", "middle", None).unwrap();
        store.create("X", "newest", None).unwrap();

        store.delete(middle.id()).unwrap();

        assert_eq!(
            slots(&store, "X"),
            vec![("newest".into(), 1), ("oldest".into(), 2)]
        );
        assert!(store.read(middle.id()).unwrap().meta.erased);
        assert_eq!(store.read(oldest.id()).unwrap().meta.slot, 2);
    }

    #[test]
    fn insert_rejects_duplicate_identifier() {
        let (_dir, store) = store();
        let page = Page::new("X".into(), "body".into(), None);
        store.insert(&page).unwrap();

        let err = store.insert(&page).unwrap_err();
        assert!(matches!(err, FolioError::AlreadyExists(_)));
    }

    #[test]
    fn writes_to_a_vanished_store_fail_with_not_found() {
        let (dir, store) = store();
        std::fs::remove_file(dir.path().join("n.db")).unwrap();

        let err = store.create("X", "body", None).unwrap_err();
        assert!(matches!(err, FolioError::NotFound(_)));
    }
}
