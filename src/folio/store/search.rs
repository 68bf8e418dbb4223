use super::{content_from_row, NoteStore, CONTENT_COLUMNS};
use crate::error::Result;
use crate::model::Content;
use crate::query::{SearchSpec, Tier};
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

/// What a query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// The display name.
    #[default]
    Heading,
    /// The document body.
    FullText,
}

/// One window of search results plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub rows: Vec<Content>,
    pub total: usize,
}

/// `FROM ... WHERE ...` tail shared by the row query and the count query.
struct Plan {
    filter: String,
    args: Vec<String>,
}

fn plan(spec: &SearchSpec, method: SearchMethod) -> Result<Plan> {
    let mut filter =
        String::from("FROM contents c JOIN pages p ON p.id = c.id WHERE c.erased = 0");
    let mut args = Vec::new();

    let (fts_column, like) = match method {
        SearchMethod::Heading => ("name", spec.like_clause("c.name")?),
        SearchMethod::FullText => ("body", spec.contains_clause("p.body")?),
    };

    match spec.tier() {
        Tier::None => {}
        Tier::Exact | Tier::Partial => {
            // The phrase lookup tokenizes coarser than LIKE, so exact
            // queries run through both filters.
            if let Some(phrase) = spec.phrase(fts_column)? {
                filter.push_str(
                    " AND p.rowno IN (SELECT rowid FROM pages_fts WHERE pages_fts MATCH ?1)",
                );
                args.push(phrase);
            }
            filter.push_str(" AND ");
            filter.push_str(&like);
        }
    }

    Ok(Plan { filter, args })
}

impl NoteStore {
    /// Matching rows ordered by (name case-insensitively, slot), windowed by
    /// `skip`/`take`, together with the count of all matches.
    pub fn search(
        &self,
        spec: &SearchSpec,
        method: SearchMethod,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage> {
        let conn = self.connect()?;
        let plan = plan(spec, method)?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {}", plan.filter),
            params_from_iter(plan.args.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {CONTENT_COLUMNS} {} ORDER BY c.name COLLATE NOCASE, c.slot, c.name LIMIT {} OFFSET {}",
            plan.filter,
            take.min(i64::MAX as usize),
            skip.min(i64::MAX as usize),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(plan.args.iter()), |row| {
                content_from_row(row, &self.owner)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SearchPage {
            rows,
            total: total as usize,
        })
    }

    /// Number of matches only, without fetching any rows.
    pub fn count(&self, spec: &SearchSpec, method: SearchMethod) -> Result<usize> {
        let conn = self.connect()?;
        let plan = plan(spec, method)?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {}", plan.filter),
            params_from_iter(plan.args.iter()),
            |row| row.get(0),
        )?;
        Ok(total as usize)
    }

    pub fn search_by_heading(
        &self,
        spec: &SearchSpec,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage> {
        self.search(spec, SearchMethod::Heading, skip, take)
    }

    pub fn search_full_text(
        &self,
        spec: &SearchSpec,
        skip: usize,
        take: usize,
    ) -> Result<SearchPage> {
        self.search(spec, SearchMethod::FullText, skip, take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteInfo;
    use tempfile::{tempdir, TempDir};

    fn store_with(docs: &[(&str, &str)]) -> (TempDir, NoteStore) {
        let dir = tempdir().unwrap();
        let store = NoteStore::init(dir.path().join("n.db"), NoteInfo::new("n")).unwrap();
        for (name, body) in docs {
            store.create(name, body, None).unwrap();
        }
        (dir, store)
    }

    fn names(page: &SearchPage) -> Vec<&str> {
        page.rows.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn blank_query_lists_everything_in_name_order() {
        let (_dir, store) = store_with(&[("beta", ""), ("Alpha", ""), ("gamma", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile(""), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["Alpha", "beta", "gamma"]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn total_ignores_the_window() {
        let (_dir, store) = store_with(&[("a", ""), ("b", ""), ("c", ""), ("d", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile(""), 1, 2)
            .unwrap();
        assert_eq!(names(&page), vec!["b", "c"]);
        assert_eq!(page.total, 4);
        assert_eq!(store.count(&SearchSpec::compile(""), SearchMethod::Heading).unwrap(), 4);
    }

    #[test]
    fn exact_heading_matches_whole_name() {
        let (_dir, store) = store_with(&[("meeting", ""), ("Meeting", ""), ("meeting notes", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile("meeting"), 0, 10)
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(names(&page).iter().all(|n| n.eq_ignore_ascii_case("meeting")));
    }

    #[test]
    fn partial_heading_uses_globs() {
        let (_dir, store) = store_with(&[("meeting", ""), ("meeting notes", ""), ("memo", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile("meet*"), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["meeting", "meeting notes"]);

        let page = store
            .search_by_heading(&SearchSpec::compile("me?o"), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["memo"]);
    }

    #[test]
    fn full_text_phrase_lookup() {
        let (_dir, store) = store_with(&[
            ("one", "the quick brown fox"),
            ("two", "quick thinking"),
            ("three", "brown quick"),
        ]);
        let page = store
            .search_full_text(&SearchSpec::compile("quick brown"), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["one"]);

        let page = store
            .search_full_text(&SearchSpec::compile("quick"), 0, 10)
            .unwrap();
        assert_eq!(page.total, 3);
    }

    #[test]
    fn punctuation_query_falls_back_to_like() {
        let (_dir, store) = store_with(&[("one", "wow!!"), ("two", "wow")]);
        let page = store
            .search_full_text(&SearchSpec::compile("!!"), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["one"]);
    }

    #[test]
    fn quoted_names_are_searchable() {
        let (_dir, store) = store_with(&[("O'Brien", ""), ("OBrien", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile("O'Brien"), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["O'Brien"]);
    }

    #[test]
    fn literal_percent_is_not_a_wildcard() {
        let (_dir, store) = store_with(&[("100%", ""), ("1000", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile("100%"), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["100%"]);
    }

    #[test]
    fn erased_documents_are_hidden() {
        let (_dir, store) = store_with(&[("keep", "")]);
        let gone = store.create("gone", "", None).unwrap();
        store.delete(gone.id()).unwrap();

        let page = store
            .search_by_heading(&SearchSpec::compile(""), 0, 10)
            .unwrap();
        assert_eq!(names(&page), vec!["keep"]);
    }

    #[test]
    fn rows_carry_their_owner() {
        let (_dir, store) = store_with(&[("a", "")]);
        let page = store
            .search_by_heading(&SearchSpec::compile(""), 0, 10)
            .unwrap();
        assert_eq!(page.rows[0].owner, Some(store.owner()));
    }

    #[test]
    fn same_name_rows_follow_slot_order() {
        let (_dir, store) = store_with(&[("x", "old"), ("x", "new")]);
        let page = store
            .search_by_heading(&SearchSpec::compile("x"), 0, 10)
            .unwrap();
        let slots: Vec<i64> = page.rows.iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![1, 2]);
    }
}
