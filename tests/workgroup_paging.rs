use folio::cancel::CancelToken;
use folio::model::{Content, NoteInfo};
use folio::query::SearchSpec;
use folio::store::{NoteStore, SearchMethod};
use folio::workgroup::{PageRange, SearchScope, Workgroup};
use tempfile::{tempdir, TempDir};

/// Builds one store per entry of `counts`, each holding that many documents
/// whose names start with "a", plus one non-matching document.
fn workgroup(counts: &[usize]) -> (TempDir, Workgroup) {
    let dir = tempdir().unwrap();
    let mut group = Workgroup::new();
    for (i, &count) in counts.iter().enumerate() {
        let store = NoteStore::init(
            dir.path().join(format!("store{i}.db")),
            NoteInfo::new(format!("store{i}")),
        )
        .unwrap();
        for n in 0..count {
            store.create(&format!("a{n}"), "", None).unwrap();
        }
        store.create("zzz", "", None).unwrap();
        group.add(store, true, i as i32).unwrap();
    }
    (dir, group)
}

fn key(row: &Content) -> (String, String, i64) {
    (
        row.owner.as_ref().unwrap().to_string(),
        row.name.clone(),
        row.slot,
    )
}

#[test]
fn merged_pages_equal_slices_of_the_concatenation() {
    let (_dir, group) = workgroup(&[2, 0, 3, 1]);
    let spec = SearchSpec::compile("a*");

    let everything: Vec<_> = group
        .enabled_in_order()
        .iter()
        .flat_map(|store| {
            store
                .search(&spec, SearchMethod::Heading, 0, usize::MAX >> 1)
                .unwrap()
                .rows
        })
        .map(|row| key(&row))
        .collect();
    assert_eq!(everything.len(), 6);

    for skip in 0..=8 {
        for take in 0..=8 {
            let page = group
                .search(
                    &spec,
                    SearchMethod::Heading,
                    SearchScope::All,
                    PageRange::new(skip, take),
                )
                .unwrap();
            let got: Vec<_> = page.rows.iter().map(key).collect();
            let expected: Vec<_> = everything.iter().skip(skip).take(take).cloned().collect();
            assert_eq!(got, expected, "skip={skip} take={take}");
            assert_eq!(page.total, 6);
        }
    }
}

#[test]
fn unbounded_take_returns_everything_after_skip() {
    let (_dir, group) = workgroup(&[5, 3]);

    let page = group
        .search(
            &SearchSpec::compile("a*"),
            SearchMethod::Heading,
            SearchScope::All,
            PageRange::new(1, usize::MAX),
        )
        .unwrap();
    assert_eq!(page.total, 8);
    assert_eq!(page.rows.len(), 7);
}

#[test]
fn window_straddling_two_stores() {
    let dir = tempdir().unwrap();
    let s1 = NoteStore::init(dir.path().join("s1.db"), NoteInfo::new("s1")).unwrap();
    let s2 = NoteStore::init(dir.path().join("s2.db"), NoteInfo::new("s2")).unwrap();
    for name in ["a", "a", "a"] {
        s1.create(name, "", None).unwrap();
    }
    let s2_first = s2.create("a", "older", None).unwrap();
    let s2_newest = s2.create("a", "newer", None).unwrap();
    s1.create("b", "", None).unwrap();

    let s1_last = s1.read_slot("a", 3).unwrap().unwrap();
    let mut group = Workgroup::new();
    group.add(s1, true, 0).unwrap();
    group.add(s2, true, 1).unwrap();

    let page = group
        .search(
            &SearchSpec::compile("a"),
            SearchMethod::Heading,
            SearchScope::All,
            PageRange::new(2, 2),
        )
        .unwrap();

    assert_eq!(page.total, 5);
    let ids: Vec<_> = page.rows.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![s1_last.id(), s2_newest.id()]);
    assert_ne!(ids[1], s2_first.id());
}

#[test]
fn priority_decides_store_order() {
    let (dir, mut group) = workgroup(&[1, 1]);
    group
        .set_priority(&dir.path().join("store0.db"), 10)
        .unwrap();

    let page = group
        .search(
            &SearchSpec::compile("a*"),
            SearchMethod::Heading,
            SearchScope::All,
            PageRange::first(10),
        )
        .unwrap();
    let owners: Vec<_> = page
        .rows
        .iter()
        .map(|row| row.owner.as_ref().unwrap().path().to_path_buf())
        .collect();
    assert_eq!(
        owners,
        vec![dir.path().join("store1.db"), dir.path().join("store0.db")]
    );
}

#[test]
fn disabled_stores_are_left_out_of_total_and_rows() {
    let (dir, mut group) = workgroup(&[2, 3]);
    group
        .set_enabled(&dir.path().join("store1.db"), false)
        .unwrap();

    let page = group
        .search(
            &SearchSpec::compile("a*"),
            SearchMethod::Heading,
            SearchScope::All,
            PageRange::first(10),
        )
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows.len(), 2);
}

#[tokio::test]
async fn async_merge_agrees_with_sync_merge() {
    let (_dir, group) = workgroup(&[3, 1, 2]);
    let spec = SearchSpec::compile("a*");
    let cancel = CancelToken::new();

    for skip in 0..7 {
        let range = PageRange::new(skip, 2);
        let sync = group
            .search(&spec, SearchMethod::Heading, SearchScope::All, range)
            .unwrap();
        let merged = group
            .search_async(&spec, SearchMethod::Heading, SearchScope::All, range, &cancel)
            .await
            .unwrap();
        assert_eq!(merged, sync);
    }
}
