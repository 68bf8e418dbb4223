//! # Workgroup
//!
//! A [`Workgroup`] presents several stores as one search surface. Members are
//! kept in the order they were added; searches visit the enabled ones sorted
//! by priority (lower first, ties keep insertion order).
//!
//! ## Paging across stores
//!
//! A global `(skip, take)` window must behave as if every store's results were
//! concatenated in member order and then sliced. Nothing is concatenated:
//!
//! 1. Every enabled store counts its matches. Counts are independent and
//!    read-only, so they run side by side, one worker per store.
//! 2. [`page_plan`] walks the counts and turns the global window into at most
//!    one local window per store. Stores wholly inside the skipped prefix, and
//!    every store after the window is filled, are never queried for rows.
//! 3. The planned windows are fetched in order and their rows appended.
//!
//! The reported total is always the sum of the counts, however early the walk
//! stopped. Counts and rows are read in separate statements; a concurrent
//! writer can make them disagree and that is accepted.

use crate::cancel::CancelToken;
use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::model::{DocId, Page, StoreRef};
use crate::query::SearchSpec;
use crate::store::{NoteStore, SearchMethod, SearchPage};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct Member {
    pub store: Arc<NoteStore>,
    pub enabled: bool,
    pub priority: i32,
}

/// Which stores a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Every enabled member, merged.
    #[default]
    All,
    /// The selected store alone. Falls back to `All` when nothing is selected.
    Selected,
}

/// A global result window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub skip: usize,
    pub take: usize,
}

impl PageRange {
    pub fn new(skip: usize, take: usize) -> Self {
        Self { skip, take }
    }

    pub fn first(take: usize) -> Self {
        Self::new(0, take)
    }

    pub fn next(self) -> Self {
        Self::new(self.skip.saturating_add(self.take), self.take)
    }

    pub fn prev(self) -> Self {
        Self::new(self.skip.saturating_sub(self.take), self.take)
    }
}

/// Local window for one member, as planned by [`page_plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub member: usize,
    pub skip: usize,
    pub take: usize,
}

/// Splits a global `(skip, take)` window over stores holding `counts` rows.
///
/// Returned windows are in member order, each with `take > 0`.
pub fn page_plan(counts: &[usize], skip: usize, take: usize) -> Vec<Window> {
    let (mut skip, mut take) = (skip, take);
    let mut plan = Vec::new();

    for (member, &count) in counts.iter().enumerate() {
        if take == 0 {
            break;
        }
        if skip >= count {
            skip -= count;
            continue;
        }

        plan.push(Window { member, skip, take });
        if count - skip < take {
            take -= count - skip;
            skip = 0;
        } else {
            break;
        }
    }
    plan
}

#[derive(Debug, Clone, Default)]
pub struct Workgroup {
    members: Vec<Member>,
    selected: Option<StoreRef>,
}

impl Workgroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every configured store and restores the selection.
    pub fn from_config(config: &FolioConfig) -> Result<Self> {
        let mut group = Self::new();
        for member in &config.stores {
            let store = NoteStore::open(&member.path)?;
            group.add(store, member.enabled, member.priority)?;
        }
        if let Some(selected) = &config.selected {
            group.select(selected)?;
        }
        info!("Workgroup ready with {} store(s)", group.members.len());
        Ok(group)
    }

    /// Adds a store. A store path can only be a member once.
    pub fn add(&mut self, store: NoteStore, enabled: bool, priority: i32) -> Result<()> {
        if self.position(store.path()).is_some() {
            return Err(FolioError::AlreadyExists(store.path().display().to_string()));
        }
        self.members.push(Member {
            store: Arc::new(store),
            enabled,
            priority,
        });
        Ok(())
    }

    pub fn remove(&mut self, path: &Path) -> Option<Member> {
        let index = self.position(path)?;
        let member = self.members.remove(index);
        if self.selected.as_ref().is_some_and(|s| s.path() == path) {
            self.selected = None;
        }
        Some(member)
    }

    pub fn set_enabled(&mut self, path: &Path, enabled: bool) -> Result<()> {
        self.member_mut(path)?.enabled = enabled;
        Ok(())
    }

    pub fn set_priority(&mut self, path: &Path, priority: i32) -> Result<()> {
        self.member_mut(path)?.priority = priority;
        Ok(())
    }

    pub fn select(&mut self, path: &Path) -> Result<()> {
        let index = self
            .position(path)
            .ok_or_else(|| FolioError::NotFound(path.to_path_buf()))?;
        self.selected = Some(self.members[index].store.owner());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<Arc<NoteStore>> {
        self.selected.as_ref().and_then(|owner| self.store_for(owner))
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Enabled members sorted by priority; equal priorities keep member order.
    pub fn enabled_in_order(&self) -> Vec<Arc<NoteStore>> {
        let mut enabled: Vec<&Member> = self.members.iter().filter(|m| m.enabled).collect();
        enabled.sort_by_key(|m| m.priority);
        enabled.into_iter().map(|m| Arc::clone(&m.store)).collect()
    }

    /// Resolves a row's owner back to its member store.
    pub fn store_for(&self, owner: &StoreRef) -> Option<Arc<NoteStore>> {
        self.members
            .iter()
            .find(|m| m.store.path() == owner.path())
            .map(|m| Arc::clone(&m.store))
    }

    /// Reads a document by identity from whichever enabled store holds it.
    pub fn locate(&self, id: DocId) -> Result<Page> {
        for store in self.enabled_in_order() {
            match store.read(id) {
                Ok(page) => return Ok(page),
                Err(FolioError::DocumentNotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(FolioError::DocumentNotFound(id))
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.members.iter().position(|m| m.store.path() == path)
    }

    fn member_mut(&mut self, path: &Path) -> Result<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.store.path() == path)
            .ok_or_else(|| FolioError::NotFound(path.to_path_buf()))
    }

    /// The store a selected-scope search delegates to, if any.
    fn delegate(&self, scope: SearchScope) -> Option<Arc<NoteStore>> {
        match scope {
            SearchScope::All => None,
            SearchScope::Selected => self.selected(),
        }
    }

    pub fn search(
        &self,
        spec: &SearchSpec,
        method: SearchMethod,
        scope: SearchScope,
        range: PageRange,
    ) -> Result<SearchPage> {
        if let Some(store) = self.delegate(scope) {
            return store.search(spec, method, range.skip, range.take);
        }

        let stores = self.enabled_in_order();
        let counts = std::thread::scope(|s| {
            let workers: Vec<_> = stores
                .iter()
                .map(|store| s.spawn(move || store.count(spec, method)))
                .collect();
            workers
                .into_iter()
                .map(|worker| {
                    worker
                        .join()
                        .map_err(|_| FolioError::Task("count worker panicked".into()))
                        .and_then(|count| count)
                })
                .collect::<Result<Vec<usize>>>()
        })?;

        let mut rows = Vec::new();
        for window in page_plan(&counts, range.skip, range.take) {
            let store = &stores[window.member];
            debug!(
                "Fetching {}+{} of {} from {}",
                window.skip,
                window.take,
                counts[window.member],
                store.owner()
            );
            rows.extend(store.search(spec, method, window.skip, window.take)?.rows);
        }

        Ok(SearchPage {
            rows,
            total: counts.iter().sum(),
        })
    }

    /// Cancellable [`search`](Self::search). Counts fan out as blocking tasks;
    /// the token is checked before every page fetch.
    pub async fn search_async(
        &self,
        spec: &SearchSpec,
        method: SearchMethod,
        scope: SearchScope,
        range: PageRange,
        cancel: &CancelToken,
    ) -> Result<SearchPage> {
        if let Some(store) = self.delegate(scope) {
            return store
                .search_async(spec, method, range.skip, range.take, cancel)
                .await;
        }

        let stores = self.enabled_in_order();
        let counts = count_all(&stores, spec, method, cancel).await?;
        cancel.check()?;

        let mut rows = Vec::new();
        for window in page_plan(&counts, range.skip, range.take) {
            let store = &stores[window.member];
            debug!(
                "Fetching {}+{} of {} from {}",
                window.skip,
                window.take,
                counts[window.member],
                store.owner()
            );
            let page = store
                .search_async(spec, method, window.skip, window.take, cancel)
                .await?;
            rows.extend(page.rows);
        }

        Ok(SearchPage {
            rows,
            total: counts.iter().sum(),
        })
    }
}

async fn count_all(
    stores: &[Arc<NoteStore>],
    spec: &SearchSpec,
    method: SearchMethod,
    cancel: &CancelToken,
) -> Result<Vec<usize>> {
    let mut tasks = JoinSet::new();
    for (index, store) in stores.iter().enumerate() {
        let store = Arc::clone(store);
        let spec = spec.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { (index, store.count_async(&spec, method, &cancel).await) });
    }

    let mut counts = vec![0; stores.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, count) = joined?;
        match count {
            Ok(count) => counts[index] = count,
            Err(err) => {
                if !err.is_cancelled() {
                    warn!("Counting matches in {} failed: {}", stores[index].owner(), err);
                }
                return Err(err);
            }
        }
    }
    Ok(counts)
}
