//! # API Facade
//!
//! [`FolioApi`] is the single entry point for presentation layers. It holds
//! the session state a UI needs (the last search, the selected row, the
//! opened document) and dispatches to `commands/*.rs` for the actual work.
//!
//! ## Searches
//!
//! Searching is asynchronous and supersedable. Every call to
//! [`search`](FolioApi::search), a page move or a refresh registers a new job
//! with [`SearchJobs`], which cancels any job still running. A job that
//! finishes after being superseded is dropped silently; only the newest job
//! reaches the [`SearchObserver`]. The returned handle resolves to the
//! delivered outcome, or `None` if the job was superseded or failed.
//!
//! Search jobs run on the ambient tokio runtime, so the search methods must
//! be called from inside one.
//!
//! ## Document operations
//!
//! `create_text`, `edit_text`, `rename_text` and `delete_text` always return a
//! [`CmdResult`]. Validation problems come back as its error list, storage
//! failures as a failed result with an error notification. Nothing is thrown
//! past this layer.
//!
//! Edits, renames and deletes apply to the opened document only. Mutations do
//! not re-run the search; call [`refresh`](FolioApi::refresh) for that.

use crate::cancel::{CancelToken, SearchJobs};
use crate::commands::{self, CmdMessage, CmdResult, SearchOutcome, SearchRequest};
use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::model::{Content, DocId, Page};
use crate::store::{NoteStore, SearchMethod};
use crate::workgroup::{PageRange, SearchScope, Workgroup};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Re-render signal for the presentation layer.
pub trait SearchObserver: Send + Sync {
    /// A search finished and was not superseded.
    fn on_search_result(&self, outcome: &SearchOutcome);

    /// A background search failed.
    fn on_notification(&self, _message: &CmdMessage) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {
    fn on_search_result(&self, _outcome: &SearchOutcome) {}
}

pub type SearchHandle = JoinHandle<Option<SearchOutcome>>;

pub struct FolioApi {
    group: Arc<Workgroup>,
    config: FolioConfig,
    jobs: SearchJobs<SearchOutcome>,
    observer: Arc<dyn SearchObserver>,
    scope: SearchScope,
    last_request: Option<SearchRequest>,
    selection: Option<usize>,
    opened: Option<Page>,
}

impl FolioApi {
    pub fn new(group: Workgroup, config: FolioConfig, observer: Arc<dyn SearchObserver>) -> Self {
        Self {
            group: Arc::new(group),
            config,
            jobs: SearchJobs::new(),
            observer,
            scope: SearchScope::All,
            last_request: None,
            selection: None,
            opened: None,
        }
    }

    /// Builds the workgroup from `config` and wraps it.
    pub fn from_config(config: FolioConfig, observer: Arc<dyn SearchObserver>) -> Result<Self> {
        let group = Workgroup::from_config(&config)?;
        Ok(Self::new(group, config, observer))
    }

    pub fn workgroup(&self) -> &Workgroup {
        &self.group
    }

    /// Membership changes apply to searches started afterwards.
    pub fn workgroup_mut(&mut self) -> &mut Workgroup {
        Arc::make_mut(&mut self.group)
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    pub fn set_scope(&mut self, scope: SearchScope) {
        self.scope = scope;
    }

    /// Migrates every member store, then runs the initial blank search.
    pub fn activate(&mut self) -> Result<SearchHandle> {
        for member in self.group.members() {
            member.store.migrate()?;
        }
        info!("Activated {} store(s)", self.group.members().len());
        let range = PageRange::first(self.config.page_size());
        Ok(self.search("", range, self.config.search_method))
    }

    pub fn search(&mut self, query: &str, range: PageRange, method: SearchMethod) -> SearchHandle {
        let mut request = SearchRequest::new(query, method, range);
        request.scope = self.scope;
        self.issue(request)
    }

    /// Next page of the last search. `None` when already on the last page.
    pub fn page_next(&mut self) -> Option<SearchHandle> {
        let request = self.last_request.clone()?;
        if let Some(outcome) = self.last_result() {
            if outcome.request == request && !outcome.has_next() {
                return None;
            }
        }
        Some(self.issue(request.with_range(request.range.next())))
    }

    /// Previous page of the last search. `None` when already on the first.
    pub fn page_prev(&mut self) -> Option<SearchHandle> {
        let request = self.last_request.clone()?;
        if request.range.skip == 0 {
            return None;
        }
        Some(self.issue(request.with_range(request.range.prev())))
    }

    /// Re-runs the last search unchanged.
    pub fn refresh(&mut self) -> Option<SearchHandle> {
        let request = self.last_request.clone()?;
        Some(self.issue(request))
    }

    /// The most recently delivered search outcome.
    pub fn last_result(&self) -> Option<SearchOutcome> {
        self.jobs.latest()
    }

    /// Cancels whatever search is still running.
    pub fn cancel_search(&self) {
        self.jobs.cancel_all();
    }

    fn issue(&mut self, request: SearchRequest) -> SearchHandle {
        self.last_request = Some(request.clone());
        self.selection = None;

        let job = self.jobs.begin();
        let jobs = self.jobs.clone();
        let group = Arc::clone(&self.group);
        let observer = Arc::clone(&self.observer);

        tokio::spawn(async move {
            match commands::search::run(&group, request, job.token()).await {
                Ok(outcome) => jobs
                    .finish(&job, outcome.clone(), |o| observer.on_search_result(o))
                    .then_some(outcome),
                Err(err) => {
                    jobs.abandon(&job);
                    if err.is_cancelled() {
                        debug!("Search job {} cancelled", job.id());
                    } else {
                        warn!("Search job {} failed: {}", job.id(), err);
                        observer.on_notification(&CmdMessage::error(format!(
                            "Search failed: {err}"
                        )));
                    }
                    None
                }
            }
        })
    }

    /// Selects a row of the last delivered result.
    pub fn select(&mut self, index: usize) -> Option<Content> {
        let row = self.last_result()?.rows.get(index).cloned()?;
        self.selection = Some(index);
        Some(row)
    }

    pub fn selected(&self) -> Option<Content> {
        let index = self.selection?;
        self.last_result()?.rows.get(index).cloned()
    }

    pub fn opened(&self) -> Option<&Page> {
        self.opened.as_ref()
    }

    /// Opens the selected row's full page.
    pub fn open_selected(&mut self) -> CmdResult {
        let Some(row) = self.selected() else {
            return CmdResult::rejected(vec!["No document is selected".into()]);
        };
        let result = self.report("open", commands::open::run(&self.group, &row));
        self.keep_opened(&result);
        result
    }

    pub fn open(&mut self, id: DocId) -> CmdResult {
        let result = self.report("open", commands::open::by_id(&self.group, id));
        self.keep_opened(&result);
        result
    }

    /// Creates a document in the selected store, or the first enabled one.
    pub fn create_text(&mut self, name: &str, body: &str) -> CmdResult {
        let target = self
            .group
            .selected()
            .or_else(|| self.group.enabled_in_order().into_iter().next());
        let outcome = commands::create::run(target.as_deref(), &self.config, name, body);
        let result = self.report("create", outcome);
        self.keep_opened(&result);
        result
    }

    pub fn edit_text(&mut self, id: DocId, body: &str) -> CmdResult {
        let outcome = commands::edit::run(&self.group, self.opened.as_ref(), id, body);
        let result = self.report("edit", outcome);
        self.keep_opened(&result);
        result
    }

    pub fn rename_text(&mut self, id: DocId, new_name: &str) -> CmdResult {
        let outcome =
            commands::rename::run(&self.group, &self.config, self.opened.as_ref(), id, new_name);
        let result = self.report("rename", outcome);
        self.keep_opened(&result);
        result
    }

    pub fn delete_text(&mut self, id: DocId) -> CmdResult {
        let outcome = commands::delete::run(&self.group, self.opened.as_ref(), id);
        let result = self.report("delete", outcome);
        if result.success {
            self.opened = None;
        }
        result
    }

    /// Up to `limit` snapshots of a document, newest first.
    pub async fn history(&self, id: DocId, limit: usize) -> Result<Vec<Page>> {
        let store = self.store_holding(id)?;
        store.history_async(id, limit, &CancelToken::new()).await
    }

    fn store_holding(&self, id: DocId) -> Result<Arc<NoteStore>> {
        let page = match self.opened.as_ref().filter(|page| page.id() == id) {
            Some(page) => page.clone(),
            None => self.group.locate(id)?,
        };
        commands::owning_store(&self.group, &page)
    }

    fn keep_opened(&mut self, result: &CmdResult) {
        if let Some(page) = result.affected.as_ref().filter(|_| result.success) {
            self.opened = Some(page.clone());
        }
    }

    fn report(&self, action: &str, outcome: Result<CmdResult>) -> CmdResult {
        match outcome {
            Ok(result) => {
                if !result.success {
                    debug!("{} rejected: {:?}", action, result.validation_errors);
                }
                result
            }
            Err(err) => {
                warn!("{} failed: {}", action, err);
                if let FolioError::IntegrityViolation { .. } = err {
                    warn!("Revision chain is corrupt; history for this document is unreliable");
                }
                CmdResult::from_error(&err)
            }
        }
    }
}
