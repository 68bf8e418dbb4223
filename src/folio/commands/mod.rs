//! # Commands
//!
//! Business logic behind every [`FolioApi`](crate::api::FolioApi) call, one
//! module per operation. Commands take the workgroup (and whatever façade
//! state they need) explicitly and return data; they never print.
//!
//! Mutating commands report in a [`CmdResult`]. Validation problems are data
//! in that result, not errors: `Err` is reserved for storage failures, which
//! the façade turns into a failed `CmdResult` of its own.

use crate::error::{FolioError, Result};
use crate::model::{DocId, Page};
use crate::store::NoteStore;
use crate::workgroup::Workgroup;
use std::sync::Arc;

pub mod create;
pub mod delete;
pub mod edit;
pub mod open;
pub mod rename;
pub mod search;

pub use search::{SearchOutcome, SearchRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Outcome of a document operation. Always carries a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct CmdResult {
    pub success: bool,
    pub affected: Option<Page>,
    pub notification: CmdMessage,
    pub validation_errors: Vec<String>,
}

impl CmdResult {
    pub fn done(affected: Page, notification: CmdMessage) -> Self {
        Self {
            success: true,
            affected: Some(affected),
            notification,
            validation_errors: Vec::new(),
        }
    }

    pub fn rejected(validation_errors: Vec<String>) -> Self {
        let notification = CmdMessage::warning(validation_errors.join("; "));
        Self {
            success: false,
            affected: None,
            notification,
            validation_errors,
        }
    }

    pub fn failed(notification: CmdMessage) -> Self {
        Self {
            success: false,
            affected: None,
            notification,
            validation_errors: Vec::new(),
        }
    }

    /// Failure report for an error that escaped a command.
    pub fn from_error(err: &FolioError) -> Self {
        match err {
            FolioError::ValidationFailed(errors) => Self::rejected(errors.clone()),
            other => Self::failed(CmdMessage::error(other.to_string())),
        }
    }
}

/// Collects validation problems before a mutation runs.
#[derive(Debug, Default)]
pub(crate) struct Checks {
    errors: Vec<String>,
}

impl Checks {
    pub fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn name(&mut self, name: &str) {
        if name.trim().is_empty() {
            self.fail("Name must not be empty");
        }
    }

    /// The document must be the one currently opened.
    pub fn opened(&mut self, opened: Option<&Page>, id: DocId) {
        if opened.map(Page::id) != Some(id) {
            self.fail(format!("Document {id} is not opened"));
        }
    }

    pub fn writable(&mut self, store: &NoteStore) -> Result<()> {
        if store.is_read_only()? {
            self.fail(format!("Store {} is read-only", store.info()?.name));
        }
        Ok(())
    }

    /// No other live document in `store` may already use `name`.
    pub fn unique_name(
        &mut self,
        store: &NoteStore,
        name: &str,
        except: Option<DocId>,
        allow_duplicates: bool,
    ) -> Result<()> {
        if allow_duplicates || name.trim().is_empty() {
            return Ok(());
        }
        let taken = store
            .read_all_with_name(name)?
            .iter()
            .any(|page| Some(page.id()) != except);
        if taken {
            self.fail(format!("A document named '{name}' already exists"));
        }
        Ok(())
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> CmdResult {
        CmdResult::rejected(self.errors)
    }
}

/// The member store a page was read from.
pub(crate) fn owning_store(group: &Workgroup, page: &Page) -> Result<Arc<NoteStore>> {
    match &page.meta.owner {
        Some(owner) => group
            .store_for(owner)
            .ok_or_else(|| FolioError::NotFound(owner.path().to_path_buf())),
        None => Err(FolioError::DocumentNotFound(page.id())),
    }
}
