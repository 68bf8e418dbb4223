use super::{Checks, CmdMessage, CmdResult};
use crate::config::FolioConfig;
use crate::error::Result;
use crate::store::NoteStore;

/// Creates a document in `target`, usually the selected store.
pub fn run(
    target: Option<&NoteStore>,
    config: &FolioConfig,
    name: &str,
    body: &str,
) -> Result<CmdResult> {
    let mut checks = Checks::default();
    checks.name(name);
    let Some(store) = target else {
        checks.fail("No store is available for new documents");
        return Ok(checks.into_result());
    };
    checks.writable(store)?;
    checks.unique_name(store, name, None, config.allow_duplicate_names)?;
    if !checks.is_clean() {
        return Ok(checks.into_result());
    }

    let page = store.create(name, body, None)?;
    let message = CmdMessage::success(format!("Created {}", page.meta.name));
    Ok(CmdResult::done(page, message))
}
