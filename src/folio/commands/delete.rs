use super::{owning_store, Checks, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{DocId, Page};
use crate::workgroup::Workgroup;

/// Erases the opened document. The returned page is the erased record.
pub fn run(group: &Workgroup, opened: Option<&Page>, id: DocId) -> Result<CmdResult> {
    let mut checks = Checks::default();
    checks.opened(opened, id);
    let Some(opened) = opened.filter(|page| page.id() == id) else {
        return Ok(checks.into_result());
    };

    let store = owning_store(group, opened)?;
    checks.writable(&store)?;
    if !checks.is_clean() {
        return Ok(checks.into_result());
    }

    store.delete(id)?;
    let page = store.read(id)?;
    let message = CmdMessage::success(format!("Deleted {}", page.meta.name));
    Ok(CmdResult::done(page, message))
}
