use super::{CmdMessage, CmdResult};
use crate::error::{FolioError, Result};
use crate::model::{Content, DocId};
use crate::workgroup::Workgroup;

/// Loads the full page behind a listed row from the store it came from.
pub fn run(group: &Workgroup, content: &Content) -> Result<CmdResult> {
    let owner = content
        .owner
        .as_ref()
        .ok_or(FolioError::DocumentNotFound(content.id))?;
    let store = group
        .store_for(owner)
        .ok_or_else(|| FolioError::NotFound(owner.path().to_path_buf()))?;

    let page = store.read(content.id)?;
    let message = CmdMessage::info(format!("Opened {}", page.meta.name));
    Ok(CmdResult::done(page, message))
}

/// Loads a page by identity from whichever enabled store holds it.
pub fn by_id(group: &Workgroup, id: DocId) -> Result<CmdResult> {
    let page = group.locate(id)?;
    let message = CmdMessage::info(format!("Opened {}", page.meta.name));
    Ok(CmdResult::done(page, message))
}
