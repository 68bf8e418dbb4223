use super::{owning_store, Checks, CmdMessage, CmdResult};
use crate::config::FolioConfig;
use crate::error::Result;
use crate::model::{DocId, Page};
use crate::workgroup::Workgroup;

/// Gives the opened document a new display name.
pub fn run(
    group: &Workgroup,
    config: &FolioConfig,
    opened: Option<&Page>,
    id: DocId,
    new_name: &str,
) -> Result<CmdResult> {
    let mut checks = Checks::default();
    checks.name(new_name);
    checks.opened(opened, id);
    let Some(opened) = opened.filter(|page| page.id() == id) else {
        return Ok(checks.into_result());
    };

    let store = owning_store(group, opened)?;
    checks.writable(&store)?;
    checks.unique_name(&store, new_name, Some(id), config.allow_duplicate_names)?;
    if !checks.is_clean() {
        return Ok(checks.into_result());
    }

    let mut page = store.read(id)?;
    let old_name = std::mem::replace(&mut page.meta.name, new_name.to_string());
    if !store.update(&page)? {
        return Ok(CmdResult::done(
            page,
            CmdMessage::info(format!("{old_name} already has that name")),
        ));
    }

    let page = store.read(id)?;
    let message = CmdMessage::success(format!("Renamed {old_name} to {}", page.meta.name));
    Ok(CmdResult::done(page, message))
}
