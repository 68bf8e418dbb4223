use super::{owning_store, Checks, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{DocId, Page};
use crate::workgroup::Workgroup;

/// Replaces the body of the opened document.
pub fn run(group: &Workgroup, opened: Option<&Page>, id: DocId, body: &str) -> Result<CmdResult> {
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

    let mut page = store.read(id)?;
    page.body = body.to_string();
    let changed = store.update(&page)?;
    let page = store.read(id)?;

    let message = if changed {
        CmdMessage::success(format!("Saved {}", page.meta.name))
    } else {
        CmdMessage::info(format!("No changes to {}", page.meta.name))
    };
    Ok(CmdResult::done(page, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn saves_body_and_records_revision() {
        let (_dir, group) = fixtures::group(&["a"]);
        let stores = group.enabled_in_order();
        let store = &stores[0];
        let page = store.create("note", "v1", None).unwrap();

        let result = run(&group, Some(&page), page.id(), "v2").unwrap();
        assert!(result.success);
        assert_eq!(result.affected.unwrap().body, "v2");
        assert_eq!(store.revision_count(page.id()).unwrap(), 1);
    }

    #[test]
    fn unchanged_body_succeeds_without_revision() {
        let (_dir, group) = fixtures::group(&["a"]);
        let stores = group.enabled_in_order();
        let store = &stores[0];
        let page = store.create("note", "same", None).unwrap();

        let result = run(&group, Some(&page), page.id(), "same").unwrap();
        assert!(result.success);
        assert!(result.notification.content.starts_with("No changes"));
        assert_eq!(store.revision_count(page.id()).unwrap(), 0);
    }

    #[test]
    fn unopened_document_is_rejected() {
        let (_dir, group) = fixtures::group(&["a"]);
        let stores = group.enabled_in_order();
        let store = &stores[0];
        let page = store.create("note", "v1", None).unwrap();
        let other = store.create("other", "", None).unwrap();

        let result = run(&group, Some(&other), page.id(), "v2").unwrap();
        assert!(!result.success);
        assert!(result.validation_errors[0].contains("not opened"));

        let result = run(&group, None, page.id(), "v2").unwrap();
        assert!(!result.success);
        assert_eq!(store.read(page.id()).unwrap().body, "v1");
    }
}
