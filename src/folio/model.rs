use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

pub type Tags = BTreeMap<String, String>;

/// Current time at the precision the stores persist (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Stable identity of a document across revisions and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(Uuid);

impl DocId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for DocId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Back-reference from a listed document to the store it came from.
///
/// A store is identified by its file path; the store object itself is
/// cheap to re-create, so rows carry the path rather than the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreRef(Arc<PathBuf>);

impl StoreRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::new(path.into()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Index-only view of a document. Listings and searches return these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: DocId,
    pub name: String,
    pub slot: i64,
    pub tags: Option<Tags>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub erased: bool,
    #[serde(skip)]
    pub owner: Option<StoreRef>,
}

impl Content {
    pub fn new(name: String, tags: Option<Tags>) -> Self {
        let now = now();
        Self {
            id: DocId::new(),
            name,
            slot: 1,
            tags,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            created_at: now,
            updated_at: now,
            erased: false,
            owner: None,
        }
    }

    pub fn tag_string(&self) -> String {
        tag_string(self.tags.as_ref())
    }
}

/// Full view of a document, body included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub meta: Content,
    pub body: String,
}

impl Page {
    pub fn new(name: String, body: String, tags: Option<Tags>) -> Self {
        Self {
            meta: Content::new(name, tags),
            body,
        }
    }

    pub fn id(&self) -> DocId {
        self.meta.id
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn tag_string(&self) -> String {
        self.meta.tag_string()
    }

    pub fn into_content(self) -> Content {
        self.meta
    }
}

impl From<Page> for Content {
    fn from(page: Page) -> Self {
        page.meta
    }
}

/// Serializes tags deterministically. No tags and an empty map both map to "".
pub fn tag_string(tags: Option<&Tags>) -> String {
    match tags {
        Some(map) if !map.is_empty() => serde_json::to_string(map).unwrap_or_default(),
        _ => String::new(),
    }
}

pub fn parse_tags(raw: &str) -> Result<Option<Tags>, serde_json::Error> {
    if raw.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw).map(Some)
}

/// Store-level metadata, kept as key/value pairs inside the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub name: String,
    pub title: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub read_only: bool,
    pub tag: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub location: PathBuf,
}

impl NoteInfo {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            author: String::new(),
            read_only: false,
            tag: String::new(),
            created_at: now(),
            location: PathBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tags_serialize_to_empty_string() {
        assert_eq!(tag_string(None), "");
        assert_eq!(tag_string(Some(&Tags::new())), "");
        assert_eq!(parse_tags("").unwrap(), None);
    }

    #[test]
    fn tag_string_is_key_ordered() {
        let mut tags = Tags::new();
        tags.insert("zeta".into(), "1".into());
        tags.insert("alpha".into(), "2".into());
        let raw = tag_string(Some(&tags));
        assert_eq!(raw, r#"{"alpha":"2","zeta":"1"}"#);
        assert_eq!(parse_tags(&raw).unwrap(), Some(tags));
    }

    #[test]
    fn page_drops_body_into_content() {
        let page = Page::new("Title".into(), "Body".into(), None);
        let id = page.id();
        let content: Content = page.into();
        assert_eq!(content.id, id);
        assert_eq!(content.slot, 1);
        assert!(!content.erased);
    }

    #[test]
    fn doc_id_parses_its_display_form() {
        let id = DocId::new();
        assert_eq!(id.to_string().parse::<DocId>().unwrap(), id);
    }
}
