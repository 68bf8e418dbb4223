use crate::cancel::CancelToken;
use crate::error::Result;
use crate::model::Content;
use crate::query::SearchSpec;
use crate::store::SearchMethod;
use crate::workgroup::{PageRange, SearchScope, Workgroup};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub method: SearchMethod,
    pub scope: SearchScope,
    pub range: PageRange,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, method: SearchMethod, range: PageRange) -> Self {
        Self {
            query: query.into(),
            method,
            scope: SearchScope::All,
            range,
        }
    }

    pub fn with_range(&self, range: PageRange) -> Self {
        Self {
            range,
            ..self.clone()
        }
    }
}

/// One delivered page of results for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub request: SearchRequest,
    pub rows: Vec<Content>,
    pub total: usize,
}

impl SearchOutcome {
    pub fn has_next(&self) -> bool {
        self.request.range.skip.saturating_add(self.rows.len()) < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.request.range.skip > 0
    }
}

pub async fn run(
    group: &Workgroup,
    request: SearchRequest,
    cancel: &CancelToken,
) -> Result<SearchOutcome> {
    let spec = SearchSpec::compile(&request.query);
    debug!(
        "Searching {:?} ({:?}, {:?}) window {}+{}",
        request.query, spec.tier(), request.method, request.range.skip, request.range.take
    );

    let page = group
        .search_async(&spec, request.method, request.scope, request.range, cancel)
        .await?;

    Ok(SearchOutcome {
        request,
        rows: page.rows,
        total: page.total,
    })
}
