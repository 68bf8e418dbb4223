//! Cancellable async variants of the store operations.
//!
//! Each call clones the store (a path and a cache cell), runs the
//! synchronous operation on tokio's blocking pool and checks the token
//! before and after, so a superseded caller never sees a stale result.

use super::{NoteStore, SearchMethod, SearchPage};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::model::{DocId, Page, Tags};
use crate::query::SearchSpec;

impl NoteStore {
    async fn blocking<T, F>(&self, cancel: &CancelToken, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(NoteStore) -> Result<T> + Send + 'static,
    {
        cancel.check()?;
        let store = self.clone();
        let out = tokio::task::spawn_blocking(move || op(store)).await??;
        cancel.check()?;
        Ok(out)
    }

    pub async fn read_async(&self, id: DocId, cancel: &CancelToken) -> Result<Page> {
        self.blocking(cancel, move |store| store.read(id)).await
    }

    pub async fn read_slot_async(
        &self,
        name: &str,
        slot: i64,
        cancel: &CancelToken,
    ) -> Result<Option<Page>> {
        let name = name.to_string();
        self.blocking(cancel, move |store| store.read_slot(&name, slot))
            .await
    }

    pub async fn read_all_with_name_async(
        &self,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Page>> {
        let name = name.to_string();
        self.blocking(cancel, move |store| store.read_all_with_name(&name))
            .await
    }

    pub async fn create_async(
        &self,
        name: &str,
        body: &str,
        tags: Option<Tags>,
        cancel: &CancelToken,
    ) -> Result<Page> {
        let (name, body) = (name.to_string(), body.to_string());
        self.blocking(cancel, move |store| store.create(&name, &body, tags))
            .await
    }

    pub async fn update_async(&self, page: &Page, cancel: &CancelToken) -> Result<bool> {
        let page = page.clone();
        self.blocking(cancel, move |store| store.update(&page)).await
    }

    pub async fn delete_async(&self, id: DocId, cancel: &CancelToken) -> Result<()> {
        self.blocking(cancel, move |store| store.delete(id)).await
    }

    pub async fn search_async(
        &self,
        spec: &SearchSpec,
        method: SearchMethod,
        skip: usize,
        take: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage> {
        let spec = spec.clone();
        self.blocking(cancel, move |store| store.search(&spec, method, skip, take))
            .await
    }

    pub async fn count_async(
        &self,
        spec: &SearchSpec,
        method: SearchMethod,
        cancel: &CancelToken,
    ) -> Result<usize> {
        let spec = spec.clone();
        self.blocking(cancel, move |store| store.count(&spec, method))
            .await
    }

    pub async fn search_by_heading_async(
        &self,
        spec: &SearchSpec,
        skip: usize,
        take: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage> {
        self.search_async(spec, SearchMethod::Heading, skip, take, cancel)
            .await
    }

    pub async fn search_full_text_async(
        &self,
        spec: &SearchSpec,
        skip: usize,
        take: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage> {
        self.search_async(spec, SearchMethod::FullText, skip, take, cancel)
            .await
    }

    /// Collects up to `limit` snapshots from [`history_of`](Self::history_of).
    pub async fn history_async(
        &self,
        id: DocId,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Page>> {
        self.blocking(cancel, move |store| {
            store.history_of(id)?.take(limit).collect()
        })
        .await
    }
}
