//! Ordered file list synchronizer.
//!
//! A [`FileList`] holds one owner's files in display order. Reordering is
//! applied locally at once and persisted in the background; tag, delete,
//! link and upload operations wait for the remote store and then apply its
//! answer. The remote store stays the authority for record contents and
//! persisted order.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use kernel::FileRecord;
use tokio::task::JoinHandle;

use crate::error::{ErrorKind, Result, SyncError, TransportError};
use crate::order;
use crate::store::{RemoteFileStore, TransportResult};

/// What to do with the local order when persisting it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderFailurePolicy {
    /// Keep the optimistic order until the next load.
    #[default]
    Keep,
    /// Restore the last order acknowledged by the remote store.
    Rollback,
}

/// How a freshly generated share link reaches the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkRefresh {
    /// Set the link on the local record.
    #[default]
    Patch,
    /// Fetch the whole list again.
    Reload,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub order_failure: OrderFailurePolicy,
    pub link_refresh: LinkRefresh,
}

#[derive(Default)]
struct ListState {
    items: Vec<FileRecord>,
    /// Last order the remote store acknowledged (or returned on load).
    confirmed_order: Vec<String>,
    pending: usize,
    last_error: Option<ErrorKind>,
    /// Generation of the newest dispatched order persist.
    dispatched: u64,
    /// Generation of the newest order persist that got any answer.
    settled: u64,
}

type SharedState = Arc<Mutex<ListState>>;

fn lock(state: &Mutex<ListState>) -> MutexGuard<'_, ListState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts one in-flight operation for as long as it lives.
struct PendingGuard {
    state: Weak<Mutex<ListState>>,
}

impl PendingGuard {
    fn attach(state: &SharedState) -> Self {
        lock(state).pending += 1;
        Self {
            state: Arc::downgrade(state),
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut s = lock(&state);
            s.pending = s.pending.saturating_sub(1);
        }
    }
}

/// Background persistence of one reorder.
///
/// Dropping the handle does not cancel the persistence.
#[derive(Debug)]
pub struct OrderSync {
    generation: u64,
    handle: JoinHandle<Result<()>>,
}

impl OrderSync {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the remote store to answer.
    pub async fn wait(self) -> Result<()> {
        self.handle.await.unwrap_or_else(|e| {
            tracing::warn!("order persist {} did not finish: {e}", self.generation);
            Err(SyncError::Closed)
        })
    }
}

/// One owner's ordered file list.
pub struct FileList {
    store: Arc<dyn RemoteFileStore>,
    token: String,
    options: SyncOptions,
    state: SharedState,
}

impl FileList {
    /// Creates an empty list for the owner identified by `token`.
    pub fn new(store: Arc<dyn RemoteFileStore>, token: impl Into<String>, options: SyncOptions) -> Self {
        Self {
            store,
            token: token.into(),
            options,
            state: SharedState::default(),
        }
    }

    /// Snapshot of the records in display order.
    #[must_use]
    pub fn items(&self) -> Vec<FileRecord> {
        lock(&self.state).items.clone()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending > 0
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ErrorKind> {
        lock(&self.state).last_error
    }

    /// Dismisses the last error.
    pub fn clear_error(&self) {
        lock(&self.state).last_error = None;
    }

    #[must_use]
    pub fn find_by_filename(&self, filename: &str) -> Option<FileRecord> {
        lock(&self.state)
            .items
            .iter()
            .find(|r| r.filename == filename)
            .cloned()
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<FileRecord> {
        lock(&self.state).items.iter().find(|r| r.id == id).cloned()
    }

    /// Replaces the list with the remote store's current one. Unconfirmed
    /// local edits are discarded.
    pub async fn load(&self) -> Result<()> {
        let _pending = PendingGuard::attach(&self.state);
        let result = self.store.list_files(&self.token).await;
        match result {
            Ok(files) => {
                self.replace_items(files);
                Ok(())
            }
            Err(e) => Err(self.fail(ErrorKind::FetchFailed, e)),
        }
    }

    /// Moves record `moved` onto the position of record `target` right away
    /// and persists the new order in the background.
    ///
    /// Returns `Ok(None)`, without contacting the remote store, when the ids
    /// are equal or either one is not in the list. Outside a tokio runtime
    /// nothing is moved and [`SyncError::NoRuntime`] is returned.
    pub fn reorder(&self, moved: &str, target: &str) -> Result<Option<OrderSync>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            tracing::error!("cannot persist order: {e}");
            SyncError::NoRuntime
        })?;
        let pending = PendingGuard::attach(&self.state);
        let (sent, generation) = {
            let mut s = lock(&self.state);
            let Some(items) = order::move_record(&s.items, moved, target) else {
                return Ok(None);
            };
            s.items = items;
            s.dispatched += 1;
            (order::order_of(&s.items), s.dispatched)
        };
        tracing::debug!("reorder {moved} onto {target}, persist generation {generation}");

        let store = Arc::clone(&self.store);
        let token = self.token.clone();
        let state = Arc::downgrade(&self.state);
        let policy = self.options.order_failure;
        let handle = runtime.spawn(async move {
            let _pending = pending;
            let result = store.persist_order(&sent, &token).await;
            settle_order(&state, generation, sent, policy, result)
        });
        Ok(Some(OrderSync { generation, handle }))
    }

    /// Adds `tag` to the file's tag set. Blank tags are ignored.
    pub async fn add_tag(&self, filename: &str, tag: &str) -> Result<()> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(());
        }
        let tags = order::with_tag(&self.existing(filename)?.tags, tag);
        self.update_tags(filename, tags).await
    }

    /// Removes `tag` from the file's tag set. The update is sent even if the
    /// tag was not there.
    pub async fn remove_tag(&self, filename: &str, tag: &str) -> Result<()> {
        let tags = order::without_tag(&self.existing(filename)?.tags, tag);
        self.update_tags(filename, tags).await
    }

    /// Deletes the file. The record stays in the list until the remote
    /// store confirms. Asking the user is up to the caller.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        self.existing(filename)?;
        let _pending = PendingGuard::attach(&self.state);
        match self.store.delete_file(filename, &self.token).await {
            Ok(()) => {
                let mut guard = lock(&self.state);
                let s = &mut *guard;
                order::remove_by_filename(&mut s.items, filename);
                s.confirmed_order.retain(|id| order::position_by_id(&s.items, id).is_some());
                s.last_error = None;
                tracing::info!("deleted {filename}");
                Ok(())
            }
            Err(e) => Err(self.fail(ErrorKind::DeleteFailed, e)),
        }
    }

    /// Creates a public link for record `id` and returns it.
    pub async fn generate_link(&self, id: &str) -> Result<String> {
        if self.find_by_id(id).is_none() {
            return Err(SyncError::NotFound(id.to_string()));
        }
        let _pending = PendingGuard::attach(&self.state);
        let link = match self.store.generate_link(id, &self.token).await {
            Ok(link) => link,
            Err(e) => return Err(self.fail(ErrorKind::LinkGenerationFailed, e)),
        };
        tracing::info!("shared {id} as {link}");

        match self.options.link_refresh {
            LinkRefresh::Patch => {
                let mut s = lock(&self.state);
                if let Some(record) = s.items.iter_mut().find(|r| r.id == id) {
                    record.shared_link = Some(link.clone());
                }
                s.last_error = None;
            }
            LinkRefresh::Reload => match self.store.list_files(&self.token).await {
                Ok(files) => self.replace_items(files),
                Err(e) => return Err(self.fail(ErrorKind::FetchFailed, e)),
            },
        }
        Ok(link)
    }

    /// Uploads files with the given tags and reloads the list.
    pub async fn upload(&self, files: &[PathBuf], tags: &[String]) -> Result<()> {
        let tags = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .fold(Vec::new(), |acc: Vec<String>, t| order::with_tag(&acc, t));

        let _pending = PendingGuard::attach(&self.state);
        if let Err(e) = self.store.upload(files, &tags, &self.token).await {
            return Err(self.fail(ErrorKind::UploadFailed, e));
        }
        tracing::info!("uploaded {} file(s)", files.len());

        match self.store.list_files(&self.token).await {
            Ok(files) => {
                self.replace_items(files);
                Ok(())
            }
            Err(e) => Err(self.fail(ErrorKind::FetchFailed, e)),
        }
    }

    async fn update_tags(&self, filename: &str, tags: Vec<String>) -> Result<()> {
        let _pending = PendingGuard::attach(&self.state);
        match self.store.update_tags(filename, &tags, &self.token).await {
            Ok(record) => {
                let mut s = lock(&self.state);
                if !order::replace_by_filename(&mut s.items, record) {
                    tracing::warn!("updated file {filename} is no longer in the list");
                }
                s.last_error = None;
                tracing::info!("tags of {filename}: {tags:?}");
                Ok(())
            }
            Err(e) => Err(self.fail(ErrorKind::TagUpdateFailed, e)),
        }
    }

    fn existing(&self, filename: &str) -> Result<FileRecord> {
        self.find_by_filename(filename)
            .ok_or_else(|| SyncError::NotFound(filename.to_string()))
    }

    fn replace_items(&self, files: Vec<FileRecord>) {
        let (files, dropped) = order::distinct(files);
        if dropped > 0 {
            tracing::warn!("ignored {dropped} duplicate file record(s)");
        }
        let mut s = lock(&self.state);
        s.confirmed_order = order::order_of(&files);
        s.items = files;
        s.last_error = None;
        tracing::info!("loaded {} file(s)", s.items.len());
    }

    fn fail(&self, kind: ErrorKind, source: TransportError) -> SyncError {
        tracing::error!("{kind}: {source}");
        lock(&self.state).last_error = Some(kind);
        SyncError::remote(kind, source)
    }
}

fn settle_order(
    state: &Weak<Mutex<ListState>>,
    generation: u64,
    sent: Vec<String>,
    policy: OrderFailurePolicy,
    result: TransportResult<()>,
) -> Result<()> {
    let Some(state) = state.upgrade() else {
        tracing::warn!("file list closed, order persist {generation} result ignored");
        return result.map_err(|e| SyncError::remote(ErrorKind::OrderSyncFailed, e));
    };
    let mut guard = lock(&state);
    let s = &mut *guard;
    if generation <= s.settled {
        tracing::warn!(
            "order persist {generation} answered after {}, ignored",
            s.settled
        );
        return result.map_err(|e| SyncError::remote(ErrorKind::OrderSyncFailed, e));
    }
    s.settled = generation;

    match result {
        Ok(()) => {
            s.confirmed_order = sent;
            s.last_error = None;
            tracing::info!("order persist {generation} acknowledged");
            Ok(())
        }
        Err(e) => {
            if generation == s.dispatched {
                tracing::error!("{}: {e}", ErrorKind::OrderSyncFailed);
                s.last_error = Some(ErrorKind::OrderSyncFailed);
                if policy == OrderFailurePolicy::Rollback {
                    let items = std::mem::take(&mut s.items);
                    s.items = order::arrange(items, &s.confirmed_order);
                }
            } else {
                tracing::warn!("order persist {generation} failed but is superseded: {e}");
            }
            Err(SyncError::remote(ErrorKind::OrderSyncFailed, e))
        }
    }
}
