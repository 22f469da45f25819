use async_trait::async_trait;
use futures::future;

use crate::{
    api::{CommentId, CommentRecord, CourseId, ModuleId, NewComment, NewReply, Scope, UserProfile},
    store::{CommentNode, FetchOutcome, ListState, StoreError, ThreadStore},
    ListKey,
};

/// The backend surface the reconciler drives.
///
/// All calls are asynchronous and fallible, with no ordering guarantee
/// between them beyond normal request/response pairing. Create and reply
/// return the stored record so the client can swap real ids in for
/// temporary ones.
#[async_trait]
pub trait CommentApi {
    async fn list_modules(&self, course: CourseId) -> anyhow::Result<Vec<ModuleId>>;
    async fn list_comments(&self, scope: Scope) -> anyhow::Result<Vec<CommentRecord>>;
    async fn create_comment(&self, scope: Scope, data: NewComment) -> anyhow::Result<CommentRecord>;
    async fn reply_to_comment(&self, scope: Scope, data: NewReply) -> anyhow::Result<CommentRecord>;
    async fn delete_comment(&self, scope: Scope, comment: CommentId) -> anyhow::Result<()>;
}

/// One comment list-view: a [`ThreadStore`] plus the network plumbing that
/// keeps it eventually consistent with the backend.
///
/// Every mutation is applied to the in-memory tree before its network call
/// is dispatched. Success keeps the optimistic edit (with the server record
/// swapped in); failure reports the error and silently refetches the whole
/// list, dropping the optimistic guess along with any other drift.
pub struct ThreadView<A> {
    profile: UserProfile,
    api: A,
    store: ThreadStore,
}

impl<A: CommentApi> ThreadView<A> {
    pub fn new(key: ListKey, profile: UserProfile, api: A) -> ThreadView<A> {
        ThreadView {
            profile,
            api,
            store: ThreadStore::new(key),
        }
    }

    pub fn comments(&self) -> &[CommentNode] {
        self.store.comments()
    }

    pub fn state(&self) -> ListState {
        self.store.state()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Initial load. On failure the view stays in the failed state; there is
    /// no automatic retry, the user retriggers navigation to try again.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        self.fetch().await
    }

    /// User-triggered refresh of the current list.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        self.fetch().await
    }

    /// Post a new top-level comment under `scope`.
    ///
    /// The pending node is in the tree before this function first awaits.
    /// Returns the server-assigned id on success.
    pub async fn create_comment(
        &mut self,
        scope: Scope,
        body: String,
    ) -> Result<CommentId, StoreError> {
        let data = NewComment { body: body.clone() };
        data.validate()?;
        let temp_id = self.store.apply_create(scope, &self.profile, body);
        match self.api.create_comment(scope, data).await {
            Ok(record) => {
                let id = record.id;
                self.store.confirm_created(temp_id, record);
                Ok(id)
            }
            Err(err) => {
                self.reconcile().await;
                Err(StoreError::Network(err))
            }
        }
    }

    /// Post a reply under `target`, wherever it sits in the tree.
    ///
    /// In the aggregated all-modules view the call is routed to the module
    /// owning the target; if that module cannot be resolved the action is
    /// refused outright, with no optimistic edit, no network call and no
    /// refetch. A target that is itself still saving is refused the same
    /// way.
    pub async fn reply_to_comment(
        &mut self,
        target: CommentId,
        body: String,
    ) -> Result<CommentId, StoreError> {
        let data = NewReply {
            parent_id: target,
            body: body.clone(),
        };
        data.validate()?;
        let (temp_id, scope) = self.store.apply_reply(target, &self.profile, body)?;
        match self.api.reply_to_comment(scope, data).await {
            Ok(record) => {
                let id = record.id;
                self.store.confirm_created(temp_id, record);
                Ok(id)
            }
            Err(err) => {
                self.reconcile().await;
                Err(StoreError::Network(err))
            }
        }
    }

    /// Delete `target` and its whole reply subtree.
    pub async fn delete_comment(&mut self, target: CommentId) -> Result<(), StoreError> {
        let removed = self.store.apply_delete(target)?;
        match self.api.delete_comment(removed.record.scope, target).await {
            Ok(()) => Ok(()),
            Err(err) => {
                // Restore whatever was wrongly removed from server truth
                self.reconcile().await;
                Err(StoreError::Network(err))
            }
        }
    }

    async fn fetch(&mut self) -> Result<(), StoreError> {
        // Capture the ticket before the await, check it after: callbacks can
        // interleave at await points and a newer fetch may have started.
        let ticket = self.store.begin_fetch();
        let result = self.fetch_flat().await;
        match self.store.commit_fetch(ticket, result) {
            FetchOutcome::Committed | FetchOutcome::Stale => Ok(()),
            FetchOutcome::Failed(err) => Err(StoreError::Network(err)),
        }
    }

    /// The silent refetch reconciling local state after a failed mutation.
    /// Its own failure is only logged; the mutation's error is what the
    /// caller gets to see.
    async fn reconcile(&mut self) {
        if let Err(err) = self.fetch().await {
            tracing::warn!(key = ?self.store.key(), %err, "reconciliation refetch failed");
        }
    }

    async fn fetch_flat(&self) -> anyhow::Result<Vec<CommentRecord>> {
        match self.store.key() {
            ListKey::Course(course) => self.api.list_comments(Scope::Course(course)).await,
            ListKey::Module(module) => self.api.list_comments(Scope::Module(module)).await,
            ListKey::AllModules(course) => {
                // One ticket covers all per-module fetches; the aggregate is
                // committed only if it is still current once the last one
                // resolved.
                let modules = self.api.list_modules(course).await?;
                let lists = future::try_join_all(
                    modules
                        .into_iter()
                        .map(|m| self.api.list_comments(Scope::Module(m))),
                )
                .await?;
                Ok(lists.into_iter().flatten().collect())
            }
        }
    }
}
