use chrono::Utc;

use crate::{
    api::{self, CommentId, CommentRecord, Scope, UserProfile},
    build_tree, remove_in,
    tree::{Node, TreeRecord},
    FetchGenerations, ListKey, Ticket,
};

impl TreeRecord for CommentRecord {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.id
    }

    fn parent_id(&self) -> Option<CommentId> {
        self.parent_id
    }
}

pub type CommentNode = Node<CommentRecord>;

/// Errors reported at the action boundary, for the presentation layer to
/// show as transient feedback. None of these escape as panics.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("comment {0:?} is still saving, wait for it to be confirmed")]
    StillSaving(CommentId),

    #[error("comment {0:?} is not in the current thread")]
    TargetNotFound(CommentId),

    #[error("could not resolve the module owning comment {0:?}")]
    UnresolvedScope(CommentId),

    #[error("the server rejected the request: {0}")]
    Backend(#[from] api::Error),

    #[error("request failed: {0}")]
    Network(#[source] anyhow::Error),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListState {
    /// Nothing fetched yet
    Idle,
    /// Initial load (or user-visible refresh) in flight
    Fetching,
    /// Showing a tree, possibly with pending optimistic nodes in it
    Ready,
    /// Silent refetch after a failed mutation; no loading indicator
    Reconciling,
    /// The fetch failed; empty/error display, no automatic retry
    Failed,
}

/// What `commit_fetch` did with a response.
#[derive(Debug)]
pub enum FetchOutcome {
    Committed,
    /// A newer fetch was issued for this list in the meantime; the response
    /// was dropped without touching any state. Expected, not an error.
    Stale,
    Failed(anyhow::Error),
}

/// In-memory state of one comment list-view: the reply forest plus the
/// bookkeeping needed to apply optimistic mutations and to ignore responses
/// from superseded fetches.
///
/// All mutations here are synchronous; [`crate::ThreadView`] drives the
/// network side and feeds results back in.
pub struct ThreadStore {
    key: ListKey,
    comments: Vec<CommentNode>,
    state: ListState,
    generations: FetchGenerations,
}

impl ThreadStore {
    pub fn new(key: ListKey) -> ThreadStore {
        ThreadStore {
            key,
            comments: Vec::new(),
            state: ListState::Idle,
            generations: FetchGenerations::new(),
        }
    }

    pub fn key(&self) -> ListKey {
        self.key
    }

    pub fn comments(&self) -> &[CommentNode] {
        &self.comments
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ListState::Fetching
    }

    /// Register a new fetch as the current one for this list.
    ///
    /// The ticket must be captured before the request is awaited: the
    /// compare at commit time is what keeps interleaved responses from
    /// clobbering fresher state.
    pub fn begin_fetch(&mut self) -> Ticket {
        self.state = match self.state {
            // After a mutation failure the refetch is silent: keep showing
            // the (possibly wrong) tree rather than flashing a spinner.
            ListState::Ready | ListState::Reconciling => ListState::Reconciling,
            _ => ListState::Fetching,
        };
        self.generations.begin(self.key)
    }

    /// Apply the outcome of the fetch identified by `ticket`.
    ///
    /// A ticket superseded by a newer `begin_fetch` is discarded outright:
    /// no state change, no error surfaced, a debug line at most.
    pub fn commit_fetch(
        &mut self,
        ticket: Ticket,
        result: anyhow::Result<Vec<CommentRecord>>,
    ) -> FetchOutcome {
        if !self.generations.is_current(&ticket) {
            tracing::debug!(?ticket, "dropping response from superseded fetch");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(records) => {
                self.comments = build_tree(&records);
                self.state = ListState::Ready;
                FetchOutcome::Committed
            }
            Err(err) => {
                tracing::warn!(key = ?self.key, ?err, "fetching comment list failed");
                self.comments.clear();
                self.state = ListState::Failed;
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Insert a new top-level comment optimistically, before any network
    /// call is dispatched. Returns the temporary id of the pending node.
    pub fn apply_create(&mut self, scope: Scope, profile: &UserProfile, body: String) -> CommentId {
        let record = pending_record(scope, None, profile, body);
        let id = record.id;
        self.comments.insert(0, Node::pending(record));
        id
    }

    /// Insert a reply under `target` optimistically.
    ///
    /// Returns the temporary id and the scope the network call must go to:
    /// in the aggregated all-modules view that is the module owning the
    /// target, read off the target's own record. Refusals (pending target,
    /// unknown target, unresolvable scope) happen before any tree edit.
    pub fn apply_reply(
        &mut self,
        target: CommentId,
        profile: &UserProfile,
        body: String,
    ) -> Result<(CommentId, Scope), StoreError> {
        let aggregated = matches!(self.key, ListKey::AllModules(_));
        let parent = Node::find_in(&mut self.comments, &target)
            .ok_or(StoreError::TargetNotFound(target))?;
        if parent.is_pending() {
            return Err(StoreError::StillSaving(target));
        }
        let scope = parent.record.scope;
        if aggregated && !matches!(scope, Scope::Module(_)) {
            return Err(StoreError::UnresolvedScope(target));
        }
        let record = pending_record(scope, Some(target), profile, body);
        let id = record.id;
        parent.replies.push(Node::pending(record));
        Ok((id, scope))
    }

    /// Detach `target` and its whole reply subtree optimistically, returning
    /// the removed node (the caller needs its scope for the network call).
    pub fn apply_delete(&mut self, target: CommentId) -> Result<CommentNode, StoreError> {
        match Node::get_in(&self.comments, &target) {
            None => return Err(StoreError::TargetNotFound(target)),
            Some(n) if n.is_pending() => return Err(StoreError::StillSaving(target)),
            Some(_) => (),
        }
        remove_in(&mut self.comments, &target).ok_or(StoreError::TargetNotFound(target))
    }

    /// Swap the server-confirmed record in for a temporary node once its
    /// create/reply call succeeds. The node keeps its position and replies;
    /// only the record (real id, server timestamp) and status change, so the
    /// temporary id never outlives the request that created it.
    pub fn confirm_created(&mut self, temp_id: CommentId, record: CommentRecord) {
        match Node::find_in(&mut self.comments, &temp_id) {
            Some(node) => {
                node.record = record;
                node.status = crate::SyncStatus::Confirmed;
            }
            // A refetch may have replaced the tree while the call was in
            // flight; the server truth is already displayed then.
            None => tracing::debug!(?temp_id, "confirmed comment no longer in tree"),
        }
    }
}

fn pending_record(
    scope: Scope,
    parent_id: Option<CommentId>,
    profile: &UserProfile,
    body: String,
) -> CommentRecord {
    CommentRecord {
        id: CommentId::generate(),
        parent_id,
        author: profile.author(),
        body,
        created_at: Utc::now(),
        scope,
    }
}
