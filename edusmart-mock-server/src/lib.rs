use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use edusmart_client::{
    api::{
        self, CommentId, CommentRecord, CourseId, Error, ModuleId, NewComment, NewReply, Scope,
        UserProfile,
    },
    CommentApi,
};

/// Which backend operation a call or an injected failure refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Op {
    ListModules,
    ListComments,
    CreateComment,
    ReplyToComment,
    DeleteComment,
}

/// An in-memory stand-in for the comments backend, for tests.
///
/// Holds flat per-scope comment lists exactly the way the real endpoints
/// return them, plus switches to make the next call of a given operation
/// fail, so reconciliation paths can be exercised.
pub struct MockServer {
    inner: Mutex<Inner>,
}

struct Inner {
    // The authenticated user every mutation is attributed to
    user: UserProfile,
    courses: BTreeMap<CourseId, Vec<ModuleId>>,
    comments: HashMap<Scope, Vec<CommentRecord>>,
    fail_next: Vec<Op>,
    calls: Vec<Op>,
}

impl MockServer {
    pub fn new(user: UserProfile) -> MockServer {
        MockServer {
            inner: Mutex::new(Inner {
                user,
                courses: BTreeMap::new(),
                comments: HashMap::new(),
                fail_next: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock server lock poisoned")
    }

    pub fn admin_create_course(&self, course: CourseId) {
        let mut inner = self.lock();
        inner.courses.insert(course, Vec::new());
        inner.comments.insert(Scope::Course(course), Vec::new());
    }

    pub fn admin_create_module(&self, course: CourseId, module: ModuleId) -> Result<(), Error> {
        let mut inner = self.lock();
        inner
            .courses
            .get_mut(&course)
            .ok_or(Error::ScopeNotFound(course.0))?
            .push(module);
        inner.comments.insert(Scope::Module(module), Vec::new());
        Ok(())
    }

    /// Seed a comment directly, bypassing the client-facing calls.
    pub fn admin_add_comment(&self, record: CommentRecord) -> Result<(), Error> {
        let mut inner = self.lock();
        let scope = record.scope;
        inner
            .comments
            .get_mut(&scope)
            .ok_or(Error::ScopeNotFound(scope_uuid(scope)))?
            .push(record);
        Ok(())
    }

    /// Make the next call of `op` fail with an internal error.
    pub fn fail_next(&self, op: Op) {
        self.lock().fail_next.push(op);
    }

    /// How many calls of `op` the server has seen so far.
    pub fn test_num_calls(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// The flat comment list a fetch of `scope` would currently return.
    pub fn test_comments(&self, scope: Scope) -> Vec<CommentRecord> {
        self.lock().comments.get(&scope).cloned().unwrap_or_default()
    }

    fn enter(&self, op: Op) -> Result<std::sync::MutexGuard<'_, Inner>, Error> {
        let mut inner = self.lock();
        inner.calls.push(op);
        if let Some(pos) = inner.fail_next.iter().position(|f| *f == op) {
            inner.fail_next.remove(pos);
            return Err(Error::Unknown(format!("injected failure for {op:?}")));
        }
        Ok(inner)
    }
}

fn scope_uuid(scope: Scope) -> api::Uuid {
    match scope {
        Scope::Course(c) => c.0,
        Scope::Module(m) => m.0,
    }
}

impl Inner {
    fn scope_comments(&mut self, scope: Scope) -> Result<&mut Vec<CommentRecord>, Error> {
        self.comments
            .get_mut(&scope)
            .ok_or(Error::ScopeNotFound(scope_uuid(scope)))
    }

    fn insert_comment(
        &mut self,
        scope: Scope,
        parent_id: Option<CommentId>,
        body: String,
    ) -> Result<CommentRecord, Error> {
        let author = self.user.author();
        let list = self.scope_comments(scope)?;
        if let Some(parent) = parent_id {
            if !list.iter().any(|c| c.id == parent) {
                return Err(Error::CommentNotFound(parent.0));
            }
        }
        let record = CommentRecord {
            id: CommentId::generate(),
            parent_id,
            author,
            body,
            created_at: Utc::now(),
            scope,
        };
        list.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CommentApi for MockServer {
    async fn list_modules(&self, course: CourseId) -> anyhow::Result<Vec<ModuleId>> {
        let inner = self.enter(Op::ListModules)?;
        Ok(inner
            .courses
            .get(&course)
            .ok_or(Error::ScopeNotFound(course.0))?
            .clone())
    }

    async fn list_comments(&self, scope: Scope) -> anyhow::Result<Vec<CommentRecord>> {
        let mut inner = self.enter(Op::ListComments)?;
        Ok(inner.scope_comments(scope)?.clone())
    }

    async fn create_comment(
        &self,
        scope: Scope,
        data: NewComment,
    ) -> anyhow::Result<CommentRecord> {
        data.validate()?;
        let mut inner = self.enter(Op::CreateComment)?;
        Ok(inner.insert_comment(scope, None, data.body)?)
    }

    async fn reply_to_comment(
        &self,
        scope: Scope,
        data: NewReply,
    ) -> anyhow::Result<CommentRecord> {
        data.validate()?;
        let mut inner = self.enter(Op::ReplyToComment)?;
        Ok(inner.insert_comment(scope, Some(data.parent_id), data.body)?)
    }

    async fn delete_comment(&self, scope: Scope, comment: CommentId) -> anyhow::Result<()> {
        let mut inner = self.enter(Op::DeleteComment)?;
        let list = inner.scope_comments(scope)?;
        if !list.iter().any(|c| c.id == comment) {
            return Err(Error::CommentNotFound(comment.0).into());
        }
        // Drop the comment and, transitively, everything replying to it
        let mut doomed = vec![comment];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                list.iter()
                    .filter(|c| c.parent_id == Some(parent))
                    .map(|c| c.id),
            );
            i += 1;
        }
        list.retain(|c| !doomed.contains(&c.id));
        Ok(())
    }
}
