use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

mod error;
pub use error::Error;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CourseId(pub Uuid);

impl CourseId {
    pub fn stub() -> CourseId {
        CourseId(STUB_UUID)
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct ModuleId(pub Uuid);

impl ModuleId {
    pub fn stub() -> ModuleId {
        ModuleId(STUB_UUID)
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }

    pub fn generate() -> CommentId {
        CommentId(Uuid::new_v4())
    }
}

/// The entity that owns a comment thread.
///
/// A thread hangs either off a course (instructor Q&A) or off a single module
/// (per-module discussion), never both; the variant decides which backend
/// endpoint the thread's records live under.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Scope {
    Course(CourseId),
    Module(ModuleId),
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Author {
    pub id: UserId,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// The logged-in user's known profile, used to attribute comments they post.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn stub() -> UserProfile {
        UserProfile {
            id: UserId::stub(),
            display_name: None,
            avatar_url: None,
        }
    }

    pub fn author(&self) -> Author {
        Author {
            id: self.id,
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// One comment as the backend returns it: flat, with hierarchy expressed
/// only through `parent_id`.
///
/// Within one fetch's result set `id` is unique, and a `parent_id` is
/// expected to name another record of the same set; a record whose parent is
/// absent from the set is dropped during tree building, never promoted to a
/// root.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub parent_id: Option<CommentId>,
    pub author: Author,
    pub body: String,
    pub created_at: Time,
    pub scope: Scope,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub body: String,
}

impl NewComment {
    // See comments on other `validate` functions below
    pub fn validate(&self) -> Result<(), Error> {
        validate_string(&self.body)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewReply {
    pub parent_id: CommentId,
    pub body: String,
}

impl NewReply {
    pub fn validate(&self) -> Result<(), Error> {
        validate_string(&self.body)
    }
}

/// Validate that a user-provided string is acceptable to the backend.
///
/// Postgres-backed deployments reject null bytes in text columns, so catch
/// them client-side before a request is even attempted.
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        Err(Error::NullByteInString(s.to_string()))
    } else {
        Ok(())
    }
}
