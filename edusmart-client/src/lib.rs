mod generation;
pub use generation::{FetchGenerations, ListKey, Ticket};

mod store;
pub use store::{CommentNode, FetchOutcome, ListState, StoreError, ThreadStore};

mod tree;
pub use tree::{build_tree, flatten, remove_in, Node, SyncStatus, TreeRecord};

mod view;
pub use view::{CommentApi, ThreadView};

pub mod api {
    pub use edusmart_api::*;
}
