use std::{collections::HashMap, fmt::Debug, hash::Hash};

/// A flat record that can be woven into a reply tree.
///
/// Course comments and module discussions share this shape: an own id and an
/// optional parent id pointing at another record of the same result set.
pub trait TreeRecord: Clone {
    type Id: Copy + Debug + Eq + Hash;

    fn id(&self) -> Self::Id;
    fn parent_id(&self) -> Option<Self::Id>;
}

/// Whether a node's record has been acknowledged by the backend.
///
/// Only the reconciler creates `Pending` nodes; `build_tree` output is always
/// `Confirmed` since it starts from server-returned records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncStatus {
    Confirmed,
    Pending,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node<R> {
    pub record: R,
    pub status: SyncStatus,

    /// Child comments, in the order their records appeared in the flat input
    pub replies: Vec<Node<R>>,
}

impl<R: TreeRecord> Node<R> {
    pub fn confirmed(record: R) -> Node<R> {
        Node {
            record,
            status: SyncStatus::Confirmed,
            replies: Vec::new(),
        }
    }

    pub fn pending(record: R) -> Node<R> {
        Node {
            record,
            status: SyncStatus::Pending,
            replies: Vec::new(),
        }
    }

    pub fn id(&self) -> R::Id {
        self.record.id()
    }

    pub fn is_pending(&self) -> bool {
        self.status == SyncStatus::Pending
    }

    pub fn get_in<'a>(nodes: &'a [Node<R>], id: &R::Id) -> Option<&'a Node<R>> {
        for n in nodes.iter() {
            if n.record.id() == *id {
                return Some(n);
            }
            if let Some(res) = Node::get_in(&n.replies, id) {
                return Some(res);
            }
        }
        None
    }

    pub fn find_in<'a>(nodes: &'a mut [Node<R>], id: &R::Id) -> Option<&'a mut Node<R>> {
        for n in nodes.iter_mut() {
            if n.record.id() == *id {
                return Some(n);
            }
            if let Some(res) = Node::find_in(&mut n.replies, id) {
                return Some(res);
            }
        }
        None
    }
}

/// Rebuild the reply forest from a flat result set.
///
/// Pure: the input is left untouched. Roots keep the relative order they had
/// in the input, and so do replies within any single parent; callers wanting
/// chronological threads must sort the flat list first. A record whose
/// `parent_id` names no record of the set is omitted from the output, along
/// with everything hanging below it.
pub fn build_tree<R: TreeRecord>(records: &[R]) -> Vec<Node<R>> {
    // First pass: one addressable node per record, so wiring in the second
    // pass works no matter how parents and children interleave in the input.
    let mut by_id: HashMap<R::Id, Node<R>> = HashMap::with_capacity(records.len());
    for r in records {
        by_id.insert(r.id(), Node::confirmed(r.clone()));
    }

    // Second pass: record each parent's children (input order) and the roots.
    let mut children: HashMap<R::Id, Vec<R::Id>> = HashMap::new();
    let mut roots = Vec::new();
    for r in records {
        match r.parent_id() {
            None => roots.push(r.id()),
            Some(p) if by_id.contains_key(&p) => {
                children.entry(p).or_insert_with(Vec::new).push(r.id())
            }
            Some(p) => {
                tracing::warn!(id = ?r.id(), parent = ?p, "dropping record with unknown parent")
            }
        }
    }

    roots
        .into_iter()
        .filter_map(|id| assemble(id, &mut by_id, &children))
        .collect()
}

fn assemble<R: TreeRecord>(
    id: R::Id,
    by_id: &mut HashMap<R::Id, Node<R>>,
    children: &HashMap<R::Id, Vec<R::Id>>,
) -> Option<Node<R>> {
    let mut node = by_id.remove(&id)?;
    if let Some(kids) = children.get(&id) {
        node.replies = kids
            .iter()
            .filter_map(|k| assemble(*k, by_id, children))
            .collect();
    }
    Some(node)
}

/// Preorder walk back to the flat shape `build_tree` accepts.
pub fn flatten<R: TreeRecord>(nodes: &[Node<R>]) -> Vec<R> {
    let mut out = Vec::new();
    flatten_into(nodes, &mut out);
    out
}

fn flatten_into<R: TreeRecord>(nodes: &[Node<R>], out: &mut Vec<R>) {
    for n in nodes {
        out.push(n.record.clone());
        flatten_into(&n.replies, out);
    }
}

/// Detach the node carrying `id` from wherever it sits in the forest,
/// returning it together with its whole reply subtree.
pub fn remove_in<R: TreeRecord>(nodes: &mut Vec<Node<R>>, id: &R::Id) -> Option<Node<R>> {
    if let Some(pos) = nodes.iter().position(|n| n.record.id() == *id) {
        return Some(nodes.remove(pos));
    }
    for n in nodes.iter_mut() {
        if let Some(found) = remove_in(&mut n.replies, id) {
            return Some(found);
        }
    }
    None
}
