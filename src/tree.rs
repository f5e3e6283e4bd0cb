use crate::node::{Change, Key, Link, Node, NodeId, Side, NO_SUCCESSOR};
use crate::root::{RootHandle, RootId, VersionIndex};
use crate::version::Version;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use tracing::{debug, trace};

/// A partially persistent binary search tree.
///
/// Every insert or remove produces a new version; every earlier version stays
/// queryable in its exact historical shape through [`Tree::at`]. Nodes are fat
/// nodes whose fields carry a small journal of timestamped writes. When a
/// journal fills up the node is replaced by a compacted copy and everything
/// linking to it is redirected, at the same version, to the copy.
///
/// The tree owns every node and root handle it ever allocated. Nothing is freed
/// while the tree lives, since old versions still read through them.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    handles: Vec<RootHandle>,
    index: VersionIndex,
    version: Version,
    node_copies: usize,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Stats {
    pub nodes: usize,
    pub node_copies: usize,
    pub root_handles: usize,
    pub history_entries: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Tree {
    pub fn new() -> Tree {
        Tree {
            nodes: Vec::new(),
            handles: vec![RootHandle::new(None)],
            index: VersionIndex::new(RootId::from_index(0)),
            version: Version::ZERO,
            node_copies: 0,
        }
    }

    pub fn latest_version(&self) -> Version {
        self.version
    }

    pub fn stats(&self) -> Stats {
        Stats {
            nodes: self.nodes.len(),
            node_copies: self.node_copies,
            root_handles: self.handles.len(),
            history_entries: self.index.len(),
        }
    }

    /// A read-only view of the tree as of `version`. Versions past the latest
    /// one read as the latest.
    pub fn at(&self, version: Version) -> Snapshot<'_> {
        Snapshot {
            tree: self,
            version: version.min(self.version),
        }
    }

    pub fn search(&self, key: Key, version: Version) -> Option<NodeId> {
        self.at(version).search(key)
    }

    /// Smallest key strictly greater than `key` at `version`, or
    /// [`NO_SUCCESSOR`].
    pub fn successor(&self, key: Key, version: Version) -> Key {
        self.at(version).successor(key).unwrap_or(NO_SUCCESSOR)
    }

    /// Keys at `version` in ascending order, separated by single spaces.
    pub fn render(&self, version: Version) -> String {
        self.at(version).to_string()
    }

    /// Adds `key` as a new version. Duplicates are kept; an equal key goes to
    /// the right of the existing one.
    pub fn insert(&mut self, key: Key) -> bool {
        self.version = self.version.next();
        let z = self.allocate(Node::new(key));

        let mut parent = None;
        let mut cursor = self.current_root();
        while let Some(x) = cursor {
            parent = Some(x);
            cursor = if key < self.key_of(x) {
                self.left_of(x)
            } else {
                self.right_of(x)
            };
        }

        self.write(z, Change::Parent(parent));
        match parent {
            None => self.set_root(Some(z)),
            Some(y) => {
                let side = if key < self.key_of(y) {
                    Side::Left
                } else {
                    Side::Right
                };
                self.write(y, Change::child(side, Some(z)));
            }
        }
        trace!(key, version = %self.version, "inserted");
        true
    }

    /// Removes one node holding `key` as a new version. The version is
    /// consumed even when the key is absent, in which case nothing changes
    /// and `false` is returned.
    pub fn remove(&mut self, key: Key) -> bool {
        self.version = self.version.next();
        let z = match self.find_current(key) {
            Some(z) => z,
            None => {
                trace!(key, version = %self.version, "remove of absent key");
                return false;
            }
        };

        match (self.left_of(z), self.right_of(z)) {
            (None, right) => self.transplant(z, right),
            (left, None) => self.transplant(z, left),
            (Some(_), Some(right)) => {
                let y = self.minimum_current(right);
                if self.parent_of(y) != Some(self.live(z)) {
                    let y_right = self.right_of(y);
                    self.transplant(y, y_right);
                    let z_right = self.right_of(z);
                    self.write(y, Change::Right(z_right));
                    if let Some(z_right) = z_right {
                        self.write(z_right, Change::Parent(Some(y)));
                    }
                }
                self.transplant(z, Some(y));
                let z_left = self.left_of(z);
                self.write(y, Change::Left(z_left));
                if let Some(z_left) = z_left {
                    self.write(z_left, Change::Parent(Some(y)));
                }
            }
        }
        trace!(key, version = %self.version, "removed");
        true
    }

    // Everything below works on the version being written. Reads and writes
    // go through `live`, so a node that was copied earlier in the same
    // mutation is addressed by its replacement.

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn live(&self, mut id: NodeId) -> NodeId {
        while let Some(copy) = self.nodes[id.index()].copied_to() {
            id = copy;
        }
        id
    }

    fn live_link(&self, link: Link) -> Link {
        link.map(|id| self.live(id))
    }

    fn current(&self, id: NodeId) -> &Node {
        &self.nodes[self.live(id).index()]
    }

    fn key_of(&self, id: NodeId) -> Key {
        self.current(id).key(self.version)
    }

    fn parent_of(&self, id: NodeId) -> Link {
        self.live_link(self.current(id).parent(self.version))
    }

    fn left_of(&self, id: NodeId) -> Link {
        self.live_link(self.current(id).left(self.version))
    }

    fn right_of(&self, id: NodeId) -> Link {
        self.live_link(self.current(id).right(self.version))
    }

    fn current_root(&self) -> Link {
        self.live_link(self.handles[self.index.current().index()].get(self.version))
    }

    fn find_current(&self, key: Key) -> Option<NodeId> {
        let mut cursor = self.current_root();
        while let Some(x) = cursor {
            let found = self.key_of(x);
            if key == found {
                return Some(x);
            }
            cursor = if key < found {
                self.left_of(x)
            } else {
                self.right_of(x)
            };
        }
        None
    }

    fn minimum_current(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.left_of(id) {
            id = left;
        }
        id
    }

    /// Puts `replacement` where `u` hangs, under `u`'s parent or as the root.
    fn transplant(&mut self, u: NodeId, replacement: Link) {
        match self.parent_of(u) {
            None => self.set_root(replacement),
            Some(parent) => {
                let u = self.live(u);
                let parent_node = self.current(parent);
                let side = [Side::Left, Side::Right]
                    .into_iter()
                    .find(|&side| self.links_to(parent_node.child(self.version, side), u))
                    .unwrap_or_else(|| unreachable!("parent of {:?} does not link back to it", u));
                self.write(parent, Change::child(side, replacement));
            }
        }
        if let Some(replacement) = replacement {
            let parent = self.parent_of(u);
            self.write(replacement, Change::Parent(parent));
        }
    }

    /// Applies `change` to `node` at the current version, copying and
    /// redirecting observers for as long as journals keep overflowing.
    fn write(&mut self, node: NodeId, change: Change) {
        let mut pending = vec![(node, change)];
        while let Some((target, change)) = pending.pop() {
            let target = self.live(target);
            let change = change.map_link(|id| self.live(id));
            if self.nodes[target.index()].apply(self.version, change) {
                continue;
            }
            let copy = self.copy_node(target, change);
            self.notify_observers(copy, &mut pending);
        }
    }

    fn copy_node(&mut self, old: NodeId, change: Change) -> NodeId {
        let mut node = self.nodes[old.index()].compact();
        let recorded = node.apply(self.version, change);
        assert!(recorded, "empty journal refused a write");
        let copy = self.allocate(node);
        self.nodes[old.index()].mark_copied(copy);
        self.node_copies += 1;
        debug!(
            old = old.index(),
            copy = copy.index(),
            version = %self.version,
            "journal full, node copied"
        );
        copy
    }

    fn links_to(&self, link: Link, target: NodeId) -> bool {
        self.live_link(link) == Some(target)
    }

    /// Queues a redirect for every neighbour that still links to the node
    /// `copy` replaced. Neighbours that were already unlinked from it by the
    /// running mutation are left alone.
    fn notify_observers(&mut self, copy: NodeId, pending: &mut Vec<(NodeId, Change)>) {
        let version = self.version;
        let node = &self.nodes[copy.index()];
        let children = [node.left(version), node.right(version)];
        let parent = node.parent(version);

        for child in children.iter().flatten() {
            if self.links_to(self.current(*child).parent(version), copy) {
                pending.push((*child, Change::Parent(Some(copy))));
            }
        }

        match self.live_link(parent) {
            Some(parent) => {
                let parent_node = self.current(parent);
                for side in [Side::Left, Side::Right] {
                    if self.links_to(parent_node.child(version, side), copy) {
                        pending.push((parent, Change::child(side, Some(copy))));
                    }
                }
            }
            None => {
                let root = self.handles[self.index.current().index()].get(version);
                if self.links_to(root, copy) {
                    self.set_root(Some(copy));
                }
            }
        }
    }

    fn set_root(&mut self, node: Link) {
        let node = self.live_link(node);
        let current = self.index.current();
        if self.handles[current.index()].set(self.version, node) {
            return;
        }
        let handle = self.handles[current.index()].compact(self.version, node);
        let id = RootId::from_index(self.handles.len());
        self.handles.push(handle);
        self.index.register(self.version, id);
        debug!(
            handle = id.index(),
            version = %self.version,
            "root journal full, handle copied"
        );
    }
}

/// The tree frozen at one version. Reads never follow node copies: a version
/// only ever reaches the nodes that were current when it was written.
#[derive(Debug, Copy, Clone)]
pub struct Snapshot<'a> {
    tree: &'a Tree,
    version: Version,
}

impl<'a> Snapshot<'a> {
    pub fn version(&self) -> Version {
        self.version
    }

    fn node(&self, id: NodeId) -> &'a Node {
        &self.tree.nodes[id.index()]
    }

    fn key(&self, id: NodeId) -> Key {
        self.node(id).key(self.version)
    }

    pub fn root(&self) -> Link {
        let handle = self.tree.index.resolve(self.version);
        self.tree.handles[handle.index()].get(self.version)
    }

    pub fn search(&self, key: Key) -> Option<NodeId> {
        let mut cursor = self.root();
        while let Some(x) = cursor {
            let found = self.key(x);
            if key == found {
                return Some(x);
            }
            cursor = if key < found {
                self.node(x).left(self.version)
            } else {
                self.node(x).right(self.version)
            };
        }
        None
    }

    pub fn contains(&self, key: Key) -> bool {
        self.search(key).is_some()
    }

    /// Smallest key strictly greater than `key`.
    ///
    /// Descends towards `key`, remembering the last key on the path that was
    /// greater. Without an exact match that key is the answer; with one, the
    /// answer is found by walking the in-order successors past any
    /// duplicates.
    pub fn successor(&self, key: Key) -> Option<Key> {
        let mut candidate = None;
        let mut cursor = self.root();
        while let Some(x) = cursor {
            let found = self.key(x);
            if key == found {
                let mut node = x;
                loop {
                    node = self.next_in_order(node)?;
                    let next = self.key(node);
                    if next != key {
                        return Some(next);
                    }
                }
            }
            cursor = if key < found {
                candidate = Some(found);
                self.node(x).left(self.version)
            } else {
                self.node(x).right(self.version)
            };
        }
        candidate
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left(self.version) {
            id = left;
        }
        id
    }

    fn next_in_order(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.node(id).right(self.version) {
            return Some(self.minimum(right));
        }
        let mut child = id;
        let mut parent = self.node(id).parent(self.version);
        while let Some(p) = parent {
            if self.node(p).side_of(self.version, child) != Some(Side::Right) {
                break;
            }
            child = p;
            parent = self.node(p).parent(self.version);
        }
        parent
    }

    pub fn min(&self) -> Option<Key> {
        self.root().map(|root| self.key(self.minimum(root)))
    }

    pub fn max(&self) -> Option<Key> {
        let mut id = self.root()?;
        while let Some(right) = self.node(id).right(self.version) {
            id = right;
        }
        Some(self.key(id))
    }

    pub fn keys(&self) -> Keys<'a> {
        Keys {
            snapshot: *self,
            stack: Vec::new(),
            cursor: self.root(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_none()
    }
}

impl Display for Snapshot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keys().join(" "))
    }
}

/// In-order walk over a snapshot.
#[derive(Debug, Clone)]
pub struct Keys<'a> {
    snapshot: Snapshot<'a>,
    stack: Vec<NodeId>,
    cursor: Link,
}

impl Iterator for Keys<'_> {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        let version = self.snapshot.version;
        while let Some(id) = self.cursor {
            self.stack.push(id);
            self.cursor = self.snapshot.node(id).left(version);
        }
        let id = self.stack.pop()?;
        self.cursor = self.snapshot.node(id).right(version);
        Some(self.snapshot.key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(n: u64) -> Version {
        Version::from_u64(n)
    }

    fn scenario() -> Tree {
        let mut tree = Tree::new();
        for key in [6, 5, 7, 8, 5, 2, 4, 4] {
            assert!(tree.insert(key));
        }
        assert!(tree.remove(4));
        assert!(tree.remove(4));
        tree
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::new();
        assert_eq!(tree.latest_version(), Version::ZERO);
        assert_eq!(tree.render(v(0)), "");
        assert_eq!(tree.successor(1, v(0)), NO_SUCCESSOR);
        assert!(tree.at(v(0)).is_empty());
        assert_eq!(tree.at(v(0)).min(), None);
    }

    #[test]
    fn test_round_trip_scenario() {
        let tree = scenario();
        assert_eq!(tree.latest_version(), v(10));
        assert_eq!(tree.render(v(0)), "");
        assert_eq!(tree.render(v(1)), "6");
        assert_eq!(tree.render(v(6)), "2 5 5 6 7 8");
        assert_eq!(tree.render(v(8)), "2 4 4 5 5 6 7 8");
        assert_eq!(tree.render(v(9)), "2 4 5 5 6 7 8");
        assert_eq!(tree.render(v(10)), "2 5 5 6 7 8");
        assert_eq!(tree.render(v(11)), "2 5 5 6 7 8");
    }

    #[test]
    fn test_successor_scenario() {
        let tree = scenario();
        assert_eq!(tree.successor(2, v(1)), 6);
        assert_eq!(tree.successor(6, v(1)), NO_SUCCESSOR);
        assert_eq!(tree.successor(2, v(10)), 5);
        assert_eq!(tree.successor(8, v(10)), NO_SUCCESSOR);
        assert_eq!(tree.successor(4, v(8)), 5);
        assert_eq!(tree.successor(5, v(8)), 6);
        assert_eq!(tree.successor(3, v(8)), 4);
        assert_eq!(tree.successor(i32::MIN, v(10)), 2);
    }

    #[test]
    fn test_snapshot_queries() {
        let tree = scenario();
        let snapshot = tree.at(v(8));
        assert_eq!(snapshot.version(), v(8));
        assert_eq!(snapshot.len(), 8);
        assert_eq!(snapshot.min(), Some(2));
        assert_eq!(snapshot.max(), Some(8));
        assert!(snapshot.contains(4));
        assert!(!tree.at(v(10)).contains(4));
        let found = tree.search(4, v(7));
        assert_eq!(found.map(|id| tree.at(v(7)).key(id)), Some(4));
        assert_eq!(tree.at(v(99)).version(), v(10));
    }

    #[test]
    fn test_remove_absent_key_consumes_version() {
        let mut tree = Tree::new();
        assert!(tree.insert(3));
        assert!(!tree.remove(9));
        assert_eq!(tree.latest_version(), v(2));
        assert_eq!(tree.render(v(2)), "3");
        assert!(!Tree::new().remove(1));
    }

    #[test]
    fn test_remove_node_with_two_children() {
        let mut tree = Tree::new();
        for key in [50, 30, 70, 20, 40, 60, 80, 65] {
            tree.insert(key);
        }
        assert!(tree.remove(50));
        assert_eq!(tree.render(v(9)), "20 30 40 60 65 70 80");
        assert!(tree.remove(30));
        assert_eq!(tree.render(v(10)), "20 40 60 65 70 80");
        assert_eq!(tree.render(v(8)), "20 30 40 50 60 65 70 80");
        assert_eq!(tree.successor(50, v(9)), 60);
        assert_eq!(tree.successor(50, v(8)), 60);
        assert_eq!(tree.successor(40, v(8)), 50);
    }

    #[test]
    fn test_root_overflow_replaces_handle() {
        let mut tree = Tree::new();
        for _ in 0..4 {
            tree.insert(1);
            tree.remove(1);
        }
        assert!(tree.stats().root_handles > 1);
        assert_eq!(tree.stats().history_entries, tree.stats().root_handles);
        for n in 0..=8 {
            let expected = if n % 2 == 1 { "1" } else { "" };
            assert_eq!(tree.render(v(n)), expected, "version {}", n);
        }
    }

    #[test]
    fn test_node_overflow_copies_and_redirects() {
        let mut tree = Tree::new();
        tree.insert(10);
        tree.insert(20);
        for _ in 0..10 {
            tree.insert(5);
            tree.remove(5);
        }
        assert!(tree.stats().node_copies > 0);
        assert_eq!(tree.render(v(2)), "10 20");
        for n in 1..=10u64 {
            assert_eq!(tree.render(v(2 * n + 1)), "5 10 20");
            assert_eq!(tree.render(v(2 * n + 2)), "10 20");
            assert_eq!(tree.successor(5, v(2 * n + 1)), 10);
            assert_eq!(tree.successor(10, v(2 * n + 1)), 20);
        }
    }

    #[test]
    fn test_copy_cascades_through_parent_to_root_handle() {
        let mut tree = Tree::new();
        // root handle records v1 and v3: full, with 10 as root
        tree.insert(7);
        tree.insert(10);
        tree.remove(7);
        // 10.left written at v4..v8 and v10: full, holding 4
        for _ in 0..2 {
            tree.insert(5);
            tree.remove(5);
        }
        tree.insert(5);
        tree.insert(4);
        tree.remove(5);
        // 4.left written at v11..v16: full
        for _ in 0..3 {
            tree.insert(2);
            tree.remove(2);
        }
        assert_eq!(tree.latest_version(), v(16));
        assert_eq!(tree.stats().node_copies, 0);
        assert_eq!(tree.stats().root_handles, 1);
        let before: Vec<String> = (0..=16).map(|n| tree.render(v(n))).collect();

        // 4 copies, its parent 10 copies on the redirect, the root handle
        // copies on the redirect of 10
        tree.insert(2);
        let stats = tree.stats();
        assert_eq!(stats.node_copies, 2);
        assert_eq!(stats.root_handles, 2);
        assert_eq!(stats.history_entries, 2);

        for (n, expected) in before.iter().enumerate() {
            assert_eq!(&tree.render(v(n as u64)), expected, "version {}", n);
        }
        assert_eq!(before[10], "4 10");
        assert_eq!(tree.render(v(17)), "2 4 10");
        assert_eq!(tree.successor(2, v(17)), 4);
        assert_eq!(tree.successor(4, v(17)), 10);
        assert_eq!(tree.successor(4, v(16)), 10);

        assert!(tree.remove(4));
        assert_eq!(tree.render(v(18)), "2 10");
        assert_eq!(tree.render(v(17)), "2 4 10");
        assert_eq!(tree.successor(2, v(18)), 10);
    }

    #[test]
    fn test_history_is_immutable() {
        let mut tree = Tree::new();
        let mut rendered = Vec::new();
        for key in [8, 3, 10, 1, 6, 14, 4, 7, 13] {
            tree.insert(key);
            rendered.push(tree.render(tree.latest_version()));
        }
        for key in [3, 8, 6, 13, 1] {
            tree.remove(key);
            rendered.push(tree.render(tree.latest_version()));
        }
        for key in 0..30 {
            tree.insert(key % 7);
        }
        for (n, expected) in rendered.iter().enumerate() {
            assert_eq!(&tree.render(v(n as u64 + 1)), expected);
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(Key),
        Remove(Key),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..24i32).prop_map(Op::Insert),
            2 => (0..24i32).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn every_version_matches_model(ops in prop::collection::vec(op(), 1..160)) {
            let mut tree = Tree::new();
            let mut model: Vec<Key> = Vec::new();
            let mut versions = vec![Vec::new()];
            for op in &ops {
                match *op {
                    Op::Insert(key) => {
                        prop_assert!(tree.insert(key));
                        model.push(key);
                    }
                    Op::Remove(key) => {
                        let position = model.iter().position(|&k| k == key);
                        prop_assert_eq!(tree.remove(key), position.is_some());
                        if let Some(position) = position {
                            model.swap_remove(position);
                        }
                    }
                }
                let mut sorted = model.clone();
                sorted.sort_unstable();
                versions.push(sorted);
            }

            prop_assert_eq!(tree.latest_version().to_u64(), ops.len() as u64);
            for (n, expected) in versions.iter().enumerate() {
                let snapshot = tree.at(v(n as u64));
                prop_assert_eq!(snapshot.keys().collect::<Vec<_>>(), expected.clone());
                for probe in -1..25 {
                    let successor = expected.iter().copied().find(|&k| k > probe);
                    prop_assert_eq!(snapshot.successor(probe), successor);
                }
            }
        }
    }
}
