use crate::version::Version;
use crate::versioned_field::VersionedField;

pub type Key = i32;

/// Returned by successor queries when no greater key exists.
pub const NO_SUCCESSOR: Key = Key::MAX;

/// Parent, left child and right child: the most entities that can hold a link
/// into a single node.
pub const MAX_OBSERVERS: usize = 3;

pub const NODE_JOURNAL: usize = 2 * MAX_OBSERVERS;

/// Index of a node in the tree's arena. Ids are never reused.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> NodeId {
        NodeId(u32::try_from(index).expect("node arena exceeds u32::MAX entries"))
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A parent or child link; `None` is the absent node.
pub type Link = Option<NodeId>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

/// A single field write against a node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Change {
    Key(Key),
    Parent(Link),
    Left(Link),
    Right(Link),
}

impl Change {
    pub fn child(side: Side, link: Link) -> Change {
        match side {
            Side::Left => Change::Left(link),
            Side::Right => Change::Right(link),
        }
    }

    /// Rewrites the node carried by a link change.
    pub(crate) fn map_link(self, f: impl FnOnce(NodeId) -> NodeId) -> Change {
        match self {
            Change::Key(key) => Change::Key(key),
            Change::Parent(link) => Change::Parent(link.map(f)),
            Change::Left(link) => Change::Left(link.map(f)),
            Change::Right(link) => Change::Right(link.map(f)),
        }
    }
}

/// A fat node: every attribute is a versioned field, so the node answers for
/// its own shape at any version since it was allocated.
#[derive(Debug, Clone)]
pub struct Node {
    key: VersionedField<Key, NODE_JOURNAL>,
    parent: VersionedField<Link, NODE_JOURNAL>,
    left: VersionedField<Link, NODE_JOURNAL>,
    right: VersionedField<Link, NODE_JOURNAL>,
    copied_to: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(key: Key) -> Node {
        Node {
            key: VersionedField::new(key),
            parent: VersionedField::new(None),
            left: VersionedField::new(None),
            right: VersionedField::new(None),
            copied_to: None,
        }
    }

    pub fn key(&self, version: Version) -> Key {
        self.key.get(version)
    }

    pub fn parent(&self, version: Version) -> Link {
        self.parent.get(version)
    }

    pub fn left(&self, version: Version) -> Link {
        self.left.get(version)
    }

    pub fn right(&self, version: Version) -> Link {
        self.right.get(version)
    }

    pub fn child(&self, version: Version, side: Side) -> Link {
        match side {
            Side::Left => self.left(version),
            Side::Right => self.right(version),
        }
    }

    /// Which child slot holds `child` at `version`, if any.
    pub fn side_of(&self, version: Version, child: NodeId) -> Option<Side> {
        if self.left(version) == Some(child) {
            Some(Side::Left)
        } else if self.right(version) == Some(child) {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// The compacted copy that replaced this node, once its journal filled up.
    pub fn copied_to(&self) -> Option<NodeId> {
        self.copied_to
    }

    pub(crate) fn mark_copied(&mut self, copy: NodeId) {
        debug_assert!(self.copied_to.is_none(), "node copied twice");
        self.copied_to = Some(copy);
    }

    /// Writes `change` at `version`; `false` when that field's journal is full.
    #[must_use]
    pub(crate) fn apply(&mut self, version: Version, change: Change) -> bool {
        match change {
            Change::Key(key) => self.key.set(version, key),
            Change::Parent(link) => self.parent.set(version, link),
            Change::Left(link) => self.left.set(version, link),
            Change::Right(link) => self.right.set(version, link),
        }
    }

    /// A new node holding this node's latest state as its base, with empty
    /// journals.
    pub(crate) fn compact(&self) -> Node {
        Node {
            key: self.key.compact(),
            parent: self.parent.compact(),
            left: self.left.compact(),
            right: self.right.compact(),
            copied_to: None,
        }
    }
}
