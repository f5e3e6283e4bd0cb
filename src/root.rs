use crate::node::Link;
use crate::version::Version;
use crate::versioned_field::VersionedField;

/// Only the tree itself links to a root handle.
pub const ROOT_JOURNAL: usize = 2;

/// Index of a root handle in the tree's arena.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RootId(u32);

impl RootId {
    pub(crate) fn from_index(index: usize) -> RootId {
        RootId(u32::try_from(index).expect("root arena exceeds u32::MAX entries"))
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Versioned indirection between the tree and its root node. The root has no
/// parent to absorb an overflow, so the handle copies itself instead.
#[derive(Debug, Clone)]
pub struct RootHandle {
    node: VersionedField<Link, ROOT_JOURNAL>,
}

impl RootHandle {
    pub(crate) fn new(node: Link) -> RootHandle {
        RootHandle {
            node: VersionedField::new(node),
        }
    }

    pub fn get(&self, version: Version) -> Link {
        self.node.get(version)
    }

    #[must_use]
    pub(crate) fn set(&mut self, version: Version, node: Link) -> bool {
        self.node.set(version, node)
    }

    /// The replacement handle for a refused write: latest root baked in, then
    /// the refused write recorded in the first slot.
    pub(crate) fn compact(&self, version: Version, node: Link) -> RootHandle {
        let mut copy = RootHandle {
            node: self.node.compact(),
        };
        let recorded = copy.set(version, node);
        assert!(recorded, "empty root journal refused a write");
        copy
    }
}

/// Which root handle was authoritative from which version on.
#[derive(Debug, Clone)]
pub struct VersionIndex {
    entries: Vec<(Version, RootId)>,
}

impl VersionIndex {
    pub(crate) fn new(first: RootId) -> VersionIndex {
        VersionIndex {
            entries: vec![(Version::ZERO, first)],
        }
    }

    pub(crate) fn register(&mut self, version: Version, handle: RootId) {
        if let Some(&(last, _)) = self.entries.last() {
            assert!(last < version, "root handles registered out of order");
        }
        self.entries.push((version, handle));
    }

    /// The handle current at `version`: the newest registration not after it.
    pub fn resolve(&self, version: Version) -> RootId {
        self.entries
            .iter()
            .rev()
            .find(|&&(registered, _)| registered <= version)
            .map(|&(_, handle)| handle)
            .unwrap_or(self.entries[0].1)
    }

    pub fn current(&self) -> RootId {
        self.entries[self.entries.len() - 1].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
