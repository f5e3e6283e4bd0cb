//! A partially persistent binary search tree.
//!
//! Every insert and remove creates a new version of the tree and leaves all
//! earlier versions readable in their exact historical shape. Persistence is
//! done with fat nodes: each node field keeps a small journal of timestamped
//! writes, and a node whose journal fills up is replaced by a compacted copy
//! that every neighbour is redirected to.
//!
//! ```
//! use persistent_bst::{Tree, Version, NO_SUCCESSOR};
//!
//! let mut tree = Tree::new();
//! for key in [6, 5, 7, 8, 5, 2] {
//!     tree.insert(key);
//! }
//! tree.remove(5);
//!
//! assert_eq!(tree.render(Version::from_u64(6)), "2 5 5 6 7 8");
//! assert_eq!(tree.render(tree.latest_version()), "2 5 6 7 8");
//! assert_eq!(tree.successor(2, Version::from_u64(1)), 6);
//! assert_eq!(tree.successor(8, Version::from_u64(7)), NO_SUCCESSOR);
//! ```

pub mod io;
pub mod node;
pub mod root;
pub mod tree;
pub mod version;
pub mod versioned_field;

pub use node::{Key, NodeId, NO_SUCCESSOR};
pub use tree::{Keys, Snapshot, Stats, Tree};
pub use version::Version;
