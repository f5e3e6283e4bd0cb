use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A point in the mutation history of a tree. Version 0 is the empty tree and
/// every insert or remove allocates the next one.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub const ZERO: Version = Version(0);

    pub fn from_u64(version: u64) -> Version {
        Version(version)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(&self) -> Version {
        Version(self.0 + 1)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
