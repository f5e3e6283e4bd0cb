use crate::io::error::ExecError;
use crate::io::file_writer::{Outcome, ResultWriter};
use crate::io::operation::{parse_script, Operation};
use crate::tree::Tree;
use std::io::Write;
use tracing::{debug, info};

/// Counts from one call to [`Executor::execute`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Summary {
    pub applied: usize,
    pub inserted: usize,
    pub removed: usize,
    pub missed_removes: usize,
    pub answered: usize,
}

/// Holds a queue of operations and the tree they run against. Mutations are
/// applied to the tree; queries are answered through a [`ResultWriter`].
#[derive(Debug, Default)]
pub struct Executor {
    tree: Tree,
    queue: Vec<Operation>,
}

impl Executor {
    pub fn new() -> Executor {
        Executor::default()
    }

    pub fn enqueue(&mut self, op: Operation) {
        self.queue.push(op);
    }

    /// Parses `script` and queues every operation in it. Nothing is queued if
    /// any line fails to parse.
    pub fn enqueue_script(&mut self, script: &str) -> Result<usize, ExecError> {
        let ops = parse_script(script)?;
        let count = ops.len();
        self.queue.extend(ops);
        Ok(count)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Runs and drains the queue in order.
    pub fn execute<W: Write>(
        &mut self,
        writer: &mut ResultWriter<W>,
    ) -> Result<Summary, ExecError> {
        let mut summary = Summary::default();
        for op in std::mem::take(&mut self.queue) {
            debug!(%op, "applying");
            match op {
                Operation::Insert { key } => {
                    self.tree.insert(key);
                    summary.inserted += 1;
                }
                Operation::Delete { key } => {
                    if self.tree.remove(key) {
                        summary.removed += 1;
                    } else {
                        summary.missed_removes += 1;
                    }
                }
                Operation::Successor { key, version } => {
                    let result = Outcome::Successor(self.tree.successor(key, version));
                    writer.append(&op, &result)?;
                    summary.answered += 1;
                }
                Operation::Print { version } => {
                    let result = Outcome::Keys(self.tree.at(version).keys().collect());
                    writer.append(&op, &result)?;
                    summary.answered += 1;
                }
            }
            summary.applied += 1;
        }
        let stats = self.tree.stats();
        info!(
            applied = summary.applied,
            answered = summary.answered,
            version = %self.tree.latest_version(),
            nodes = stats.nodes,
            node_copies = stats.node_copies,
            root_handles = stats.root_handles,
            "queue executed"
        );
        Ok(summary)
    }
}
