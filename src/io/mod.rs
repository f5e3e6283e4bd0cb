//! Replays a script of operations against one tree and writes the answers of
//! the queries to a line-oriented sink.

mod error;
mod executor;
mod file_writer;
mod operation;

pub use error::{ExecError, ParseError};
pub use executor::{Executor, Summary};
pub use file_writer::{Outcome, OutputFormat, ResultWriter};
pub use operation::{parse_script, Operation};
