use crate::io::error::ExecError;
use crate::io::operation::Operation;
use crate::node::Key;
use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::io::Write;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The operation line, then the answer on the next line.
    Text,
    /// One JSON object per line.
    Json,
}

/// The answer to a query operation.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Successor(Key),
    Keys(Vec<Key>),
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Successor(key) => write!(f, "{}", key),
            Outcome::Keys(keys) => write!(f, "{}", keys.iter().join(" ")),
        }
    }
}

#[derive(Serialize)]
struct Record<'a> {
    op: &'a Operation,
    result: &'a Outcome,
}

/// Appends query answers, line by line, to any writer.
#[derive(Debug)]
pub struct ResultWriter<W: Write> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> ResultWriter<W> {
        ResultWriter {
            out,
            format,
            written: 0,
        }
    }

    pub fn append(&mut self, op: &Operation, result: &Outcome) -> Result<(), ExecError> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.out, "{}", op)?;
                writeln!(self.out, "{}", result)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &Record { op, result })?;
                writeln!(self.out)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of records appended so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<(), ExecError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
