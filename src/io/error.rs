use thiserror::Error;

/// Why a single operation line could not be read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("The line was entirely blank")]
    EmptyLine,

    #[error("Unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("`{operation}` takes {expected} argument(s), found {found}")]
    WrongArity {
        operation: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid key `{0}`")]
    InvalidKey(String),

    #[error("Invalid version `{0}`")]
    InvalidVersion(String),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("Failed to write a result")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode a result")]
    Json(#[from] serde_json::Error),
}
