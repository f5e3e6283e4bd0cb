use crate::io::error::{ExecError, ParseError};
use crate::node::Key;
use crate::version::Version;
use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One line of a script.
///
/// ```text
/// INC <key>            insert
/// REM <key>            delete
/// SUC <key> <version>  successor of key at version
/// IMP <version>        keys at version
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Insert { key: Key },
    Delete { key: Key },
    Successor { key: Key, version: Version },
    Print { version: Version },
}

impl Operation {
    fn mnemonic(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "INC",
            Operation::Delete { .. } => "REM",
            Operation::Successor { .. } => "SUC",
            Operation::Print { .. } => "IMP",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Insert { key } | Operation::Delete { key } => {
                write!(f, "{} {}", self.mnemonic(), key)
            }
            Operation::Successor { key, version } => {
                write!(f, "{} {} {}", self.mnemonic(), key, version)
            }
            Operation::Print { version } => write!(f, "{} {}", self.mnemonic(), version),
        }
    }
}

fn key(token: &str) -> Result<Key, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::InvalidKey(token.to_owned()))
}

fn version(token: &str) -> Result<Version, ParseError> {
    token
        .parse()
        .map(Version::from_u64)
        .map_err(|_| ParseError::InvalidVersion(token.to_owned()))
}

fn arity(operation: &'static str, expected: usize, args: &[&str]) -> ParseError {
    ParseError::WrongArity {
        operation,
        expected,
        found: args.len(),
    }
}

impl FromStr for Operation {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (head, args) = match tokens.split_first() {
            Some((head, args)) => (head.to_ascii_uppercase(), args),
            None => return Err(ParseError::EmptyLine),
        };
        match head.as_str() {
            "INC" => match args {
                [k] => Ok(Operation::Insert { key: key(k)? }),
                _ => Err(arity("INC", 1, args)),
            },
            "REM" => match args {
                [k] => Ok(Operation::Delete { key: key(k)? }),
                _ => Err(arity("REM", 1, args)),
            },
            "SUC" => match args {
                [k, v] => Ok(Operation::Successor {
                    key: key(k)?,
                    version: version(v)?,
                }),
                _ => Err(arity("SUC", 2, args)),
            },
            "IMP" => match args {
                [v] => Ok(Operation::Print {
                    version: version(v)?,
                }),
                _ => Err(arity("IMP", 1, args)),
            },
            _ => Err(ParseError::UnknownOperation(tokens[0].to_owned())),
        }
    }
}

/// Parses a whole script. Blank lines and lines starting with `#` are skipped;
/// errors carry the 1-based line number.
pub fn parse_script(script: &str) -> Result<Vec<Operation>, ExecError> {
    script
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            line.parse()
                .map_err(|source| ExecError::Parse { line: n, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_kind() {
        assert_eq!(
            "INC 6".parse::<Operation>(),
            Ok(Operation::Insert { key: 6 })
        );
        assert_eq!(
            "rem -4".parse::<Operation>(),
            Ok(Operation::Delete { key: -4 })
        );
        assert_eq!(
            "SUC 2 10".parse::<Operation>(),
            Ok(Operation::Successor {
                key: 2,
                version: Version::from_u64(10)
            })
        );
        assert_eq!(
            "  imp   3 ".parse::<Operation>(),
            Ok(Operation::Print {
                version: Version::from_u64(3)
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Operation>(), Err(ParseError::EmptyLine));
        assert_eq!(
            "PUT 1".parse::<Operation>(),
            Err(ParseError::UnknownOperation("PUT".to_owned()))
        );
        assert_eq!(
            "SUC 1".parse::<Operation>(),
            Err(ParseError::WrongArity {
                operation: "SUC",
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            "INC x".parse::<Operation>(),
            Err(ParseError::InvalidKey("x".to_owned()))
        );
        assert_eq!(
            "IMP -1".parse::<Operation>(),
            Err(ParseError::InvalidVersion("-1".to_owned()))
        );
    }

    #[test]
    fn test_display_matches_script_syntax() {
        for line in ["INC 6", "REM 4", "SUC 2 10", "IMP 0"] {
            assert_eq!(line.parse::<Operation>().unwrap().to_string(), line);
        }
    }

    #[test]
    fn test_parse_script_skips_comments_and_reports_lines() {
        let ops = parse_script("# setup\nINC 1\n\nINC 2\nIMP 2\n").unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], Operation::Insert { key: 1 });
        assert_eq!(
            ops[2],
            Operation::Print {
                version: Version::from_u64(2)
            }
        );

        match parse_script("INC 1\nINC\n") {
            Err(ExecError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_shape() {
        let op = Operation::Successor {
            key: 2,
            version: Version::from_u64(10),
        };
        assert_eq!(
            serde_json::to_string(&op).unwrap(),
            r#"{"kind":"successor","key":2,"version":10}"#
        );
    }
}
