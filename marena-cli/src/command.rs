//! Textual command parser.
//!
//! Commands look like function calls: `create(4, int)`, `set(1, 42)`,
//! `get(1)`. Whitespace around the name and each argument is ignored.
//! A `set` value may be wrapped in single or double quotes to keep
//! surrounding spaces or commas, e.g. `set(3, ' ')`.

use thiserror::Error;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `create(size, type)`
    Create {
        /// Block size in bytes.
        size: u64,
        /// Type tag, with inner whitespace collapsed.
        type_tag: String,
    },
    /// `set(id, value)`
    Set {
        /// Block id.
        id: i64,
        /// Literal to store.
        value: String,
    },
    /// `get(id)`
    Get {
        /// Block id.
        id: i64,
    },
    /// `increaseRefCount(id)`
    IncreaseRefCount {
        /// Block id.
        id: i64,
    },
    /// `decreaseRefCount(id)`
    DecreaseRefCount {
        /// Block id.
        id: i64,
    },
    /// `summary()`
    Summary,
    /// `blocks()`
    Blocks,
    /// `collect()`
    Collect,
    /// `help()`
    Help,
    /// `exit()`
    Exit,
}

/// Errors produced by [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line held nothing to parse.
    #[error("empty command")]
    Empty,

    /// The line is not of the form `name(args)`.
    #[error("expected name(arguments), got '{0}'")]
    Syntax(String),

    /// The command name is not known.
    #[error("unknown command '{0}'; try help()")]
    UnknownCommand(String),

    /// Wrong number of arguments.
    #[error("{command} takes {expected} argument(s), got {found}")]
    Arity {
        /// Command name.
        command: &'static str,
        /// Arguments expected.
        expected: usize,
        /// Arguments given.
        found: usize,
    },

    /// An argument that must be an integer is not one.
    #[error("{command}: '{value}' is not a valid {what}")]
    InvalidNumber {
        /// Command name.
        command: &'static str,
        /// What the argument denotes.
        what: &'static str,
        /// Text given.
        value: String,
    },
}

/// Parse one line into a command.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (name, inner) = line
        .strip_suffix(')')
        .and_then(|rest| rest.split_once('('))
        .ok_or_else(|| ParseError::Syntax(line.to_string()))?;
    let name = name.trim();

    match name {
        "create" => {
            let [size, type_tag] = args::<2>("create", inner)?;
            Ok(Command::Create {
                size: number("create", "size", size)?,
                type_tag: type_tag.split_whitespace().collect::<Vec<_>>().join(" "),
            })
        }
        "set" => {
            let (id, value) = inner.split_once(',').ok_or(ParseError::Arity {
                command: "set",
                expected: 2,
                found: usize::from(!inner.trim().is_empty()),
            })?;
            Ok(Command::Set {
                id: number("set", "id", id)?,
                value: unquote(value.trim()).to_string(),
            })
        }
        "get" => Ok(Command::Get {
            id: single_id("get", inner)?,
        }),
        "increaseRefCount" => Ok(Command::IncreaseRefCount {
            id: single_id("increaseRefCount", inner)?,
        }),
        "decreaseRefCount" => Ok(Command::DecreaseRefCount {
            id: single_id("decreaseRefCount", inner)?,
        }),
        "summary" => no_args("summary", inner, Command::Summary),
        "blocks" => no_args("blocks", inner, Command::Blocks),
        "collect" => no_args("collect", inner, Command::Collect),
        "help" => no_args("help", inner, Command::Help),
        "exit" | "quit" => no_args("exit", inner, Command::Exit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

/// Split exactly `N` comma-separated, trimmed arguments.
fn args<'a, const N: usize>(
    command: &'static str,
    inner: &'a str,
) -> Result<[&'a str; N], ParseError> {
    let parts: Vec<&str> = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };

    let found = parts.len();
    parts.try_into().map_err(|_| ParseError::Arity {
        command,
        expected: N,
        found,
    })
}

fn no_args(command: &'static str, inner: &str, parsed: Command) -> Result<Command, ParseError> {
    args::<0>(command, inner).map(|[]| parsed)
}

fn single_id(command: &'static str, inner: &str) -> Result<i64, ParseError> {
    let [id] = args::<1>(command, inner)?;
    number(command, "id", id)
}

fn number<T: std::str::FromStr>(
    command: &'static str,
    what: &'static str,
    text: &str,
) -> Result<T, ParseError> {
    text.trim()
        .parse()
        .map_err(|_| ParseError::InvalidNumber {
            command,
            what,
            value: text.trim().to_string(),
        })
}

/// Strip one pair of matching single or double quotes.
fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        assert_eq!(
            parse("create(4, int)").unwrap(),
            Command::Create {
                size: 4,
                type_tag: "int".to_string()
            }
        );
        assert_eq!(
            parse("  create ( 8 ,  long   long ) ").unwrap(),
            Command::Create {
                size: 8,
                type_tag: "long long".to_string()
            }
        );
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse("set(1, 42)").unwrap(),
            Command::Set {
                id: 1,
                value: "42".to_string()
            }
        );
        assert_eq!(
            parse("set(2, ' ')").unwrap(),
            Command::Set {
                id: 2,
                value: " ".to_string()
            }
        );
        assert_eq!(
            parse("set(3, \",\")").unwrap(),
            Command::Set {
                id: 3,
                value: ",".to_string()
            }
        );
    }

    #[test]
    fn test_parse_id_commands() {
        assert_eq!(parse("get(7)").unwrap(), Command::Get { id: 7 });
        assert_eq!(
            parse("increaseRefCount( 3 )").unwrap(),
            Command::IncreaseRefCount { id: 3 }
        );
        assert_eq!(
            parse("decreaseRefCount(-1)").unwrap(),
            Command::DecreaseRefCount { id: -1 }
        );
    }

    #[test]
    fn test_parse_no_arg_commands() {
        assert_eq!(parse("summary()").unwrap(), Command::Summary);
        assert_eq!(parse("blocks()").unwrap(), Command::Blocks);
        assert_eq!(parse("collect()").unwrap(), Command::Collect);
        assert_eq!(parse("help()").unwrap(), Command::Help);
        assert_eq!(parse("exit()").unwrap(), Command::Exit);
        assert_eq!(parse("quit()").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   ").unwrap_err(), ParseError::Empty);
        assert!(matches!(parse("get 1"), Err(ParseError::Syntax(_))));
        assert!(matches!(
            parse("delete(1)"),
            Err(ParseError::UnknownCommand(name)) if name == "delete"
        ));
        assert_eq!(
            parse("get(1, 2)").unwrap_err(),
            ParseError::Arity {
                command: "get",
                expected: 1,
                found: 2
            }
        );
        assert_eq!(
            parse("set(1)").unwrap_err(),
            ParseError::Arity {
                command: "set",
                expected: 2,
                found: 1
            }
        );
        assert!(matches!(
            parse("summary(1)"),
            Err(ParseError::Arity { expected: 0, .. })
        ));
        assert!(matches!(
            parse("create(four, int)"),
            Err(ParseError::InvalidNumber { what: "size", .. })
        ));
        assert!(matches!(
            parse("create(-4, int)"),
            Err(ParseError::InvalidNumber { .. })
        ));
    }
}
