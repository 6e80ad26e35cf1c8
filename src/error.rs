//! Conversion error taxonomy.
//!
//! Every failure is fatal for the conversion it occurred in; nothing is
//! recovered inside the pipeline. The only warning channel is
//! `tracing::warn!`, used by the `warn` duplicate-declaration policy.

use crate::tokenizer::TokenKind;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// An unexpected token encountered by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What the parser was looking for.
    pub expected: String,
    /// Kind of the offending token.
    pub found: TokenKind,
    /// Raw value of the offending token.
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.found == TokenKind::Eof {
            write!(
                f,
                "expected {} but reached end of input at {}:{}",
                self.expected, self.line, self.column
            )
        } else {
            write!(
                f,
                "expected {} but found {} '{}' at {}:{}",
                self.expected, self.found, self.value, self.line, self.column
            )
        }
    }
}

/// Any error a conversion can surface.
#[derive(Debug)]
pub enum Error {
    /// Malformed declaration syntax.
    Parse(ParseError),
    /// An import in `local`/`all` follow mode could not be resolved to
    /// a file.
    Resolution {
        specifier: String,
        importer: PathBuf,
    },
    /// A filesystem read failed.
    Read { path: PathBuf, source: io::Error },
    /// Two files (or one source) declare the same top-level name and
    /// the collision policy is `error`.
    DuplicateDeclaration {
        name: String,
        first: Option<PathBuf>,
        second: Option<PathBuf>,
    },
    /// The name-transform callback mapped two originals to one output.
    NameCollision {
        transformed: String,
        first: String,
        second: String,
    },
    /// A user callback returned an error; `type_name` is the
    /// declaration it was invoked for.
    Callback { type_name: String, message: String },
    /// The id callback produced the same id for two declarations.
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },
    /// A glob entry in the batch file API could not be compiled.
    Glob { pattern: String, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::Resolution {
                specifier,
                importer,
            } => write!(
                f,
                "cannot resolve import '{}' from '{}'",
                specifier,
                importer.display()
            ),
            Error::Read { path, source } => {
                write!(f, "failed to read '{}': {source}", path.display())
            }
            Error::DuplicateDeclaration {
                name,
                first,
                second,
            } => {
                write!(f, "duplicate declaration '{name}'")?;
                if let (Some(first), Some(second)) = (first, second) {
                    write!(
                        f,
                        " declared in both '{}' and '{}'",
                        first.display(),
                        second.display()
                    )?;
                }
                Ok(())
            }
            Error::NameCollision {
                transformed,
                first,
                second,
            } => write!(
                f,
                "name transform maps both '{first}' and '{second}' to '{transformed}'"
            ),
            Error::Callback { type_name, message } => {
                write!(f, "callback failed for type '{type_name}': {message}")
            }
            Error::DuplicateId { id, first, second } => write!(
                f,
                "id callback produced '{id}' for both '{first}' and '{second}'"
            ),
            Error::Glob { pattern, message } => {
                write!(f, "invalid glob pattern '{pattern}': {message}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
