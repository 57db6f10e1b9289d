//! Error types for envmap
//!
//! Resolution has exactly one failure mode, [`CycleError`]. Everything that
//! touches documents or the filesystem reports the structured [`Error`],
//! which carries the offending key and an actionable help message.

use std::fmt;

/// Result type alias for envmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Raised when resolving a key re-enters a key that is still being resolved.
///
/// `chain` lists the keys in the order they were entered, ending with the
/// key that closed the cycle (so `A = ${env:A}` reports `["A", "A"]`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circular reference while resolving '{key}': {}", .chain.join(" → "))]
pub struct CycleError {
    /// The key that was re-entered
    pub key: String,
    /// Keys in the active resolution chain, ending with the repeated key
    pub chain: Vec<String>,
}

impl CycleError {
    /// Create a cycle error for the re-entered `key` and the chain that led back to it
    pub fn new(key: impl Into<String>, chain: Vec<String>) -> Self {
        Self {
            key: key.into(),
            chain,
        }
    }
}

/// Main error type for envmap operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Variable name the error relates to, if any
    pub key: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing a JSON/YAML document
    Parse,
    /// Circular reference detected during resolution
    CircularReference { chain: Vec<String> },
    /// I/O error (file not found, permission denied, ...)
    Io,
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            key: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a parse error for a value that is not a plain scalar
    pub fn invalid_value(key: impl Into<String>, got: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            key: Some(key.into()),
            help: Some("Environment variable values must be strings, numbers or booleans".into()),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(key: impl Into<String>, chain: Vec<String>) -> Self {
        let chain_str = chain.join(" → ");
        Self {
            kind: ErrorKind::CircularReference { chain },
            key: Some(key.into()),
            help: Some("Break the circular dependency by removing one of the references".into()),
            cause: Some(format!("Chain: {}", chain_str)),
        }
    }

    /// Create an I/O error for the given path
    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        let path = path.as_ref();
        Self {
            kind: ErrorKind::Io,
            key: None,
            help: Some(format!("Check that '{}' exists and is accessible", path.display())),
            cause: Some(err.to_string()),
        }
    }

    /// Add key context to the error
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether this error was caused by a reference cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self.kind, ErrorKind::CircularReference { .. })
    }
}

impl From<CycleError> for Error {
    fn from(err: CycleError) -> Self {
        Error::circular_reference(err.key, err.chain)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::CircularReference { .. } => write!(f, "Circular reference detected")?,
            ErrorKind::Io => write!(f, "I/O error")?,
        }

        if let Some(key) = &self.key {
            write!(f, "\n  Key: {}", key)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
